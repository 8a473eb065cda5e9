use anyhow::Result;
use image::RgbaImage;

use arquad_engine::coords::Viewport;
use arquad_engine::core::{App, AppControl, FrameCtx};
use arquad_engine::device::Gpu;
use arquad_engine::frame::{CoordinatorConfig, FrameCoordinator, SceneParams, TickOutcome};
use arquad_engine::input::Key;

use crate::observers::AnchorLog;
use crate::presentation::PlaneControls;
use crate::simulated::{SimulatedSession, SimulationConfig};

/// Composes the frame coordinator, the simulated session and the title readout.
pub struct StudioApp {
    decal: RgbaImage,
    coordinator_config: CoordinatorConfig,
    simulation: SimulationConfig,
    coordinator: Option<FrameCoordinator<SimulatedSession>>,
    controls: PlaneControls,
}

impl StudioApp {
    pub fn new(decal: RgbaImage, params: SceneParams) -> Self {
        Self {
            decal,
            coordinator_config: CoordinatorConfig::default(),
            simulation: SimulationConfig::default(),
            coordinator: None,
            controls: PlaneControls::new(params),
        }
    }
}

impl App for StudioApp {
    fn setup(&mut self, gpu: &Gpu<'_>) -> Result<()> {
        let info = gpu.adapter_info();
        log::info!("adapter: {} ({:?})", info.name, info.backend);

        let session = SimulatedSession::new(self.simulation.clone());
        let coordinator =
            FrameCoordinator::new(gpu, session, &self.decal, self.coordinator_config.clone())
                .with_observer(Box::new(AnchorLog::default()));
        self.coordinator = Some(coordinator);
        Ok(())
    }

    fn on_resize(&mut self, viewport: Viewport) {
        if let Some(coordinator) = self.coordinator.as_mut() {
            coordinator.resize(viewport);
        }
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        if ctx.input_frame.presses(Key::Escape) > 0 {
            return AppControl::Exit;
        }
        self.controls.apply_input(ctx.input_frame);

        let Some(coordinator) = self.coordinator.as_mut() else {
            return AppControl::Continue;
        };

        ctx.window.pre_present_notify();
        match coordinator.tick(ctx.gpu, self.controls.params()) {
            TickOutcome::Presented(report) => {
                if let Some(title) = self.controls.refresh(report.anchor_count) {
                    ctx.window.set_title(title);
                }
            }
            TickOutcome::Skipped => {}
            TickOutcome::Fatal => {
                log::error!("surface lost for good; exiting");
                return AppControl::Exit;
            }
        }

        if ctx.time.frame_index % 600 == 0 && ctx.time.frame_index > 0 {
            log::debug!("{:.1} fps", ctx.time.fps);
        }

        AppControl::Continue
    }
}
