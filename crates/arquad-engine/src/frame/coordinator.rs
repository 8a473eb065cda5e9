use crate::coords::Viewport;
use crate::device::{Gpu, SurfaceErrorAction};
use crate::render::{AnchorRenderer, CameraImageCompositor, RenderCtx, RenderTarget};
use crate::tracking::{PlanarImage, TrackingConfig, TrackingObserver, TrackingSession};

use super::{CoordinatorConfig, FramePacer, FramePlan, SceneParams, ViewportTracker};

/// What one call to [`FrameCoordinator::tick`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// A frame was encoded, submitted and presented.
    Presented(FrameReport),
    /// Nothing to draw this tick (no tracked frame or no drawable).
    Skipped,
    /// The surface cannot be recovered.
    Fatal,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FrameReport {
    pub viewport: Viewport,
    pub anchor_count: usize,
    pub quad_width: f32,
}

/// Drives one tracking session into the compositor and anchor renderer.
///
/// Owns both renderers and the in-flight pacer. All methods run on the
/// render thread.
pub struct FrameCoordinator<S: TrackingSession> {
    session: S,
    config: CoordinatorConfig,
    tracking: TrackingConfig,
    running: bool,

    observer: Option<Box<dyn TrackingObserver>>,

    compositor: CameraImageCompositor,
    anchors: AnchorRenderer,
    pacer: FramePacer,
    viewport: ViewportTracker,
}

impl<S: TrackingSession> FrameCoordinator<S> {
    /// Builds both pipelines against `gpu`'s attachment formats.
    pub fn new(
        gpu: &Gpu<'_>,
        session: S,
        decal: &image::RgbaImage,
        config: CoordinatorConfig,
    ) -> Self {
        let compositor =
            CameraImageCompositor::new(gpu.device(), gpu.surface_format(), gpu.depth_format());
        let anchors = AnchorRenderer::new(
            gpu.device(),
            gpu.queue(),
            gpu.surface_format(),
            gpu.depth_format(),
            decal,
        );
        let pacer = FramePacer::new(config.max_frames_in_flight);

        log::info!(
            "frame coordinator ready (orientation={:?}, in_flight={})",
            config.orientation,
            pacer.max_in_flight()
        );

        Self {
            session,
            config,
            tracking: TrackingConfig::default(),
            running: false,
            observer: None,
            compositor,
            anchors,
            pacer,
            viewport: ViewportTracker::default(),
        }
    }

    /// Receives anchor deltas forwarded at the start of every tick.
    pub fn with_observer(mut self, observer: Box<dyn TrackingObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn with_tracking_config(mut self, tracking: TrackingConfig) -> Self {
        self.tracking = tracking;
        self
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut S {
        &mut self.session
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn anchor_count(&self) -> usize {
        self.anchors.anchor_count()
    }

    /// Starts the session if it is not running yet.
    pub fn start(&mut self) {
        if self.running {
            return;
        }
        log::info!(
            "running tracking session (horizontal={}, vertical={})",
            self.tracking.plane_detection.horizontal,
            self.tracking.plane_detection.vertical
        );
        self.session.run(&self.tracking);
        self.running = true;
    }

    pub fn pause(&mut self) {
        if self.running {
            self.session.pause();
            self.running = false;
        }
    }

    /// Drawable size changed. The image plane is refitted on the next tick.
    pub fn resize(&mut self, viewport: Viewport) {
        log::debug!("resize to {}x{}", viewport.width, viewport.height);
        self.anchors.set_viewport_size(viewport);
        self.viewport.invalidate();
        self.start();
    }

    /// Runs one frame: pull the latest snapshot, update both renderers,
    /// wait for an in-flight slot, encode, submit and present.
    pub fn tick(&mut self, gpu: &mut Gpu<'_>, params: &SceneParams) -> TickOutcome {
        self.start();
        forward_events(&mut self.session, self.observer.as_deref_mut());

        let Some(frame) = self.session.current_frame() else {
            return TickOutcome::Skipped;
        };

        let viewport = Viewport::from(gpu.size());
        if !viewport.is_valid() {
            return TickOutcome::Skipped;
        }

        let mut gpu_frame = match gpu.begin_frame() {
            Ok(f) => f,
            Err(err) => {
                return match gpu.handle_surface_error(err) {
                    SurfaceErrorAction::Fatal => TickOutcome::Fatal,
                    SurfaceErrorAction::Reconfigured | SurfaceErrorAction::SkipFrame => {
                        TickOutcome::Skipped
                    }
                };
            }
        };

        let changed = self.viewport.observe(viewport);
        let plan = FramePlan::build(frame.as_ref(), viewport, changed, &self.config);

        let ctx = RenderCtx::new(
            gpu.device(),
            gpu.queue(),
            gpu.surface_format(),
            gpu.depth_format(),
            viewport,
        );
        self.apply(&ctx, &plan, frame.captured_image());

        self.pacer.acquire_with(|| gpu.poll());

        {
            let mut target = RenderTarget::new(
                &mut gpu_frame.encoder,
                &gpu_frame.view,
                &gpu_frame.depth_view,
                self.config.clear_color,
            );
            self.compositor.draw(&mut target);
            self.anchors.draw(&ctx, &mut target, params.quad_width());
        }

        let release = self.pacer.release_handle();
        gpu.submit(gpu_frame, move || release.release());

        TickOutcome::Presented(FrameReport {
            viewport,
            anchor_count: self.anchors.anchor_count(),
            quad_width: params.quad_width(),
        })
    }

    fn apply(&mut self, ctx: &RenderCtx<'_>, plan: &FramePlan, image: &PlanarImage) {
        if let Some(display_transform) = plan.display_transform {
            log::debug!(
                "refitting image plane for {}x{}",
                plan.viewport.width,
                plan.viewport.height
            );
            self.compositor
                .update_image_plane(ctx, display_transform, plan.viewport);
            self.anchors.set_viewport_size(plan.viewport);
        }

        self.compositor.update_captured_image_textures(ctx, image);
        self.anchors.set_anchors(&plan.anchor_positions);
        self.anchors.set_camera_matrices(plan.view, plan.projection);
    }
}

impl<S: TrackingSession> Drop for FrameCoordinator<S> {
    fn drop(&mut self) {
        self.pause();
    }
}

/// Drains pending session events into `observer`; returns how many there were.
fn forward_events(
    session: &mut impl TrackingSession,
    observer: Option<&mut (dyn TrackingObserver + '_)>,
) -> usize {
    let events = session.drain_events();
    if let Some(observer) = observer {
        for event in &events {
            event.dispatch(observer);
        }
    }
    events.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::{Anchor, AnchorId, SessionEvent, TrackedFrame};
    use glam::Mat4;
    use std::sync::Arc;

    #[derive(Default)]
    struct ScriptedSession {
        runs: usize,
        pending: Vec<SessionEvent>,
    }

    impl TrackingSession for ScriptedSession {
        fn run(&mut self, _config: &TrackingConfig) {
            self.runs += 1;
        }

        fn pause(&mut self) {}

        fn current_frame(&self) -> Option<Arc<dyn TrackedFrame>> {
            None
        }

        fn drain_events(&mut self) -> Vec<SessionEvent> {
            std::mem::take(&mut self.pending)
        }
    }

    #[derive(Default)]
    struct Counts {
        added: usize,
        updated: usize,
        removed: Vec<AnchorId>,
    }

    impl TrackingObserver for Counts {
        fn anchors_added(&mut self, anchors: &[Anchor]) {
            self.added += anchors.len();
        }

        fn anchors_updated(&mut self, anchors: &[Anchor]) {
            self.updated += anchors.len();
        }

        fn anchors_removed(&mut self, ids: &[AnchorId]) {
            self.removed.extend_from_slice(ids);
        }
    }

    fn point(id: u64) -> Anchor {
        Anchor::Point {
            id: AnchorId(id),
            transform: Mat4::IDENTITY,
        }
    }

    #[test]
    fn events_reach_observer_in_order() {
        let mut session = ScriptedSession {
            pending: vec![
                SessionEvent::AnchorsAdded(vec![point(1), point(2)]),
                SessionEvent::AnchorsUpdated(vec![point(1)]),
                SessionEvent::AnchorsRemoved(vec![AnchorId(2)]),
            ],
            ..Default::default()
        };
        let mut counts = Counts::default();

        let n = forward_events(&mut session, Some(&mut counts));
        assert_eq!(n, 3);
        assert_eq!(counts.added, 2);
        assert_eq!(counts.updated, 1);
        assert_eq!(counts.removed, vec![AnchorId(2)]);

        assert_eq!(forward_events(&mut session, Some(&mut counts)), 0);
    }

    #[test]
    fn boxed_observer_can_be_lent_every_tick() {
        let mut session = ScriptedSession::default();
        let mut observer: Option<Box<dyn TrackingObserver>> = Some(Box::new(Counts::default()));

        for id in 0..3 {
            session.pending.push(SessionEvent::AnchorsAdded(vec![point(id)]));
            assert_eq!(forward_events(&mut session, observer.as_deref_mut()), 1);
        }
        assert!(observer.is_some());
    }

    #[test]
    fn events_are_drained_without_observer() {
        let mut session = ScriptedSession {
            pending: vec![SessionEvent::AnchorsRemoved(vec![AnchorId(7)])],
            ..Default::default()
        };
        assert_eq!(forward_events(&mut session, None), 1);
        assert!(session.pending.is_empty());
    }

    #[test]
    fn tick_outcome_reports_frame() {
        let report = FrameReport {
            viewport: Viewport::new(1080.0, 1920.0),
            anchor_count: 2,
            quad_width: 0.25,
        };
        assert_ne!(TickOutcome::Presented(report), TickOutcome::Skipped);
    }
}
