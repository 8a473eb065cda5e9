//! Synthetic tracking engine for desktop runs.
//!
//! A producer thread renders NV12 frames of a procedural floor, moves the
//! camera along a slow arc and discovers a scripted set of planes. The render
//! thread only ever sees the latest snapshot.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use glam::{EulerRot, Mat4, Quat, UVec2, Vec2, Vec3};
use parking_lot::RwLock;

use arquad_engine::tracking::{
    Anchor, AnchorId, FrameSnapshot, ImagePlane, Intrinsics, PinholeCamera, PlanarImage,
    PlaneAlignment, PlaneAnchor, PlaneDetection, SessionEvent, TrackedFrame, TrackingConfig,
    TrackingSession,
};

#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Sensor resolution in native landscape orientation.
    pub resolution: UVec2,
    pub horizontal_fov: f32,
    pub fps: u32,
    /// Anchor deltas buffered between render ticks; extra events are dropped.
    pub event_capacity: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            resolution: UVec2::new(640, 480),
            horizontal_fov: 60f32.to_radians(),
            fps: 30,
            event_capacity: 256,
        }
    }
}

/// One scripted surface: where it is and when it exists.
#[derive(Debug, Copy, Clone)]
struct PlaneScript {
    position: Vec3,
    alignment: PlaneAlignment,
    appear: f64,
    vanish: Option<f64>,
}

const SCRIPT: [PlaneScript; 5] = [
    PlaneScript {
        position: Vec3::new(0.0, 0.0, -1.6),
        alignment: PlaneAlignment::Horizontal,
        appear: 0.5,
        vanish: None,
    },
    PlaneScript {
        position: Vec3::new(0.7, 0.0, -2.3),
        alignment: PlaneAlignment::Horizontal,
        appear: 2.0,
        vanish: None,
    },
    PlaneScript {
        position: Vec3::new(0.0, 1.2, -3.0),
        alignment: PlaneAlignment::Vertical,
        appear: 3.0,
        vanish: None,
    },
    PlaneScript {
        position: Vec3::new(-0.4, 0.72, -1.1),
        alignment: PlaneAlignment::Horizontal,
        appear: 4.5,
        vanish: Some(12.0),
    },
    PlaneScript {
        position: Vec3::new(-0.9, 0.0, -2.0),
        alignment: PlaneAlignment::Horizontal,
        appear: 6.0,
        vanish: None,
    },
];

/// Deterministic world state; advanced by the producer thread.
pub struct Simulation {
    config: SimulationConfig,
    camera: PinholeCamera,
    anchors: Vec<Anchor>,
    elapsed: f64,
    frame_index: u64,
}

impl Simulation {
    /// Frames between two `AnchorsUpdated` events.
    const UPDATE_EVERY: u64 = 10;
    const CAMERA_HEIGHT: f32 = 1.4;

    pub fn new(config: SimulationConfig) -> Self {
        let camera = PinholeCamera {
            pose: Self::camera_pose(0.0),
            intrinsics: Intrinsics::from_horizontal_fov(config.resolution, config.horizontal_fov),
            resolution: config.resolution,
        };
        Self {
            config,
            camera,
            anchors: Vec::new(),
            elapsed: 0.0,
            frame_index: 0,
        }
    }

    pub fn anchors(&self) -> &[Anchor] {
        &self.anchors
    }

    /// Advances by `dt` seconds; returns the new snapshot and anchor deltas.
    pub fn step(&mut self, dt: f64) -> Result<(FrameSnapshot, Vec<SessionEvent>)> {
        self.elapsed += dt;
        self.frame_index += 1;
        self.camera.pose = Self::camera_pose(self.elapsed);

        let events = self.advance_anchors();
        let image = self.render_image()?;

        let snapshot = FrameSnapshot {
            image,
            anchors: self.anchors.clone(),
            camera: self.camera,
            timestamp: self.elapsed,
        };
        Ok((snapshot, events))
    }

    fn camera_pose(t: f64) -> Mat4 {
        let t = t as f32;
        let yaw = 0.35 * (t * 0.25).sin();
        let pitch = -0.45;
        let position = Vec3::new(0.3 * (t * 0.2).sin(), Self::CAMERA_HEIGHT, 0.0);
        // Sensor native orientation is landscape-right; roll the pose so the
        // simulated phone is held upright in portrait.
        let rotation = Quat::from_euler(EulerRot::YXZ, yaw, pitch, std::f32::consts::FRAC_PI_2);
        Mat4::from_rotation_translation(rotation, position)
    }

    fn advance_anchors(&mut self) -> Vec<SessionEvent> {
        let mut added = Vec::new();
        let mut removed = Vec::new();

        for (i, script) in SCRIPT.iter().enumerate() {
            let id = AnchorId(i as u64 + 1);
            let present = self.anchors.iter().any(|a| a.id() == id);
            let alive = self.elapsed >= script.appear
                && script.vanish.is_none_or(|end| self.elapsed < end);

            if alive && !present {
                let anchor = Anchor::Plane(PlaneAnchor {
                    id,
                    transform: Mat4::from_translation(script.position),
                    center: Vec3::ZERO,
                    extent: Vec2::splat(0.2),
                    alignment: script.alignment,
                });
                self.anchors.push(anchor);
                added.push(anchor);
            } else if !alive && present {
                self.anchors.retain(|a| a.id() != id);
                removed.push(id);
            }
        }

        let mut events = Vec::new();
        if !added.is_empty() {
            events.push(SessionEvent::AnchorsAdded(added));
        }
        if self.frame_index % Self::UPDATE_EVERY == 0 && !self.anchors.is_empty() {
            self.grow_planes();
            events.push(SessionEvent::AnchorsUpdated(self.anchors.clone()));
        }
        if !removed.is_empty() {
            events.push(SessionEvent::AnchorsRemoved(removed));
        }
        events
    }

    /// Refines extents and drifts centers, as a real engine would while
    /// merging new feature points into a plane.
    fn grow_planes(&mut self) {
        let wobble = (self.elapsed as f32 * 0.7).sin() * 0.02;
        for anchor in &mut self.anchors {
            if let Anchor::Plane(plane) = anchor {
                plane.extent = (plane.extent + Vec2::splat(0.05)).min(Vec2::splat(2.0));
                plane.center = Vec3::new(wobble, 0.0, -wobble);
            }
        }
    }

    /// NV12: full-resolution luma plus half-resolution interleaved CbCr.
    fn render_image(&self) -> Result<PlanarImage> {
        let UVec2 { x: w, y: h } = self.config.resolution;
        let t = self.elapsed as f32;

        let mut luma = vec![0u8; (w * h) as usize];
        for y in 0..h {
            let horizon = y as f32 / h as f32;
            for x in 0..w {
                let u = x as f32 / w as f32;
                let stripes = ((u * 24.0 + t * 0.8).sin() * (horizon * 18.0).cos()).abs();
                let v = 60.0 + 120.0 * horizon + 50.0 * stripes;
                luma[(y * w + x) as usize] = v.clamp(16.0, 235.0) as u8;
            }
        }

        let (cw, ch) = ((w / 2).max(1), (h / 2).max(1));
        let mut chroma = vec![0u8; (cw * ch * 2) as usize];
        for y in 0..ch {
            let tint = (y as f32 / ch as f32 * 24.0) as u8;
            for x in 0..cw {
                let i = ((y * cw + x) * 2) as usize;
                chroma[i] = 128 + tint / 2;
                chroma[i + 1] = 128 - tint;
            }
        }

        let luma = ImagePlane::new(w, h, w, luma.into()).context("luma plane")?;
        let chroma = ImagePlane::new(cw, ch, cw * 2, chroma.into()).context("chroma plane")?;
        Ok(PlanarImage::new(vec![luma, chroma]))
    }
}

struct Shared {
    latest: RwLock<Option<Arc<FrameSnapshot>>>,
    running: AtomicBool,
}

/// [`TrackingSession`] backed by a [`Simulation`] on its own thread.
pub struct SimulatedSession {
    config: SimulationConfig,
    shared: Arc<Shared>,
    events_tx: Sender<SessionEvent>,
    events_rx: Receiver<SessionEvent>,
    worker: Option<JoinHandle<()>>,
}

impl SimulatedSession {
    pub fn new(config: SimulationConfig) -> Self {
        let (events_tx, events_rx) = bounded(config.event_capacity.max(1));
        Self {
            config,
            shared: Arc::new(Shared {
                latest: RwLock::new(None),
                running: AtomicBool::new(false),
            }),
            events_tx,
            events_rx,
            worker: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    fn stop_worker(&mut self) {
        self.shared.running.store(false, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("simulated tracking thread panicked");
            }
        }
    }
}

impl TrackingSession for SimulatedSession {
    fn run(&mut self, config: &TrackingConfig) {
        self.stop_worker();
        *self.shared.latest.write() = None;
        while self.events_rx.try_recv().is_ok() {}

        let detection = config.plane_detection;
        let sim_config = self.config.clone();
        let shared = self.shared.clone();
        let events = self.events_tx.clone();
        shared.running.store(true, Ordering::Release);

        let spawned = std::thread::Builder::new()
            .name("arquad-tracking".into())
            .spawn(move || produce(sim_config, detection, shared, events));

        match spawned {
            Ok(handle) => self.worker = Some(handle),
            Err(e) => {
                self.shared.running.store(false, Ordering::Release);
                log::error!("failed to start simulated tracking: {e}");
            }
        }
    }

    fn pause(&mut self) {
        self.stop_worker();
    }

    fn current_frame(&self) -> Option<Arc<dyn TrackedFrame>> {
        self.shared
            .latest
            .read()
            .clone()
            .map(|f| f as Arc<dyn TrackedFrame>)
    }

    fn drain_events(&mut self) -> Vec<SessionEvent> {
        self.events_rx.try_iter().collect()
    }
}

impl Drop for SimulatedSession {
    fn drop(&mut self) {
        self.stop_worker();
    }
}

fn produce(
    config: SimulationConfig,
    detection: PlaneDetection,
    shared: Arc<Shared>,
    events: Sender<SessionEvent>,
) {
    let period = Duration::from_secs_f64(1.0 / config.fps.max(1) as f64);
    let mut sim = Simulation::new(config);
    let mut last = Instant::now();

    log::info!("simulated tracking started ({:?})", detection);

    while shared.running.load(Ordering::Acquire) {
        let now = Instant::now();
        let dt = now.duration_since(last).as_secs_f64();
        last = now;

        let (mut snapshot, deltas) = match sim.step(dt) {
            Ok(s) => s,
            Err(e) => {
                log::error!("simulated frame failed: {e:#}");
                break;
            }
        };

        // Engine only reports the plane kinds it was asked to detect.
        snapshot.anchors.retain(|a| detects(detection, a));
        *shared.latest.write() = Some(Arc::new(snapshot));

        for event in deltas.into_iter().filter_map(|e| filter_event(detection, e)) {
            match events.try_send(event) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => log::debug!("anchor event dropped: queue full"),
                Err(TrySendError::Disconnected(_)) => return,
            }
        }

        let spent = now.elapsed();
        if spent < period {
            std::thread::sleep(period - spent);
        }
    }

    log::info!("simulated tracking stopped");
}

fn detects(detection: PlaneDetection, anchor: &Anchor) -> bool {
    match anchor.as_plane().map(|p| p.alignment) {
        Some(PlaneAlignment::Horizontal) => detection.horizontal,
        Some(PlaneAlignment::Vertical) => detection.vertical,
        None => true,
    }
}

fn filter_event(
    detection: PlaneDetection,
    event: SessionEvent,
) -> Option<SessionEvent> {
    let keep = |anchors: Vec<Anchor>| -> Vec<Anchor> {
        anchors.into_iter().filter(|a| detects(detection, a)).collect()
    };
    let event = match event {
        SessionEvent::AnchorsAdded(a) => SessionEvent::AnchorsAdded(keep(a)),
        SessionEvent::AnchorsUpdated(a) => SessionEvent::AnchorsUpdated(keep(a)),
        removed @ SessionEvent::AnchorsRemoved(_) => removed,
    };
    match &event {
        SessionEvent::AnchorsAdded(a) | SessionEvent::AnchorsUpdated(a) if a.is_empty() => None,
        _ => Some(event),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_for(sim: &mut Simulation, seconds: f64) -> Vec<SessionEvent> {
        let dt = 1.0 / 30.0;
        let mut events = Vec::new();
        for _ in 0..(seconds / dt).round() as usize {
            events.extend(sim.step(dt).unwrap().1);
        }
        events
    }

    #[test]
    fn frames_are_nv12() {
        let mut sim = Simulation::new(SimulationConfig::default());
        let (snapshot, _) = sim.step(0.033).unwrap();
        let (luma, chroma) = snapshot.image.luma_chroma().unwrap();
        assert_eq!((luma.width, luma.height), (640, 480));
        assert_eq!((chroma.width, chroma.height), (320, 240));
        assert_eq!(chroma.bytes_per_row, 640);
    }

    #[test]
    fn planes_appear_over_time() {
        let mut sim = Simulation::new(SimulationConfig::default());
        run_for(&mut sim, 0.3);
        assert!(sim.anchors().is_empty());

        let events = run_for(&mut sim, 0.5);
        assert!(events
            .iter()
            .any(|e| matches!(e, SessionEvent::AnchorsAdded(a) if a[0].id() == AnchorId(1))));
        assert_eq!(sim.anchors().len(), 1);

        run_for(&mut sim, 6.0);
        assert_eq!(sim.anchors().len(), SCRIPT.len());
    }

    #[test]
    fn scripted_plane_is_removed() {
        let mut sim = Simulation::new(SimulationConfig::default());
        let events = run_for(&mut sim, 13.0);
        assert!(events
            .iter()
            .any(|e| matches!(e, SessionEvent::AnchorsRemoved(ids) if ids == &[AnchorId(4)])));
        assert!(sim.anchors().iter().all(|a| a.id() != AnchorId(4)));
    }

    #[test]
    fn updates_grow_extents() {
        let mut sim = Simulation::new(SimulationConfig::default());
        run_for(&mut sim, 3.0);
        let extent = sim.anchors()[0].as_plane().unwrap().extent;
        assert!(extent.x > 0.2);
        assert!(extent.x <= 2.0);
    }

    #[test]
    fn vertical_planes_filtered_for_horizontal_detection() {
        let wall = Anchor::Plane(PlaneAnchor {
            id: AnchorId(9),
            transform: Mat4::IDENTITY,
            center: Vec3::ZERO,
            extent: Vec2::ONE,
            alignment: PlaneAlignment::Vertical,
        });
        assert!(!detects(PlaneDetection::HORIZONTAL, &wall));
        assert!(filter_event(
            PlaneDetection::HORIZONTAL,
            SessionEvent::AnchorsAdded(vec![wall])
        )
        .is_none());
    }

    #[test]
    fn session_publishes_frames_and_events() {
        let mut session = SimulatedSession::new(SimulationConfig {
            fps: 120,
            ..SimulationConfig::default()
        });
        assert!(session.current_frame().is_none());

        session.run(&TrackingConfig::default());
        let deadline = Instant::now() + Duration::from_secs(3);
        let mut events = Vec::new();
        while Instant::now() < deadline && events.is_empty() {
            std::thread::sleep(Duration::from_millis(20));
            events.extend(session.drain_events());
        }

        assert!(session.is_running());
        assert!(session.current_frame().is_some());
        assert!(!events.is_empty());

        session.pause();
        assert!(!session.is_running());
    }
}
