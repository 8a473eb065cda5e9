use std::sync::Arc;

use glam::{Affine2, Mat4};

use crate::coords::{Orientation, Viewport};

use super::{Anchor, AnchorId, PlanarImage};

/// One immutable snapshot from the tracking engine.
pub trait TrackedFrame: Send + Sync {
    /// Camera image captured for this frame.
    fn captured_image(&self) -> &PlanarImage;

    /// Every anchor the engine currently tracks.
    fn anchors(&self) -> &[Anchor];

    /// World-to-camera transform for `orientation` (tracking space).
    fn view_matrix(&self, orientation: Orientation) -> Mat4;

    /// Camera projection for `orientation` and a viewport in pixels.
    fn projection_matrix(
        &self,
        orientation: Orientation,
        viewport: Viewport,
        z_near: f32,
        z_far: f32,
    ) -> Mat4;

    /// Normalized image coordinates to normalized viewport coordinates.
    fn display_transform(&self, orientation: Orientation, viewport: Viewport) -> Affine2;
}

/// Which plane orientations the session should look for.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct PlaneDetection {
    pub horizontal: bool,
    pub vertical: bool,
}

impl PlaneDetection {
    pub const HORIZONTAL: Self = Self {
        horizontal: true,
        vertical: false,
    };
}

/// World-tracking configuration passed to [`TrackingSession::run`].
#[derive(Debug, Clone)]
pub struct TrackingConfig {
    pub plane_detection: PlaneDetection,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            plane_detection: PlaneDetection::HORIZONTAL,
        }
    }
}

/// Anchor delta reported by the engine between two snapshots.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    AnchorsAdded(Vec<Anchor>),
    AnchorsUpdated(Vec<Anchor>),
    AnchorsRemoved(Vec<AnchorId>),
}

/// A running tracking engine.
///
/// Snapshots are produced on the engine's own schedule; the render thread only
/// reads the latest one at the start of a tick.
pub trait TrackingSession {
    /// Starts (or restarts) tracking with `config`.
    fn run(&mut self, config: &TrackingConfig);

    /// Stops producing frames until the next `run`.
    fn pause(&mut self);

    /// Latest snapshot, or `None` before the first frame is available.
    fn current_frame(&self) -> Option<Arc<dyn TrackedFrame>>;

    /// Anchor deltas observed since the last call.
    fn drain_events(&mut self) -> Vec<SessionEvent> {
        Vec::new()
    }
}

/// Receives anchor deltas. All methods default to no-ops.
pub trait TrackingObserver {
    fn anchors_added(&mut self, anchors: &[Anchor]) {
        let _ = anchors;
    }

    fn anchors_updated(&mut self, anchors: &[Anchor]) {
        let _ = anchors;
    }

    fn anchors_removed(&mut self, ids: &[AnchorId]) {
        let _ = ids;
    }
}

impl SessionEvent {
    /// Forwards this event to the matching observer callback.
    pub fn dispatch(&self, observer: &mut dyn TrackingObserver) {
        match self {
            SessionEvent::AnchorsAdded(a) => observer.anchors_added(a),
            SessionEvent::AnchorsUpdated(a) => observer.anchors_updated(a),
            SessionEvent::AnchorsRemoved(ids) => observer.anchors_removed(ids),
        }
    }
}
