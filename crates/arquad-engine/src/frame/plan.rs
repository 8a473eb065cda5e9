use glam::{Affine2, Mat4, Vec4};

use crate::coords::Viewport;
use crate::tracking::{horizontal_plane_positions, TrackedFrame};

use super::CoordinatorConfig;

/// Detects drawable size changes between ticks by value.
#[derive(Debug, Default)]
pub struct ViewportTracker {
    previous: Option<Viewport>,
}

impl ViewportTracker {
    /// Records `current` and reports whether it differs from the last call.
    pub fn observe(&mut self, current: Viewport) -> bool {
        if self.previous == Some(current) {
            return false;
        }
        self.previous = Some(current);
        true
    }

    /// Forces the next `observe` to report a change.
    pub fn invalidate(&mut self) {
        self.previous = None;
    }

    pub fn current(&self) -> Option<Viewport> {
        self.previous
    }
}

/// CPU-side inputs for one tick, derived from a tracked frame.
///
/// Matrices and positions stay in tracking space; the anchor renderer applies
/// the handedness conversion when they are handed to it.
#[derive(Debug, Clone)]
pub struct FramePlan {
    pub viewport: Viewport,
    /// Set only when the viewport changed since the previous tick.
    pub display_transform: Option<Affine2>,
    pub anchor_positions: Vec<Vec4>,
    pub view: Mat4,
    pub projection: Mat4,
}

impl FramePlan {
    pub fn build(
        frame: &dyn TrackedFrame,
        viewport: Viewport,
        viewport_changed: bool,
        config: &CoordinatorConfig,
    ) -> Self {
        let orientation = config.orientation;

        let display_transform =
            viewport_changed.then(|| frame.display_transform(orientation, viewport));

        let anchor_positions = horizontal_plane_positions(frame.anchors());
        let view = frame.view_matrix(orientation);
        let projection =
            frame.projection_matrix(orientation, viewport, config.z_near, config.z_far);

        Self {
            viewport,
            display_transform,
            anchor_positions,
            view,
            projection,
        }
    }
}
