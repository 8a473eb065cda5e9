use glam::{Affine2, Mat4};

use crate::coords::{Orientation, Viewport};

use super::{Anchor, PinholeCamera, PlanarImage, TrackedFrame};

/// Plain-data [`TrackedFrame`] backed by a pinhole camera model.
#[derive(Debug, Clone)]
pub struct FrameSnapshot {
    pub image: PlanarImage,
    pub anchors: Vec<Anchor>,
    pub camera: PinholeCamera,
    /// Engine timestamp in seconds.
    pub timestamp: f64,
}

impl TrackedFrame for FrameSnapshot {
    fn captured_image(&self) -> &PlanarImage {
        &self.image
    }

    fn anchors(&self) -> &[Anchor] {
        &self.anchors
    }

    fn view_matrix(&self, orientation: Orientation) -> Mat4 {
        self.camera.view_matrix(orientation)
    }

    fn projection_matrix(
        &self,
        orientation: Orientation,
        viewport: Viewport,
        z_near: f32,
        z_far: f32,
    ) -> Mat4 {
        self.camera
            .projection_matrix(orientation, viewport, z_near, z_far)
    }

    fn display_transform(&self, orientation: Orientation, viewport: Viewport) -> Affine2 {
        self.camera.display_transform(orientation, viewport)
    }
}
