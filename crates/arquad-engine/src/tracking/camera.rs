use glam::{Affine2, Mat2, Mat4, UVec2, Vec2};

use crate::coords::{Orientation, Viewport};

/// Pinhole intrinsics in sensor pixels (native landscape-right orientation).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Intrinsics {
    pub fx: f32,
    pub fy: f32,
    pub cx: f32,
    pub cy: f32,
}

impl Intrinsics {
    /// Square-pixel intrinsics with the principal point at the image center.
    pub fn from_horizontal_fov(resolution: UVec2, fov_x: f32) -> Self {
        let f = resolution.x as f32 * 0.5 / (fov_x * 0.5).tan();
        Self {
            fx: f,
            fy: f,
            cx: resolution.x as f32 * 0.5,
            cy: resolution.y as f32 * 0.5,
        }
    }
}

/// Camera model of one tracked frame.
///
/// `pose` is camera-to-world in tracking space: right-handed, the camera
/// looks down -Z with +Y up while held in the sensor's native orientation.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PinholeCamera {
    pub pose: Mat4,
    pub intrinsics: Intrinsics,
    pub resolution: UVec2,
}

impl PinholeCamera {
    /// World-to-camera matrix with the camera rolled to `orientation`.
    pub fn view_matrix(&self, orientation: Orientation) -> Mat4 {
        (self.pose * Mat4::from_rotation_z(orientation.roll())).inverse()
    }

    /// Maps normalized image coordinates to normalized viewport coordinates,
    /// rotating for `orientation` and aspect-filling `viewport`.
    ///
    /// The inverse maps viewport corners back into the (cropped) image.
    pub fn display_transform(&self, orientation: Orientation, viewport: Viewport) -> Affine2 {
        let rotate = match orientation {
            Orientation::LandscapeRight => Affine2::IDENTITY,
            Orientation::LandscapeLeft => Affine2::from_mat2_translation(
                Mat2::from_cols(Vec2::new(-1.0, 0.0), Vec2::new(0.0, -1.0)),
                Vec2::new(1.0, 1.0),
            ),
            Orientation::Portrait => Affine2::from_mat2_translation(
                Mat2::from_cols(Vec2::new(0.0, -1.0), Vec2::new(1.0, 0.0)),
                Vec2::new(0.0, 1.0),
            ),
            Orientation::PortraitUpsideDown => Affine2::from_mat2_translation(
                Mat2::from_cols(Vec2::new(0.0, 1.0), Vec2::new(-1.0, 0.0)),
                Vec2::new(1.0, 0.0),
            ),
        };

        let overflow = self.fill_overflow(orientation, viewport);
        let fill = Affine2::from_mat2_translation(
            Mat2::from_diagonal(overflow),
            (Vec2::ONE - overflow) * 0.5,
        );

        fill * rotate
    }

    /// Right-handed perspective projection covering exactly the part of the
    /// image that survives aspect-fill cropping. Depth maps to `0..1`.
    pub fn projection_matrix(
        &self,
        orientation: Orientation,
        viewport: Viewport,
        z_near: f32,
        z_far: f32,
    ) -> Mat4 {
        let focal_y = if orientation.is_portrait() {
            self.intrinsics.fx
        } else {
            self.intrinsics.fy
        };
        let scale = self.fill_scale(orientation, viewport);
        let visible_half_height = viewport.height / (2.0 * scale);
        let fov_y = 2.0 * (visible_half_height / focal_y).atan();
        Mat4::perspective_rh(fov_y, viewport.aspect(), z_near, z_far)
    }

    fn oriented_resolution(&self, orientation: Orientation) -> Vec2 {
        let r = self.resolution.as_vec2();
        if orientation.is_portrait() { Vec2::new(r.y, r.x) } else { r }
    }

    /// Pixels of viewport per pixel of image after aspect fill.
    fn fill_scale(&self, orientation: Orientation, viewport: Viewport) -> f32 {
        let image = self.oriented_resolution(orientation);
        (viewport.width / image.x).max(viewport.height / image.y)
    }

    /// Size of the filled image in viewport units; at least 1 on both axes.
    fn fill_overflow(&self, orientation: Orientation, viewport: Viewport) -> Vec2 {
        if !viewport.is_valid() {
            return Vec2::ONE;
        }
        let image = self.oriented_resolution(orientation);
        let scale = self.fill_scale(orientation, viewport);
        Vec2::new(
            image.x * scale / viewport.width,
            image.y * scale / viewport.height,
        )
    }
}
