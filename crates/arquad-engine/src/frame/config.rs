use crate::coords::Orientation;

/// Per-tick coordinator settings.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Orientation used for camera matrices and the display transform.
    pub orientation: Orientation,
    pub z_near: f32,
    pub z_far: f32,
    /// GPU frames allowed in flight before the render thread blocks.
    pub max_frames_in_flight: usize,
    /// Clear color applied before the camera image is drawn.
    pub clear_color: wgpu::Color,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            orientation: Orientation::Portrait,
            z_near: 0.001,
            z_far: 10000.0,
            max_frames_in_flight: 1,
            clear_color: wgpu::Color::TRANSPARENT,
        }
    }
}

/// Parameters bound to the presentation layer.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SceneParams {
    quad_width: f32,
}

impl SceneParams {
    pub const MIN_QUAD_WIDTH: f32 = 0.01;
    pub const MAX_QUAD_WIDTH: f32 = 1.0;

    pub fn new(quad_width: f32) -> Self {
        let mut params = Self::default();
        params.set_quad_width(quad_width);
        params
    }

    /// Side length of each anchor quad, in meters.
    pub fn quad_width(&self) -> f32 {
        self.quad_width
    }

    pub fn set_quad_width(&mut self, width: f32) {
        let width = if width.is_finite() { width } else { Self::MIN_QUAD_WIDTH };
        self.quad_width = width.clamp(Self::MIN_QUAD_WIDTH, Self::MAX_QUAD_WIDTH);
    }
}

impl Default for SceneParams {
    fn default() -> Self {
        Self {
            quad_width: Self::MIN_QUAD_WIDTH,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quad_width_is_clamped() {
        assert_eq!(SceneParams::new(5.0).quad_width(), 1.0);
        assert_eq!(SceneParams::new(0.0).quad_width(), 0.01);
        assert_eq!(SceneParams::new(f32::NAN).quad_width(), 0.01);
        assert_eq!(SceneParams::new(0.3).quad_width(), 0.3);
    }
}
