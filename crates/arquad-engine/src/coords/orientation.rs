/// Interface orientation used to ask the tracking engine for camera matrices
/// and the display transform.
///
/// The camera sensor's native orientation is `LandscapeRight`.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum Orientation {
    #[default]
    Portrait,
    PortraitUpsideDown,
    LandscapeLeft,
    LandscapeRight,
}

impl Orientation {
    /// Roll (radians, about the camera's viewing axis) that takes the sensor's
    /// native axes to this interface orientation's screen axes.
    pub fn roll(self) -> f32 {
        use std::f32::consts::{FRAC_PI_2, PI};
        match self {
            Orientation::LandscapeRight => 0.0,
            Orientation::Portrait => -FRAC_PI_2,
            Orientation::LandscapeLeft => PI,
            Orientation::PortraitUpsideDown => FRAC_PI_2,
        }
    }

    /// True when the sensor image must be rotated by a quarter turn on screen.
    #[inline]
    pub fn is_portrait(self) -> bool {
        matches!(self, Orientation::Portrait | Orientation::PortraitUpsideDown)
    }
}
