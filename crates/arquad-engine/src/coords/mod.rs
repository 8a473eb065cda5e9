//! Coordinate and geometry types shared by the tracking boundary and renderers.
//!
//! Conventions:
//! - Viewport sizes are physical pixels (drawable size), never points
//! - Tracking space is right-handed (+Y up, camera looks down -Z)
//! - Render space is left-handed; see [`flip_z`]
//! - Normalized image/view coordinates are `0..1`, origin top-left

mod handedness;
mod orientation;
mod viewport;

pub use handedness::{flip_z, to_render_space};
pub use orientation::Orientation;
pub use viewport::Viewport;
