//! GPU rendering subsystem.
//!
//! Two renderers share one encoder per frame:
//! - [`CameraImageCompositor`] clears the target and draws the camera feed
//! - [`AnchorRenderer`] composites one decal quad per plane anchor on top
//!
//! Each renderer owns its GPU resources. Pipelines are built once for the
//! surface's color format and the shared depth format.

mod anchors;
mod camera_image;
mod common;
mod ctx;
mod decal;

pub use anchors::{AnchorRenderer, AnchorScene, InstancedDraw};
pub use camera_image::{
    CameraImageCompositor, CapturedTextures, ImagePlane, ImagePlaneVertex, TextureUpload,
};
pub use ctx::{RenderCtx, RenderTarget};
pub use decal::{checkerboard_decal, load_decal};
