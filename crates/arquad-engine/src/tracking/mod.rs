//! Boundary to the motion-tracking / plane-detection engine.
//!
//! The engine itself is a black box. It produces one immutable
//! [`TrackedFrame`] snapshot per tick (camera image, camera matrices, anchors)
//! and optionally reports anchor deltas as [`SessionEvent`]s.
//!
//! [`FrameSnapshot`] + [`PinholeCamera`] are a concrete frame type for
//! engines (or tests) that describe the camera with pinhole intrinsics.

mod anchor;
mod camera;
mod image;
mod session;
mod snapshot;

pub use anchor::{horizontal_plane_positions, Anchor, AnchorId, PlaneAlignment, PlaneAnchor};
pub use camera::{Intrinsics, PinholeCamera};
pub use image::{ImagePlane, PlanarImage};
pub use session::{
    PlaneDetection, SessionEvent, TrackedFrame, TrackingConfig, TrackingObserver, TrackingSession,
};
pub use snapshot::FrameSnapshot;
