//! arquad engine crate.
//!
//! Camera passthrough compositing and anchor rendering on top of wgpu,
//! driven by a pluggable tracking session.

pub mod coords;
pub mod core;
pub mod device;
pub mod frame;
pub mod input;
pub mod logging;
pub mod render;
pub mod time;
pub mod tracking;
pub mod window;
