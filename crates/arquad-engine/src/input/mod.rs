//! Input subsystem.
//!
//! Public API is platform-agnostic and does not expose winit types.
//! The runtime translates window events into [`InputEvent`]s and forwards
//! touches to an injected [`TouchListener`].

mod frame;
mod touch;
mod types;

pub use frame::InputFrame;
pub use touch::{MouseTouchEmulator, TouchListener};
pub use types::{InputEvent, Key, KeyState, TouchEvent, TouchPhase};
