use glam::Vec2;

/// Keys the presentation layer binds. Everything else is `Other`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Key {
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Escape,
    Other,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum KeyState {
    Pressed,
    Released,
}

/// Lifecycle of a single touch.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TouchPhase {
    Began,
    Moved,
    Ended,
    Cancelled,
}

/// A touch sample in points, with the bounds of the view it landed in.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TouchEvent {
    pub phase: TouchPhase,
    pub location: Vec2,
    pub bounds: Vec2,
}

/// Platform-agnostic input events emitted by the runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    Key { key: Key, state: KeyState, repeat: bool },
    /// Scroll in lines; positive is away from the user.
    Wheel { lines: f32 },
    Touch(TouchEvent),
}
