use glam::Vec2;

use super::types::{TouchEvent, TouchPhase};

/// Receives touches forwarded from the native view.
///
/// Injected into the runtime; implementors need no knowledge of the window.
pub trait TouchListener {
    fn touches_began(&mut self, location: Vec2, bounds: Vec2);
    fn touches_moved(&mut self, location: Vec2, bounds: Vec2);
    fn touches_ended(&mut self, location: Vec2, bounds: Vec2);

    /// Routes an event to the matching callback; cancelled touches end.
    fn dispatch(&mut self, ev: &TouchEvent) {
        match ev.phase {
            TouchPhase::Began => self.touches_began(ev.location, ev.bounds),
            TouchPhase::Moved => self.touches_moved(ev.location, ev.bounds),
            TouchPhase::Ended | TouchPhase::Cancelled => {
                self.touches_ended(ev.location, ev.bounds)
            }
        }
    }
}

/// Turns primary mouse button drags into a single-finger touch stream on
/// platforms without a touch screen.
#[derive(Debug, Default)]
pub struct MouseTouchEmulator {
    cursor: Option<Vec2>,
    pressed: bool,
}

impl MouseTouchEmulator {
    pub fn cursor_moved(&mut self, location: Vec2, bounds: Vec2) -> Option<TouchEvent> {
        self.cursor = Some(location);
        self.pressed.then_some(TouchEvent {
            phase: TouchPhase::Moved,
            location,
            bounds,
        })
    }

    pub fn button(&mut self, pressed: bool, bounds: Vec2) -> Option<TouchEvent> {
        if pressed == self.pressed {
            return None;
        }
        self.pressed = pressed;
        let location = self.cursor?;
        Some(TouchEvent {
            phase: if pressed { TouchPhase::Began } else { TouchPhase::Ended },
            location,
            bounds,
        })
    }

    /// Cursor left the view; an active drag is cancelled.
    pub fn cursor_left(&mut self, bounds: Vec2) -> Option<TouchEvent> {
        let location = self.cursor.take()?;
        if !std::mem::take(&mut self.pressed) {
            return None;
        }
        Some(TouchEvent {
            phase: TouchPhase::Cancelled,
            location,
            bounds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUNDS: Vec2 = Vec2::new(390.0, 844.0);

    #[derive(Default)]
    struct Recorder(Vec<&'static str>);

    impl TouchListener for Recorder {
        fn touches_began(&mut self, _: Vec2, _: Vec2) {
            self.0.push("began");
        }
        fn touches_moved(&mut self, _: Vec2, _: Vec2) {
            self.0.push("moved");
        }
        fn touches_ended(&mut self, _: Vec2, _: Vec2) {
            self.0.push("ended");
        }
    }

    #[test]
    fn drag_produces_began_moved_ended() {
        let mut emu = MouseTouchEmulator::default();
        let mut rec = Recorder::default();

        assert!(emu.cursor_moved(Vec2::new(10.0, 10.0), BOUNDS).is_none());
        let evs = [
            emu.button(true, BOUNDS),
            emu.cursor_moved(Vec2::new(20.0, 15.0), BOUNDS),
            emu.button(false, BOUNDS),
        ];
        for ev in evs.iter().flatten() {
            rec.dispatch(ev);
        }
        assert_eq!(rec.0, ["began", "moved", "ended"]);
    }

    #[test]
    fn press_without_cursor_is_ignored() {
        let mut emu = MouseTouchEmulator::default();
        assert!(emu.button(true, BOUNDS).is_none());
        assert!(emu.button(true, BOUNDS).is_none());
    }

    #[test]
    fn leaving_mid_drag_cancels() {
        let mut emu = MouseTouchEmulator::default();
        emu.cursor_moved(Vec2::ONE, BOUNDS);
        emu.button(true, BOUNDS);
        let ev = emu.cursor_left(BOUNDS).unwrap();
        assert_eq!(ev.phase, TouchPhase::Cancelled);
        assert!(emu.cursor_left(BOUNDS).is_none());
    }
}
