use super::types::{InputEvent, Key, KeyState};

/// Input events received since the previous tick, in arrival order.
#[derive(Debug, Default)]
pub struct InputFrame {
    pub events: Vec<InputEvent>,
}

impl InputFrame {
    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn push_event(&mut self, ev: InputEvent) {
        self.events.push(ev);
    }

    /// Presses of `key` this tick, counting key repeats.
    pub fn presses(&self, key: Key) -> usize {
        self.events
            .iter()
            .filter(|ev| {
                matches!(ev, InputEvent::Key { key: k, state: KeyState::Pressed, .. } if *k == key)
            })
            .count()
    }

    /// Sum of wheel movement this tick.
    pub fn wheel_lines(&self) -> f32 {
        self.events
            .iter()
            .map(|ev| match ev {
                InputEvent::Wheel { lines } => *lines,
                _ => 0.0,
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(key: Key, state: KeyState, repeat: bool) -> InputEvent {
        InputEvent::Key { key, state, repeat }
    }

    #[test]
    fn counts_presses_including_repeats() {
        let mut f = InputFrame::default();
        f.push_event(key(Key::ArrowUp, KeyState::Pressed, false));
        f.push_event(key(Key::ArrowUp, KeyState::Pressed, true));
        f.push_event(key(Key::ArrowUp, KeyState::Released, false));
        f.push_event(key(Key::ArrowDown, KeyState::Pressed, false));
        assert_eq!(f.presses(Key::ArrowUp), 2);
        assert_eq!(f.presses(Key::ArrowDown), 1);
    }

    #[test]
    fn wheel_sums_and_clear_resets() {
        let mut f = InputFrame::default();
        f.push_event(InputEvent::Wheel { lines: 1.0 });
        f.push_event(InputEvent::Wheel { lines: -0.5 });
        assert_eq!(f.wheel_lines(), 0.5);
        f.clear();
        assert_eq!(f.wheel_lines(), 0.0);
    }
}
