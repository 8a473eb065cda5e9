//! Window-title readout and keyboard/wheel bindings for the quad width.

use arquad_engine::frame::SceneParams;
use arquad_engine::input::{InputFrame, Key};

/// Meters added per arrow press or wheel line.
const STEP: f32 = 0.01;

/// User-adjustable scene parameters plus the last readout shown.
#[derive(Debug)]
pub struct PlaneControls {
    params: SceneParams,
    shown: Option<String>,
}

impl PlaneControls {
    pub fn new(params: SceneParams) -> Self {
        Self {
            params,
            shown: None,
        }
    }

    pub fn params(&self) -> &SceneParams {
        &self.params
    }

    /// Applies this tick's key and wheel input; returns whether the width changed.
    pub fn apply_input(&mut self, input: &InputFrame) -> bool {
        let up = input.presses(Key::ArrowUp) + input.presses(Key::ArrowRight);
        let down = input.presses(Key::ArrowDown) + input.presses(Key::ArrowLeft);
        let steps = up as f32 - down as f32 + input.wheel_lines();
        if steps == 0.0 {
            return false;
        }

        let before = self.params.quad_width();
        self.params.set_quad_width(before + steps * STEP);
        let changed = self.params.quad_width() != before;
        if changed {
            log::debug!("plane width {:.0} cm", self.params.quad_width() * 100.0);
        }
        changed
    }

    /// New title text if it differs from what is already shown.
    pub fn refresh(&mut self, anchor_count: usize) -> Option<&str> {
        let text = readout(self.params.quad_width(), anchor_count);
        if self.shown.as_deref() == Some(text.as_str()) {
            return None;
        }
        self.shown = Some(text);
        self.shown.as_deref()
    }
}

pub fn readout(quad_width: f32, anchor_count: usize) -> String {
    format!(
        "Plane width {:.0} cm  ·  Number of Planes: {}",
        quad_width * 100.0,
        anchor_count
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use arquad_engine::input::{InputEvent, KeyState};

    fn press(key: Key) -> InputEvent {
        InputEvent::Key {
            key,
            state: KeyState::Pressed,
            repeat: false,
        }
    }

    #[test]
    fn readout_matches_labels() {
        assert_eq!(
            readout(0.25, 3),
            "Plane width 25 cm  ·  Number of Planes: 3"
        );
    }

    #[test]
    fn arrows_and_wheel_adjust_width() {
        let mut c = PlaneControls::new(SceneParams::new(0.2));
        let mut input = InputFrame::default();
        input.push_event(press(Key::ArrowUp));
        input.push_event(press(Key::ArrowUp));
        input.push_event(InputEvent::Wheel { lines: -1.0 });
        assert!(c.apply_input(&input));
        assert!((c.params().quad_width() - 0.21).abs() < 1e-5);
    }

    #[test]
    fn width_stops_at_bounds() {
        let mut c = PlaneControls::new(SceneParams::new(SceneParams::MAX_QUAD_WIDTH));
        let mut input = InputFrame::default();
        input.push_event(press(Key::ArrowRight));
        assert!(!c.apply_input(&input));
        assert_eq!(c.params().quad_width(), SceneParams::MAX_QUAD_WIDTH);
    }

    #[test]
    fn refresh_only_reports_changes() {
        let mut c = PlaneControls::new(SceneParams::new(0.1));
        assert!(c.refresh(0).is_some());
        assert!(c.refresh(0).is_none());
        assert!(c.refresh(1).is_some());
    }
}
