use std::time::{Duration, Instant};

/// Timing of one render tick.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Seconds since the previous tick, clamped.
    pub dt: f32,

    /// Monotonic timestamp taken at the tick.
    pub now: Instant,

    /// Monotonic tick counter, starting at 0.
    pub frame_index: u64,

    /// Exponentially smoothed ticks per second.
    pub fps: f32,
}

/// Per-window tick clock.
///
/// `dt` is clamped so a debugger pause or a GPU stall does not produce a huge
/// step in anything animated from it.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    frame_index: u64,
    fps: f32,
    dt_min: Duration,
    dt_max: Duration,
}

impl FrameClock {
    /// Display refresh the render loop is paced to.
    pub const TARGET_FPS: f32 = 60.0;

    const FPS_SMOOTHING: f32 = 0.1;

    pub fn new() -> Self {
        Self::with_clamps(Duration::from_micros(100), Duration::from_millis(250))
    }

    pub fn with_clamps(dt_min: Duration, dt_max: Duration) -> Self {
        debug_assert!(dt_min <= dt_max);
        Self {
            last: Instant::now(),
            frame_index: 0,
            fps: Self::TARGET_FPS,
            dt_min,
            dt_max,
        }
    }

    /// Resets the baseline, e.g. after the window was hidden.
    pub fn reset(&mut self) {
        self.last = Instant::now();
    }

    /// Advances the clock and returns this tick's timing.
    pub fn tick(&mut self) -> FrameTime {
        self.tick_at(Instant::now())
    }

    fn tick_at(&mut self, now: Instant) -> FrameTime {
        let dt = now
            .saturating_duration_since(self.last)
            .clamp(self.dt_min, self.dt_max)
            .as_secs_f32();
        self.last = now;

        self.fps += (1.0 / dt - self.fps) * Self::FPS_SMOOTHING;

        let ft = FrameTime {
            dt,
            now,
            frame_index: self.frame_index,
            fps: self.fps,
        };
        self.frame_index = self.frame_index.wrapping_add(1);
        ft
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_increase_and_dt_is_clamped() {
        let mut clock = FrameClock::new();
        let start = clock.last;

        let a = clock.tick_at(start + Duration::from_millis(16));
        let b = clock.tick_at(start + Duration::from_secs(5));
        assert_eq!((a.frame_index, b.frame_index), (0, 1));
        assert!((a.dt - 0.016).abs() < 1e-6);
        assert!((b.dt - 0.25).abs() < 1e-6);
    }

    #[test]
    fn steady_ticks_converge_to_rate() {
        let mut clock = FrameClock::new();
        let mut t = clock.last;
        let mut last = None;
        for _ in 0..200 {
            t += Duration::from_millis(20);
            last = Some(clock.tick_at(t));
        }
        assert!((last.unwrap().fps - 50.0).abs() < 0.5);
    }
}
