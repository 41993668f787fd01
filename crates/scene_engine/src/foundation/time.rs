//! Frame timing
//!
//! The engine advances one [`FrameClock`] tick per frame. Headless runs use a
//! fixed step so frame numbers and delta times are reproducible.

use std::time::Instant;

/// Upper bound on a single frame delta, so a stall does not explode script updates
pub const MAX_FRAME_DELTA: f32 = 0.25;

/// Snapshot of the clock for the current frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTime {
    /// Frame number, starting at 1 for the first tick
    pub frame: u64,
    /// Seconds since the previous tick
    pub delta: f32,
    /// Seconds since the clock was created
    pub elapsed: f32,
}

#[derive(Debug, Clone, Copy)]
enum ClockSource {
    Wall(Instant),
    Fixed(f32),
}

/// Frame clock driven by wall time or by a fixed step
#[derive(Debug, Clone)]
pub struct FrameClock {
    source: ClockSource,
    current: FrameTime,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock {
    /// Create a clock measuring wall time
    pub fn new() -> Self {
        Self {
            source: ClockSource::Wall(Instant::now()),
            current: FrameTime { frame: 0, delta: 0.0, elapsed: 0.0 },
        }
    }

    /// Create a clock advancing by `step` seconds per tick
    pub fn fixed(step: f32) -> Self {
        Self {
            source: ClockSource::Fixed(step),
            current: FrameTime { frame: 0, delta: 0.0, elapsed: 0.0 },
        }
    }

    /// Advance to the next frame
    pub fn tick(&mut self) -> FrameTime {
        let delta = match &mut self.source {
            ClockSource::Wall(last) => {
                let now = Instant::now();
                let elapsed = now.duration_since(*last).as_secs_f32();
                *last = now;
                elapsed.min(MAX_FRAME_DELTA)
            }
            ClockSource::Fixed(step) => *step,
        };
        self.current = FrameTime {
            frame: self.current.frame + 1,
            delta,
            elapsed: self.current.elapsed + delta,
        };
        self.current
    }

    /// The most recent tick (frame 0 before the first tick)
    pub fn current(&self) -> FrameTime {
        self.current
    }

    /// Current frame number
    pub fn frame(&self) -> u64 {
        self.current.frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_fixed_clock_advances_deterministically() {
        let mut clock = FrameClock::fixed(0.5);
        clock.tick();
        let time = clock.tick();

        assert_eq!(time.frame, 2);
        assert_relative_eq!(time.delta, 0.5);
        assert_relative_eq!(time.elapsed, 1.0);
    }

    #[test]
    fn test_wall_clock_delta_is_clamped() {
        let mut clock = FrameClock::new();
        let time = clock.tick();
        assert!(time.delta <= MAX_FRAME_DELTA);
        assert_eq!(clock.frame(), 1);
    }
}
