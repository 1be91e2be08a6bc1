use std::time::{Duration, Instant};

/// Frame timing snapshot.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FrameTime {
    /// Seconds since the previous frame.
    pub dt: f32,
    /// Seconds since the clock started.
    pub elapsed: f32,
    /// Monotonic frame counter, starting at 0.
    pub frame_index: u64,
}

impl FrameTime {
    /// First frame of a fixed-step run.
    pub fn first(dt: f32) -> Self {
        Self {
            dt,
            elapsed: 0.0,
            frame_index: 0,
        }
    }

    /// The frame after this one, `dt` seconds later. Used for headless
    /// fixed-step simulation.
    pub fn next(self, dt: f32) -> Self {
        Self {
            dt,
            elapsed: self.elapsed + dt,
            frame_index: self.frame_index.wrapping_add(1),
        }
    }

    /// Elapsed time in milliseconds.
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed as f64 * 1000.0
    }
}

/// Frame clock producing [`FrameTime`] snapshots.
///
/// Delta time is clamped so a stall (debugger, minimized window) does not
/// hand the demos a huge step.
#[derive(Debug, Clone)]
pub struct FrameClock {
    start: Instant,
    last: Instant,
    frame_index: u64,
    dt_min: Duration,
    dt_max: Duration,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::with_clamps(Duration::from_micros(100), Duration::from_millis(250))
    }

    pub fn with_clamps(dt_min: Duration, dt_max: Duration) -> Self {
        debug_assert!(dt_min <= dt_max);
        let now = Instant::now();
        Self {
            start: now,
            last: now,
            frame_index: 0,
            dt_min,
            dt_max,
        }
    }

    /// Restart the dt baseline (after a resume or surface reconfigure).
    /// Elapsed time keeps counting from construction.
    pub fn reset(&mut self) {
        self.last = Instant::now();
    }

    pub fn tick(&mut self) -> FrameTime {
        let now = Instant::now();
        let dt = now
            .saturating_duration_since(self.last)
            .clamp(self.dt_min, self.dt_max);
        self.last = now;

        let ft = FrameTime {
            dt: dt.as_secs_f32(),
            elapsed: now.saturating_duration_since(self.start).as_secs_f32(),
            frame_index: self.frame_index,
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

/// Fires once every `period` seconds of accumulated frame time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    period: f32,
    accumulated: f32,
}

impl Interval {
    pub fn new(period: f32) -> Self {
        Self {
            period: period.max(f32::EPSILON),
            accumulated: 0.0,
        }
    }

    /// Start already due, so the first `tick` fires.
    pub fn immediate(period: f32) -> Self {
        let mut i = Self::new(period);
        i.accumulated = i.period;
        i
    }

    /// Add `dt`; true when a period boundary was crossed. At most one firing
    /// is reported per call, the remainder is dropped.
    pub fn tick(&mut self, dt: f32) -> bool {
        self.accumulated += dt;
        if self.accumulated >= self.period {
            self.accumulated %= self.period;
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        self.accumulated = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_dt_is_clamped() {
        let mut clock = FrameClock::with_clamps(Duration::from_millis(5), Duration::from_millis(10));
        let a = clock.tick();
        assert!(a.dt >= 0.005 - 1e-6 && a.dt <= 0.010 + 1e-6);
        let b = clock.tick();
        assert_eq!(b.frame_index, a.frame_index + 1);
        assert!(b.elapsed >= a.elapsed);
    }

    #[test]
    fn fixed_steps_accumulate() {
        let mut t = FrameTime::first(0.5);
        for _ in 0..4 {
            t = t.next(0.5);
        }
        assert_eq!(t.frame_index, 4);
        assert!((t.elapsed - 2.0).abs() < 1e-6);
        assert!((t.elapsed_ms() - 2000.0).abs() < 1e-3);
    }

    #[test]
    fn interval_fires_each_period() {
        let mut i = Interval::new(1.0);
        let fired: Vec<bool> = (0..8).map(|_| i.tick(0.25)).collect();
        assert_eq!(fired, vec![false, false, false, true, false, false, false, true]);
    }

    #[test]
    fn immediate_interval_fires_first() {
        let mut i = Interval::immediate(1.0);
        assert!(i.tick(0.016));
        assert!(!i.tick(0.016));
    }
}
