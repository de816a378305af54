use std::time::{Duration, Instant};

/// Frame timing snapshot handed to the scene update passes.
#[derive(Debug, Copy, Clone)]
pub struct FrameStamp {
    /// Monotonic frame counter, starting at 0.
    pub frame_count: u64,

    /// Seconds since the clock was created.
    pub time: f64,

    /// Clamped seconds since the previous tick.
    pub dt: f32,

    /// Monotonic timestamp taken at the tick.
    pub now: Instant,
}

impl FrameStamp {
    /// Stamp used before the first frame has been advanced.
    pub fn initial(now: Instant) -> Self {
        Self {
            frame_count: 0,
            time: 0.0,
            dt: 0.0,
            now,
        }
    }
}

/// Frame clock producing [`FrameStamp`] snapshots.
///
/// Delta time is clamped so that a debugger pause or a long driver stall
/// does not hand a huge step to the scene update. Absolute `time` is not
/// clamped.
#[derive(Debug, Clone)]
pub struct FrameClock {
    origin: Instant,
    last: Instant,
    frame_count: u64,
    dt_min: Duration,
    dt_max: Duration,
}

impl FrameClock {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            origin: now,
            last: now,
            frame_count: 0,
            dt_min: Duration::from_micros(100),
            dt_max: Duration::from_millis(250),
        }
    }

    /// Creates a clock with custom delta-time clamps.
    pub fn with_clamps(dt_min: Duration, dt_max: Duration) -> Self {
        debug_assert!(dt_min <= dt_max);
        Self {
            dt_min,
            dt_max,
            ..Self::new()
        }
    }

    /// Number of stamps produced so far.
    #[inline]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Advances the clock and returns a new stamp.
    pub fn tick(&mut self) -> FrameStamp {
        let now = Instant::now();
        let dt = now
            .saturating_duration_since(self.last)
            .clamp(self.dt_min, self.dt_max);

        self.last = now;

        let stamp = FrameStamp {
            frame_count: self.frame_count,
            time: now.saturating_duration_since(self.origin).as_secs_f64(),
            dt: dt.as_secs_f32(),
            now,
        };

        self.frame_count = self.frame_count.wrapping_add(1);
        stamp
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
    fn frame_count_increments_per_tick() {
        let mut clock = FrameClock::new();
        assert_eq!(clock.tick().frame_count, 0);
        assert_eq!(clock.tick().frame_count, 1);
        assert_eq!(clock.frame_count(), 2);
    }

    #[test]
    fn dt_is_clamped_to_minimum() {
        let mut clock = FrameClock::with_clamps(Duration::from_millis(5), Duration::from_millis(10));
        let stamp = clock.tick();
        assert!(stamp.dt >= 0.005 - f32::EPSILON);
    }

    #[test]
    fn time_is_monotonic() {
        let mut clock = FrameClock::new();
        let a = clock.tick();
        let b = clock.tick();
        assert!(b.time >= a.time);
    }
}
