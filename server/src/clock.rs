use std::time::{Duration, Instant};

/// Source of elapsed time between physics ticks.
pub trait Clock {
    /// Milliseconds since the previous call (or since creation, for the first call).
    fn elapsed_since_previous_physics_tick(&mut self) -> u32;
}

/// Wall clock backed by [`Instant`].
///
/// Only whole milliseconds are reported. The unreported remainder carries over to the next
/// reading, so the sum of readings tracks wall time.
pub struct FrameClock {
    last: Instant,
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            last: Instant::now(),
        }
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FrameClock {
    fn elapsed_since_previous_physics_tick(&mut self) -> u32 {
        self.elapsed_at(Instant::now())
    }
}

impl FrameClock {
    fn elapsed_at(&mut self, now: Instant) -> u32 {
        let elapsed = now.saturating_duration_since(self.last);
        let ms = u32::try_from(elapsed.as_millis()).unwrap_or(u32::MAX);
        self.last += Duration::from_millis(u64::from(ms));
        ms
    }
}

/// Clock that always reports the same interval. Useful for deterministic runs.
#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub u32);

impl Clock for FixedClock {
    fn elapsed_since_previous_physics_tick(&mut self) -> u32 {
        self.0
    }
}

/// Convert clock milliseconds to the seconds the physics step expects.
#[inline]
pub fn millis_to_seconds(ms: u32) -> f32 {
    ms as f32 / 1000.0
}
