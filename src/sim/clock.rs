/// Millisecond time source, read once per frame by the host loop.

use std::time::Instant;

pub trait Clock {
    /// Milliseconds since the clock started. Never goes backwards.
    fn now_ms(&self) -> u64;
}

/// Wall-clock time since construction.
#[derive(Clone, Copy, Debug)]
pub struct MonotonicClock {
    start: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        MonotonicClock { start: Instant::now() }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}
