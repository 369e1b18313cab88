//! A wall-clock-backed [`Clock`] for hosted tests, so the real microsecond
//! timing constants in `bus_engine::config` apply unmodified instead of
//! needing a separate "fast-forwarded" notion of time.

use std::time::Instant;

use bus_engine::gpio::Clock;

#[derive(Clone)]
pub struct SimClock {
    start: Instant,
}

impl SimClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SimClock {
    fn micros(&self) -> u32 {
        self.start.elapsed().as_micros() as u32
    }
}
