//! Time sources for the event loop
//!
//! Time is measured as the [`Duration`] elapsed since the clock's origin.
//! [`SystemClock`] follows the monotonic system clock; [`ManualClock`] only
//! moves when told to, which keeps timer-driven behaviour deterministic.

use std::cell::Cell;
use std::time::{Duration, Instant};

/// A monotonic time source
pub trait Clock {
    /// Time elapsed since the clock's origin
    fn now(&self) -> Duration;

    /// Move the clock forward to `to`.
    ///
    /// Real clocks ignore this; the event loop calls it before firing each
    /// timer so that callbacks observe their own deadline as "now".
    fn advance_to(&self, _to: Duration) {}
}

/// Monotonic system clock
#[derive(Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Clock that is advanced explicitly
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the clock by `delta`
    pub fn advance(&self, delta: Duration) {
        self.now.set(self.now.get() + delta);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }

    fn advance_to(&self, to: Duration) {
        // Never run backwards
        if to > self.now.get() {
            self.now.set(to);
        }
    }
}
