/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

use std::cell::Cell;
use std::time::{Duration, Instant};

/// Source of time for the polling loop.
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

#[derive(Clone, Copy, Default, Debug)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration)
    }
}

/// A clock that only moves when slept on. Lets a whole polling session
/// (intervals, backoffs, deadlines) replay instantly.
#[derive(Debug)]
pub struct ManualClock {
    start: Instant,
    now: Cell<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        let start = Instant::now();
        Self {
            start,
            now: Cell::new(start),
        }
    }

    pub fn advance(&self, duration: Duration) {
        self.now.set(self.now.get() + duration);
    }

    /// Total time slept (or advanced) since creation.
    pub fn elapsed(&self) -> Duration {
        self.now.get() - self.start
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now.get()
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration)
    }
}

impl<T: Clock + ?Sized> Clock for &T {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}
