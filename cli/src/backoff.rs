//! Reconnect delay schedule.

use std::time::Duration;

const INITIAL_DELAY: Duration = Duration::from_millis(1000);
const FACTOR: f64 = 1.5;
const MAX_DELAY: Duration = Duration::from_millis(30_000);

/// Multiplicative backoff with a ceiling. Reset after a successful connect.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    factor: f64,
    max: Duration,
    current: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(INITIAL_DELAY, FACTOR, MAX_DELAY)
    }
}

impl Backoff {
    #[must_use]
    pub fn new(initial: Duration, factor: f64, max: Duration) -> Self {
        Self { initial, factor, max, current: initial.min(max) }
    }

    /// Delay to wait before the next attempt; grows the following one.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.mul_f64(self.factor).min(self.max);
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.initial.min(self.max);
    }
}
