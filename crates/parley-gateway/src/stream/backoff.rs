//! Reconnect backoff
//!
//! Exponential growth from a configured base up to a cap, with jitter so a
//! fleet of clients dropped by the same outage does not reconnect in
//! lockstep. Reset whenever a handshake completes.

use std::time::Duration;

use parley_common::BackoffConfig;
use rand::Rng;

#[derive(Debug)]
pub struct Backoff {
    base: Duration,
    cap: Duration,
    attempt: u32,
}

impl Backoff {
    #[must_use]
    pub fn new(config: &BackoffConfig) -> Self {
        Self {
            base: Duration::from_millis(config.base_ms),
            cap: Duration::from_millis(config.cap_ms),
            attempt: 0,
        }
    }

    /// Delay before the next attempt; each call counts as one attempt
    pub fn next_delay(&mut self) -> Duration {
        let raw = self.unjittered(self.attempt);
        self.attempt = self.attempt.saturating_add(1);
        // jitter in [0.5, 1.0) keeps the exponential shape while spreading
        // simultaneous reconnects
        let jitter = rand::thread_rng().gen_range(0.5..1.0);
        raw.mul_f64(jitter)
    }

    /// Start over after a successful handshake
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    fn unjittered(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.min(16));
        self.base.saturating_mul(factor).min(self.cap)
    }
}
