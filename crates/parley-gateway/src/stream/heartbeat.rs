//! Heartbeat scheduling and liveness
//!
//! The server announces the interval in Hello. Each beat must be
//! acknowledged before the next one is due; a missing ack means the
//! connection is a zombie and must be torn down and resumed.

use std::time::Duration;

use rand::Rng;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

#[derive(Debug)]
pub(crate) struct Heartbeat {
    timer: Interval,
    acked: bool,
}

impl Heartbeat {
    /// Schedule beats every `interval_ms`, the first after a random fraction
    /// of the interval so freshly identified clients spread their load
    pub(crate) fn new(interval_ms: u64) -> Self {
        let interval = Duration::from_millis(interval_ms.max(1));
        let first_in = interval.mul_f64(rand::thread_rng().gen_range(0.0..1.0));
        let mut timer = interval_at(Instant::now() + first_in, interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { timer, acked: true }
    }

    /// Wait until the next beat is due
    pub(crate) async fn due(&mut self) {
        self.timer.tick().await;
    }

    /// Mark a beat as sent; false when the previous beat was never acked
    pub(crate) fn beat(&mut self) -> bool {
        if !self.acked {
            return false;
        }
        self.acked = false;
        true
    }

    pub(crate) fn ack(&mut self) {
        self.acked = true;
    }
}
