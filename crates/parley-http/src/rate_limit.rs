//! Per-route and global quota tracking
//!
//! Each bucket has an admission gate (a `tokio::sync::Mutex`) that is held
//! only while a request slot is claimed, never across the request itself.
//! While the bucket has remaining quota, callers are admitted immediately and
//! their requests overlap; once it is exhausted, the head of the queue sleeps
//! until the reset and everyone queued behind it waits in call order. A 429
//! penalty recorded from response headers parks the bucket the same way, so
//! queued callers wait it out instead of running into the same penalty.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex as SyncMutex;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Quota state reconciled from response headers
#[derive(Debug, Default, Clone, Copy)]
struct BucketState {
    limit: u32,
    remaining: u32,
    reset_at: Option<Instant>,
}

/// Rate-limit fields extracted from one response
#[derive(Debug, Default, Clone, Copy)]
pub struct RateLimitUpdate {
    pub limit: Option<u32>,
    pub remaining: Option<u32>,
    pub reset_after: Option<Duration>,
    pub retry_after: Option<Duration>,
    pub global: bool,
}

#[derive(Debug, Default)]
struct Bucket {
    admission: Mutex<()>,
    state: SyncMutex<BucketState>,
}

#[derive(Debug, Default)]
pub struct RateLimiter {
    buckets: DashMap<String, Arc<Bucket>>,
    global_until: SyncMutex<Option<Instant>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn bucket(&self, bucket_key: &str) -> Arc<Bucket> {
        self.buckets
            .entry(bucket_key.to_string())
            .or_default()
            .clone()
    }

    /// Claim one request slot on `bucket_key`, waiting out any exhaustion
    ///
    /// Up to `remaining` requests may be in flight on one bucket at a time.
    /// A bucket never seen before admits optimistically until its first
    /// response headers arrive. The global window is honored before any
    /// bucket slot is handed out.
    pub async fn acquire(&self, bucket_key: &str) {
        let bucket = self.bucket(bucket_key);
        let _admission = bucket.admission.lock().await;

        loop {
            let until = *self.global_until.lock();
            match until {
                Some(t) if Instant::now() < t => {
                    tracing::debug!("global rate limit active, suspending");
                    tokio::time::sleep_until(t).await;
                }
                Some(_) => {
                    *self.global_until.lock() = None;
                    break;
                }
                None => break,
            }
        }

        loop {
            let wait_until = {
                let mut state = bucket.state.lock();
                match state.reset_at {
                    Some(reset_at) if state.remaining == 0 && Instant::now() < reset_at => {
                        Some(reset_at)
                    }
                    _ => {
                        if state.remaining == 0 && state.reset_at.take().is_some() {
                            // the window rolled over while nobody was waiting
                            state.remaining = state.limit.max(1);
                        }
                        state.remaining = state.remaining.saturating_sub(1);
                        None
                    }
                }
            };
            match wait_until {
                Some(reset_at) => {
                    tracing::debug!(
                        bucket = bucket_key,
                        reset_in = ?(reset_at - Instant::now()),
                        "bucket exhausted, suspending"
                    );
                    tokio::time::sleep_until(reset_at).await;
                }
                None => return,
            }
        }
    }

    /// Reconcile bucket and global state from one response's headers
    pub fn record(&self, bucket_key: &str, update: &RateLimitUpdate) {
        if update.global {
            if let Some(retry_after) = update.retry_after {
                *self.global_until.lock() = Some(Instant::now() + retry_after);
            }
            return;
        }

        let bucket = self.bucket(bucket_key);
        let mut state = bucket.state.lock();
        if let Some(limit) = update.limit {
            state.limit = limit;
        }
        if let Some(remaining) = update.remaining {
            state.remaining = remaining;
        }
        if let Some(reset_after) = update.reset_after {
            state.reset_at = Some(Instant::now() + reset_after);
        }
        // retry-after only appears on a 429; treat it as a bucket-wide penalty
        if let Some(retry_after) = update.retry_after {
            state.remaining = 0;
            state.reset_at = Some(Instant::now() + retry_after);
        }
    }
}
