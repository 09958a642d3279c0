//! # Feature: Helix Rate Limiting
//!
//! Schedules retries for calls rejected with HTTP 429. The wait comes from
//! the `Ratelimit-Reset` header (epoch seconds). A per-endpoint async lock
//! keeps a retried call from racing a fresh call to the same endpoint.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 2.0.0: Server-driven retry scheduling replaces the local sliding window
//! - 1.1.0: Composite keys with DashMap
//! - 1.0.0: Initial release

use dashmap::DashMap;
use log::debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::sleep;

/// Retry ceiling per call
pub const DEFAULT_MAX_RETRIES: u32 = 10;

/// Wait used when a 429 carries no usable reset header
pub const FALLBACK_WAIT: Duration = Duration::from_secs(1);

pub const RESET_HEADER: &str = "ratelimit-reset";

/// Source of "now" in epoch seconds
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(|| chrono::Utc::now().timestamp())
}

/// Retry bookkeeping for one call in flight
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitState {
    pub reset_epoch: Option<i64>,
    pub retries: u32,
    pub max_retries: u32,
}

impl RateLimitState {
    pub fn new(max_retries: u32) -> Self {
        RateLimitState {
            reset_epoch: None,
            retries: 0,
            max_retries,
        }
    }

    /// Record a 429 and return how long to wait, or `None` at the ceiling.
    pub fn schedule_retry(&mut self, reset_epoch: Option<i64>, now: i64) -> Option<Duration> {
        if self.retries >= self.max_retries {
            return None;
        }
        self.retries += 1;
        self.reset_epoch = reset_epoch;

        Some(match reset_epoch {
            Some(reset) => Duration::from_secs(reset.saturating_sub(now).max(0) as u64),
            None => FALLBACK_WAIT,
        })
    }
}

pub fn parse_reset(value: Option<&str>) -> Option<i64> {
    value.and_then(|v| v.trim().parse().ok())
}

pub struct RetryScheduler {
    locks: DashMap<String, Arc<Mutex<()>>>,
    clock: Clock,
    max_retries: u32,
    scheduled: AtomicU64,
}

impl RetryScheduler {
    pub fn new() -> Self {
        Self::with_clock(system_clock())
    }

    pub fn with_clock(clock: Clock) -> Self {
        RetryScheduler {
            locks: DashMap::new(),
            clock,
            max_retries: DEFAULT_MAX_RETRIES,
            scheduled: AtomicU64::new(0),
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn now(&self) -> i64 {
        (self.clock)()
    }

    /// Fresh state for a new call
    pub fn state(&self) -> RateLimitState {
        RateLimitState::new(self.max_retries)
    }

    /// Serialize calls to `endpoint`. Held for the whole call, retries included.
    pub async fn lock(&self, endpoint: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(endpoint.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    /// Sleep out a scheduled retry
    pub async fn wait(&self, delay: Duration) {
        self.scheduled.fetch_add(1, Ordering::Relaxed);
        debug!("Retry scheduled in {}s", delay.as_secs());
        sleep(delay).await;
    }

    /// Total retries scheduled since creation
    pub fn scheduled_retries(&self) -> u64 {
        self.scheduled.load(Ordering::Relaxed)
    }
}

impl Default for RetryScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    fn fixed_clock(now: i64) -> Clock {
        Arc::new(move || now)
    }

    #[test]
    fn test_wait_from_reset_epoch() {
        let mut state = RateLimitState::new(3);
        assert_eq!(state.schedule_retry(Some(1005), 1000), Some(Duration::from_secs(5)));
        assert_eq!(state.retries, 1);
        assert_eq!(state.reset_epoch, Some(1005));
    }

    #[test]
    fn test_past_reset_clamps_to_zero() {
        let mut state = RateLimitState::new(3);
        assert_eq!(state.schedule_retry(Some(990), 1000), Some(Duration::ZERO));
    }

    #[test]
    fn test_extreme_reset_values_do_not_overflow() {
        let mut state = RateLimitState::new(3);
        let reset = parse_reset(Some("-9223372036854775808"));
        assert_eq!(state.schedule_retry(reset, 1000), Some(Duration::ZERO));

        let wait = state.schedule_retry(Some(i64::MAX), -1000);
        assert_eq!(wait, Some(Duration::from_secs(i64::MAX as u64)));
    }

    #[test]
    fn test_missing_header_uses_fallback() {
        let mut state = RateLimitState::new(3);
        assert_eq!(state.schedule_retry(None, 1000), Some(FALLBACK_WAIT));
    }

    #[test]
    fn test_ceiling() {
        let mut state = RateLimitState::new(2);
        assert!(state.schedule_retry(None, 0).is_some());
        assert!(state.schedule_retry(None, 0).is_some());
        assert!(state.schedule_retry(None, 0).is_none());
        assert_eq!(state.retries, 2);
    }

    #[test]
    fn test_parse_reset() {
        assert_eq!(parse_reset(Some(" 1700000000 ")), Some(1_700_000_000));
        assert_eq!(parse_reset(Some("soon")), None);
        assert_eq!(parse_reset(None), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_counts_and_sleeps() {
        let scheduler = RetryScheduler::with_clock(fixed_clock(1000));
        let start = Instant::now();
        scheduler.wait(Duration::from_secs(5)).await;
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(5) && elapsed < Duration::from_secs(6));
        assert_eq!(scheduler.scheduled_retries(), 1);
        assert_eq!(scheduler.now(), 1000);
    }

    #[tokio::test]
    async fn test_endpoint_locks_are_independent() {
        let scheduler = RetryScheduler::new();
        let _users = scheduler.lock("GET users").await;
        // A different endpoint must not block
        let _clips = scheduler.lock("GET clips").await;
        assert!(scheduler.locks.get("GET users").unwrap().try_lock().is_err());
    }
}
