//! Unit-level retry state
//!
//! A failed documentation request is retried whole. Two limits apply: the
//! per-unit [`AttemptState`] and the process-wide [`RetryBudget`] shared by
//! every worker.

use rand::Rng;
use std::sync::Mutex;
use std::time::Duration;

use crate::constants::retry;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries per unit after the first attempt
    pub limit: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            limit: retry::DEFAULT_RETRY_LIMIT,
            base_delay: Duration::from_millis(retry::BASE_DELAY_MS),
            max_delay: Duration::from_secs(retry::MAX_DELAY_SECS),
            backoff_factor: retry::BACKOFF_FACTOR,
        }
    }
}

impl RetryPolicy {
    /// Wait before retry number `retry` (1-based), capped at `max_delay`.
    ///
    /// A hint from the failure (rate limit `retry_after`) replaces the
    /// exponential base when it is longer.
    pub fn delay_for(&self, retry: u32, hint: Option<Duration>) -> Duration {
        let exponent = retry.saturating_sub(1).min(16) as i32;
        let backoff = Duration::try_from_secs_f64(
            self.base_delay.as_secs_f64() * self.backoff_factor.powi(exponent),
        )
        .unwrap_or(self.max_delay);
        let base = match hint {
            Some(hint) if hint > backoff => hint,
            _ => backoff,
        };
        std::cmp::min(base.saturating_add(random_jitter(base)), self.max_delay)
    }
}

/// Retry counter and last failure of one source unit.
///
/// Created fresh for each unit; `retry_count` only grows and never passes
/// `limit`.
#[derive(Debug, Clone)]
pub struct AttemptState {
    retry_count: u32,
    limit: u32,
    last_failure: Option<String>,
}

impl AttemptState {
    pub fn new(limit: u32) -> Self {
        Self {
            retry_count: 0,
            limit,
            last_failure: None,
        }
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Requests made so far, counting the first
    pub fn attempts(&self) -> u32 {
        self.retry_count + 1
    }

    pub fn last_failure(&self) -> Option<&str> {
        self.last_failure.as_deref()
    }

    pub fn can_retry(&self) -> bool {
        self.retry_count < self.limit
    }

    pub fn record_failure(&mut self, reason: impl Into<String>) {
        self.last_failure = Some(reason.into());
    }

    /// Count one retry. Returns false, leaving the count alone, when the
    /// limit is already reached.
    pub fn begin_retry(&mut self) -> bool {
        if !self.can_retry() {
            return false;
        }
        self.retry_count += 1;
        true
    }
}

/// Retries available to the whole process
#[derive(Debug)]
pub struct RetryBudget {
    remaining: Mutex<u32>,
}

impl RetryBudget {
    pub fn new(total: u32) -> Self {
        Self {
            remaining: Mutex::new(total),
        }
    }

    /// Take one retry from the budget
    pub fn try_acquire(&self) -> bool {
        let mut remaining = match self.remaining.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if *remaining == 0 {
            return false;
        }
        *remaining -= 1;
        true
    }

    pub fn remaining(&self) -> u32 {
        match self.remaining.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

impl Default for RetryBudget {
    fn default() -> Self {
        Self::new(retry::DEFAULT_GLOBAL_BUDGET)
    }
}

fn random_jitter(base_delay: Duration) -> Duration {
    let max_jitter_ms = (base_delay.as_millis() as u64) / 4;
    if max_jitter_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::rng().random_range(0..max_jitter_ms))
}
