// src/ingest/retry.rs
//! Linear retry policy: retry while `retries_done < max_retries`, waiting
//! `base_delay * retry` before the n-th retry. No jitter, no circuit breaker;
//! every `fetch_one` call starts again from zero.

use std::time::Duration;

use crate::ingest::types::SourceDescriptor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    pub fn for_source(d: &SourceDescriptor) -> Self {
        Self::new(d.retry_count, Duration::from_millis(d.retry_base_delay_millis))
    }

    pub fn should_retry(&self, retries_done: u32) -> bool {
        should_retry(retries_done, self.max_retries)
    }

    pub fn delay_for(&self, retry: u32) -> Duration {
        delay_for(retry, self.base_delay)
    }

    /// Total attempts a source gets, first try included.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

pub fn should_retry(retries_done: u32, max_retries: u32) -> bool {
    retries_done < max_retries
}

/// `retry` is 1-based: the first retry waits one base delay.
pub fn delay_for(retry: u32, base_delay: Duration) -> Duration {
    base_delay.saturating_mul(retry)
}
