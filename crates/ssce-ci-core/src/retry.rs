//! Retry with uniformly random jitter.
//!
//! Every failure is treated the same way: log it, sleep for a random whole
//! number of seconds within the policy's range, and run the operation again
//! from scratch. There is no exponential growth and no distinction between
//! permanent and transient failures.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{info, warn};

use crate::error::{CiError, Result, TransportError};

/// How often and how patiently to retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: Option<u32>,
    min_delay: Duration,
    max_delay: Duration,
}

impl Default for RetryPolicy {
    /// Unbounded attempts, 1 to 8 seconds between them.
    fn default() -> Self {
        Self {
            max_attempts: None,
            min_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// Retry until the operation succeeds.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Give up after `max_attempts` attempts (at least one).
    pub fn bounded(max_attempts: u32) -> Self {
        Self {
            max_attempts: Some(max_attempts.max(1)),
            ..Self::default()
        }
    }

    /// Replace the jitter range. Bounds are truncated to whole seconds and
    /// swapped if given in the wrong order.
    pub fn with_delay_range(mut self, min: Duration, max: Duration) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        self.min_delay = Duration::from_secs(min.as_secs());
        self.max_delay = Duration::from_secs(max.as_secs());
        self
    }

    pub fn max_attempts(&self) -> Option<u32> {
        self.max_attempts
    }

    pub fn is_unbounded(&self) -> bool {
        self.max_attempts.is_none()
    }

    pub fn delay_range(&self) -> (Duration, Duration) {
        (self.min_delay, self.max_delay)
    }

    /// Pick the pause before the next attempt.
    pub fn next_delay(&self) -> Duration {
        let secs = rand::thread_rng().gen_range(self.min_delay.as_secs()..=self.max_delay.as_secs());
        Duration::from_secs(secs)
    }

    fn exhausted(&self, attempts: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempts >= max)
    }
}

/// Run `op` until it succeeds or the policy gives up.
///
/// `op` receives the 1-based attempt number. On success returns the value
/// together with the number of attempts it took.
pub async fn retry<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<(T, u32)>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = std::result::Result<T, TransportError>>,
{
    let mut attempt: u32 = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok((value, attempt)),
            Err(err) => {
                warn!(attempt, error = %err, "Attempt failed");
                if policy.exhausted(attempt) {
                    return Err(CiError::RetriesExhausted {
                        attempts: attempt,
                        last_error: err,
                    });
                }
                let delay = policy.next_delay();
                info!("Trying again in {} seconds...", delay.as_secs());
                tokio::time::sleep(delay).await;
                attempt = attempt.saturating_add(1);
            }
        }
    }
}
