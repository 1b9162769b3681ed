//! Bounded retry with a constant delay.

use std::future::Future;
use std::time::Duration;

use crate::config::{DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_DELAY};
use crate::logger::Logger;

/// How many times to try and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Values below 1 behave as 1.
    pub attempts: u32,
    /// Delay between attempts. Constant; there is no backoff.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_RETRY_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Create a policy.
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self { attempts, delay }
    }

    /// A single attempt, no retries.
    pub fn once() -> Self {
        Self {
            attempts: 1,
            delay: Duration::ZERO,
        }
    }
}

/// Runs fallible async operations under a [`RetryPolicy`].
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    policy: RetryPolicy,
    logger: Logger,
}

impl RetryExecutor {
    /// Create an executor that logs retries through `tracing` only.
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            logger: Logger::default(),
        }
    }

    pub(crate) fn with_logger(policy: RetryPolicy, logger: Logger) -> Self {
        Self { policy, logger }
    }

    /// The policy in use.
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Invoke `operation` until it succeeds or attempts run out.
    ///
    /// The error of the last attempt is returned unchanged.
    pub async fn retry<T, E, F, Fut>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut remaining = self.policy.attempts;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if remaining <= 1 => return Err(e),
                Err(_) => {
                    remaining -= 1;
                    self.logger
                        .info(&format!("Retrying... ({} attempts left)", remaining));
                    tokio::time::sleep(self.policy.delay).await;
                }
            }
        }
    }
}
