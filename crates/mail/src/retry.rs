//! Bounded retry with exponential backoff
//!
//! Every remote call made while purging goes through [`RetryExecutor`].
//! Transient failures are retried up to the policy's ceiling; once that is
//! exhausted (or on a fatal error) the caller gets a [`RetryFailure`] value
//! and decides whether to skip, log or continue. Nothing here panics or
//! propagates past the scan loop.

use log::{debug, warn};
use std::sync::Arc;

use crate::clock::Clock;
use crate::config::RetryPolicy;
use crate::session::{FailureKind, SessionError};

/// Outcome of a call that did not succeed within the retry budget
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{operation} failed after {attempts} attempt(s): {message}")]
pub struct RetryFailure {
    pub operation: String,
    pub kind: FailureKind,
    pub attempts: u32,
    /// Display form of the last error seen
    pub message: String,
}

impl RetryFailure {
    fn new(operation: &str, error: &SessionError, attempts: u32) -> Self {
        Self {
            operation: operation.to_string(),
            kind: error.kind(),
            attempts,
            message: error.to_string(),
        }
    }
}

/// Runs single remote operations under a [`RetryPolicy`]
#[derive(Clone)]
pub struct RetryExecutor {
    policy: RetryPolicy,
    clock: Arc<dyn Clock>,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy, clock: Arc<dyn Clock>) -> Self {
        Self { policy, clock }
    }

    /// Run `call`, retrying transient failures with backoff.
    ///
    /// Makes at most `max_retries + 1` attempts. Fatal errors return
    /// immediately without sleeping.
    pub fn run<T>(
        &self,
        operation: &str,
        mut call: impl FnMut() -> Result<T, SessionError>,
    ) -> Result<T, RetryFailure> {
        let mut attempt = 0;
        loop {
            match call() {
                Ok(value) => {
                    if attempt > 0 {
                        debug!("{} succeeded on attempt {}", operation, attempt + 1);
                    }
                    return Ok(value);
                }
                Err(e) if !e.is_transient() => {
                    warn!("{} failed (not retryable): {}", operation, e);
                    return Err(RetryFailure::new(operation, &e, attempt + 1));
                }
                Err(e) if attempt >= self.policy.max_retries => {
                    warn!(
                        "{} failed after {} attempts: {}",
                        operation,
                        attempt + 1,
                        e
                    );
                    return Err(RetryFailure::new(operation, &e, attempt + 1));
                }
                Err(e) => {
                    let delay = self.policy.delay_for(attempt);
                    warn!(
                        "{} attempt {}/{} failed: {}; retrying in {:?}",
                        operation,
                        attempt + 1,
                        self.policy.max_retries + 1,
                        e,
                        delay
                    );
                    self.clock.sleep(delay);
                    attempt += 1;
                }
            }
        }
    }

    /// Run `call` exactly once, with no backoff
    pub fn once<T>(
        &self,
        operation: &str,
        call: impl FnOnce() -> Result<T, SessionError>,
    ) -> Result<T, RetryFailure> {
        call().map_err(|e| RetryFailure::new(operation, &e, 1))
    }

    /// Longer pause after a unit of work failed for good
    pub fn cool_down(&self) {
        self.clock.sleep(self.policy.failure_cooldown());
    }
}
