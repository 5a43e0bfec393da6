//! Retry on not-found for freshly created Magento entities
//!
//! Magento answers 404 for orders, customers and transactions for a short
//! while after they are placed. Only that status is retried, with a fixed
//! wait between attempts. Every other failure is terminal for the call.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use tokio_util::sync::CancellationToken;

use crate::error::{ApiError, Result, ServiceError};

/// Default number of retries after the first attempt
pub const DEFAULT_MAX_RETRY: u32 = 5;

/// Default wait between attempts, in milliseconds
pub const DEFAULT_WAIT_MS: u64 = 2000;

/// Retry policy configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first attempt (0 means no retries)
    pub max_retry: u32,

    /// Fixed wait before each retry
    pub wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retry: DEFAULT_MAX_RETRY,
            wait: Duration::from_millis(DEFAULT_WAIT_MS),
        }
    }
}

impl fmt::Display for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RetryPolicy {{ max_retry: {}, wait: {:?} }}", self.max_retry, self.wait)
    }
}

impl RetryPolicy {
    /// Create a policy from the `maxRetry` / `waitMs` pair
    pub fn new(max_retry: u32, wait_ms: u64) -> Self {
        Self {
            max_retry,
            wait: Duration::from_millis(wait_ms),
        }
    }

    /// A policy that never retries
    pub fn no_retry() -> Self {
        Self {
            max_retry: 0,
            wait: Duration::ZERO,
        }
    }

    /// Fresh state for a new logical operation
    pub fn initial_state(&self) -> RetryState {
        RetryState {
            attempts: 0,
            max_retry: self.max_retry,
            wait_ms: self.wait.as_millis() as u64,
        }
    }

    /// Retry only on 404 while the budget in `state` allows it
    pub fn should_retry(&self, error: &ApiError, state: &RetryState) -> bool {
        error.is_not_found() && state.attempts < state.max_retry
    }

    /// State for the next attempt
    pub fn next_state(&self, state: RetryState) -> RetryState {
        RetryState {
            attempts: state.attempts + 1,
            ..state
        }
    }

    /// Wait before the attempt following `state`
    pub fn delay_for(&self, state: &RetryState) -> Duration {
        Duration::from_millis(state.wait_ms)
    }
}

/// Per-operation retry bookkeeping; never shared between calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryState {
    /// Retries performed so far
    pub attempts: u32,

    /// Retry budget
    pub max_retry: u32,

    /// Wait between attempts in milliseconds
    pub wait_ms: u64,
}

/// Observable phases of one logical operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptState {
    /// Operation created, nothing sent yet
    Init,

    /// A request is in flight
    Attempting { attempts: u32 },

    /// Waiting before the next attempt
    RetryWait { attempts: u32, delay: Duration },

    /// Terminal: value returned
    Success { attempts: u32 },

    /// Terminal: error returned
    Failed { attempts: u32 },
}

/// Callback invoked on every state transition
pub type TransitionObserver = Arc<dyn Fn(&AttemptState) + Send + Sync>;

/// Executor for retry operations with a fixed wait
#[derive(Clone)]
pub struct RetryExecutor {
    /// Retry configuration
    policy: RetryPolicy,

    /// Optional transition hook
    observer: Option<TransitionObserver>,
}

impl fmt::Debug for RetryExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryExecutor")
            .field("policy", &self.policy)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

impl RetryExecutor {
    /// Create a new retry executor with the specified policy
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            observer: None,
        }
    }

    /// Attach a transition observer
    pub fn with_observer(mut self, observer: TransitionObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Get the current retry policy
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    fn transition(&self, state: AttemptState) {
        debug!("retry state: {:?}", state);
        if let Some(ref observer) = self.observer {
            observer(&state);
        }
    }

    /// Run `operation` until it succeeds, fails terminally, or the budget is spent
    ///
    /// The closure receives the current `RetryState`. A cancelled token
    /// interrupts both the in-flight attempt and the wait.
    pub async fn execute<F, Fut, T>(
        &self,
        mut operation: F,
        cancel: Option<&CancellationToken>,
    ) -> Result<T>
    where
        F: FnMut(RetryState) -> Fut,
        Fut: Future<Output = std::result::Result<T, ApiError>>,
    {
        let mut state = self.policy.initial_state();
        self.transition(AttemptState::Init);

        loop {
            self.transition(AttemptState::Attempting {
                attempts: state.attempts,
            });

            let outcome = match cancel {
                Some(token) => tokio::select! {
                    biased;
                    _ = token.cancelled() => None,
                    result = operation(state) => Some(result),
                },
                None => Some(operation(state).await),
            };

            let err = match outcome {
                Some(Ok(value)) => {
                    self.transition(AttemptState::Success {
                        attempts: state.attempts,
                    });
                    return Ok(value);
                }
                Some(Err(err)) => err,
                None => return Err(self.cancelled(state)),
            };

            if !self.policy.should_retry(&err, &state) {
                self.transition(AttemptState::Failed {
                    attempts: state.attempts,
                });
                return Err(if err.is_not_found() {
                    let mut last = err;
                    last.context.add("retries", state.attempts);
                    ServiceError::Exhausted {
                        attempts: state.attempts,
                        last,
                    }
                } else {
                    err.into_service_error()
                });
            }

            let delay = self.policy.delay_for(&state);
            warn!(
                "Resource not found yet, retrying in {:?} (attempt {}/{}): {}",
                delay,
                state.attempts + 1,
                state.max_retry,
                err
            );
            self.transition(AttemptState::RetryWait {
                attempts: state.attempts,
                delay,
            });

            match cancel {
                Some(token) => {
                    tokio::select! {
                        biased;
                        _ = token.cancelled() => return Err(self.cancelled(state)),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                None => tokio::time::sleep(delay).await,
            }

            state = self.policy.next_state(state);
        }
    }

    fn cancelled(&self, state: RetryState) -> ServiceError {
        self.transition(AttemptState::Failed {
            attempts: state.attempts,
        });
        ServiceError::Cancelled {
            attempts: state.attempts,
        }
    }
}
