//! Resilience patterns for the Magento client
//!
//! A single pattern lives here: a bounded retry loop that waits a fixed
//! interval when Magento answers 404, driven by `RetryPolicy` and run by
//! `RetryExecutor`.

mod retry;

pub use retry::{
    AttemptState, RetryExecutor, RetryPolicy, RetryState, TransitionObserver, DEFAULT_MAX_RETRY,
    DEFAULT_WAIT_MS,
};
