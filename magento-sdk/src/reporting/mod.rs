//! Error sinks for terminal operation failures
//!
//! `MagentoClient` hands every failure it converts into a sentinel to an
//! `ErrorReporter`. Reporters must not panic and must return promptly.

use chrono::{DateTime, Utc};
use log::error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::ServiceError;
use crate::util::sanitize_for_logging;

/// Structured error sink
#[cfg_attr(test, mockall::automock)]
pub trait ErrorReporter: Send + Sync {
    /// Record a terminal failure; must never panic or block
    fn report(&self, message: &str, cause: &ServiceError);
}

/// Reporter that writes through the `log` facade
#[derive(Debug, Clone, Default)]
pub struct LogReporter;

impl ErrorReporter for LogReporter {
    fn report(&self, message: &str, cause: &ServiceError) {
        error!("{}: {}", message, sanitize_for_logging(&cause.to_string()));
    }
}

/// A buffered report, detached from the error that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReport {
    pub message: String,
    pub cause: String,
    pub status_code: Option<u16>,
    pub reported_at: DateTime<Utc>,
}

/// Fire-and-forget reporter backed by an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelReporter {
    sender: mpsc::UnboundedSender<ErrorReport>,
}

impl ChannelReporter {
    /// Create a reporter and the receiving end of its buffer
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ErrorReport>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Create a reporter whose buffer is drained into the log by a background task
    pub fn spawn_log_drain() -> (Self, JoinHandle<()>) {
        let (reporter, mut receiver) = Self::new();
        let handle = tokio::spawn(async move {
            while let Some(report) = receiver.recv().await {
                error!(
                    "{}: {} (reported at {})",
                    report.message, report.cause, report.reported_at
                );
            }
        });
        (reporter, handle)
    }
}

impl ErrorReporter for ChannelReporter {
    fn report(&self, message: &str, cause: &ServiceError) {
        let report = ErrorReport {
            message: message.to_string(),
            cause: sanitize_for_logging(&cause.to_string()),
            status_code: cause.status_code(),
            reported_at: Utc::now(),
        };

        // A dropped receiver means nobody is listening any more
        let _ = self.sender.send(report);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;

    #[tokio::test]
    async fn test_channel_reporter_buffers_reports() {
        let (reporter, mut receiver) = ChannelReporter::new();

        reporter.report(
            "Failed to hold order 99",
            &ServiceError::Api(ApiError::from_status(500, "boom")),
        );

        let report = receiver.recv().await.expect("report should be buffered");
        assert_eq!(report.message, "Failed to hold order 99");
        assert_eq!(report.status_code, Some(500));
        assert!(report.cause.contains("boom"));
    }

    #[test]
    fn test_channel_reporter_ignores_closed_receiver() {
        let (reporter, receiver) = ChannelReporter::new();
        drop(receiver);

        reporter.report("Failed to get order 1", &ServiceError::validation("bad id"));
    }

    #[test]
    fn test_log_reporter_does_not_panic() {
        LogReporter.report(
            "Failed to get customer 7",
            &ServiceError::configuration("secret=hunter2"),
        );
    }
}
