//! Error handling for the Magento SDK
//!
//! This module provides the error taxonomy shared by every layer:
//! - `ServiceError::Configuration` for deployment defects found at construction
//! - `ApiError` for a single failed exchange with the Magento REST API
//! - terminal outcomes of a retry chain (`Exhausted`, `Cancelled`)
//!
//! Only `Configuration` is ever surfaced by client construction. Everything
//! produced while an operation runs is converted into a sentinel by
//! `MagentoClient` and handed to an `ErrorReporter`.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;

pub mod mapping;

/// Result type for Magento SDK operations
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Main error type for the Magento SDK
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Missing or invalid integration record, bad base URL, bad headers
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A single failed request/response exchange
    #[error(transparent)]
    Api(ApiError),

    /// The retry budget was consumed; carries the last error seen
    #[error("Retries exhausted after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: ApiError },

    /// The caller cancelled the operation while it was running
    #[error("Operation cancelled after {attempts} attempts")]
    Cancelled { attempts: u32 },

    /// Magento answered 2xx but its body declined the action (`false`)
    #[error("Magento declined the request: {0}")]
    Declined(String),

    /// A successful response whose body could not be decoded
    #[error("Parsing error: {0}")]
    Parsing(String),

    /// Caller input rejected before any request was issued
    #[error("Validation error: {0}")]
    Validation(String),
}

impl ServiceError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        ServiceError::Configuration(message.into())
    }

    /// Create a parsing error
    pub fn parsing(message: impl Into<String>) -> Self {
        ServiceError::Parsing(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation(message.into())
    }

    /// Get the HTTP status code of the underlying API error, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ServiceError::Api(err) => err.status_code,
            ServiceError::Exhausted { last, .. } => last.status_code,
            _ => None,
        }
    }

    /// The API error behind this failure, if it came from the transport
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            ServiceError::Api(err) => Some(err),
            ServiceError::Exhausted { last, .. } => Some(last),
            _ => None,
        }
    }

    /// Check whether this is a configuration defect
    pub fn is_configuration(&self) -> bool {
        matches!(self, ServiceError::Configuration(_))
    }
}

/// What went wrong in a single exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Magento answered with a non-2xx status
    Status,

    /// No response arrived (connect, timeout, redirect loop, unreadable body)
    Transport,

    /// A 2xx response whose body is not JSON
    Decode,
}

/// A failed exchange with the remote API
///
/// `status_code` is only set for `FailureKind::Status`.
#[derive(Error, Debug)]
#[error("[{}] {message}", failure_label(.kind, .status_code))]
pub struct ApiError {
    /// Failure class
    pub kind: FailureKind,

    /// HTTP status code of a non-2xx response
    pub status_code: Option<u16>,

    /// Human readable message, already rendered from the response body
    pub message: String,

    /// Request context for diagnostics
    pub context: ErrorContext,

    /// Underlying fault, opaque to callers
    #[source]
    pub cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

fn failure_label(kind: &FailureKind, status_code: &Option<u16>) -> String {
    match (kind, status_code) {
        (FailureKind::Status, Some(code)) => format!("HTTP {}", code),
        (FailureKind::Decode, _) => "decode".to_string(),
        _ => "transport".to_string(),
    }
}

impl ApiError {
    fn new(kind: FailureKind, status_code: Option<u16>, message: String) -> Self {
        Self {
            kind,
            status_code,
            message,
            context: ErrorContext::for_service("magento"),
            cause: None,
        }
    }

    /// Create an error for a response with the given status
    pub fn from_status(status_code: u16, message: impl Into<String>) -> Self {
        Self::new(FailureKind::Status, Some(status_code), message.into())
    }

    /// Create an error for a fault where no response was received
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Transport, None, message.into())
    }

    /// Create an error for a successful response whose body does not decode
    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Decode, None, message.into())
    }

    /// Terminal error for a failure the retry loop does not retry
    pub fn into_service_error(self) -> ServiceError {
        match self.kind {
            FailureKind::Decode => ServiceError::parsing(match self.context.endpoint {
                Some(ref endpoint) => format!("{} ({})", self.message, endpoint),
                None => self.message,
            }),
            _ => ServiceError::Api(self),
        }
    }

    /// Replace the request context
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = context;
        self
    }

    /// Attach the underlying fault
    pub fn with_cause(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// 404, which Magento returns while a freshly placed entity is not yet visible
    pub fn is_not_found(&self) -> bool {
        self.status_code == Some(404)
    }
}

impl From<ApiError> for ServiceError {
    fn from(err: ApiError) -> Self {
        err.into_service_error()
    }
}

/// Where and when a failed exchange happened
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// Upstream system, `magento` for every error this crate builds
    pub service: String,

    /// When the context was captured
    pub occurred_at: DateTime<Utc>,

    /// HTTP method of the failed request
    pub method: Option<String>,

    /// REST path below the base URL, e.g. `V1/orders/42`
    pub endpoint: Option<String>,

    /// Value sent as `X-Request-Id`
    pub request_id: Option<String>,

    /// Free-form diagnostics, ordered for stable log output
    pub data: BTreeMap<String, String>,
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::for_service("magento")
    }
}

impl ErrorContext {
    /// Context for the Magento service
    pub fn new() -> Self {
        Self::default()
    }

    /// Context attributed to `service`
    pub fn for_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            occurred_at: Utc::now(),
            method: None,
            endpoint: None,
            request_id: None,
            data: BTreeMap::new(),
        }
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Record a diagnostic value in place
    pub fn add(&mut self, key: impl Into<String>, value: impl fmt::Display) {
        self.data.insert(key.into(), value.to_string());
    }

    /// Record a diagnostic value, builder style
    pub fn with(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.add(key, value);
        self
    }
}

/// Classify a reqwest failure; keeps the status when a response arrived
impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            format!("Request timed out: {}", err)
        } else if err.is_connect() {
            format!("Connection error: {}", err)
        } else if err.is_redirect() {
            format!("Too many redirects: {}", err)
        } else if err.is_decode() {
            format!("Response decode error: {}", err)
        } else {
            format!("HTTP client error: {}", err)
        };

        let api_error = match err.status() {
            Some(status) => ApiError::from_status(status.as_u16(), message),
            None => ApiError::transport(message),
        };

        api_error.with_cause(err)
    }
}

/// A 2xx body that does not match the expected shape
impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::parsing(format!("Unexpected Magento payload: {}", err))
    }
}
