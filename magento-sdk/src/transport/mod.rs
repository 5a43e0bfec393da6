//! Transport layer
//!
//! A `Transport` performs exactly one request/response exchange and never
//! retries. Failures come back as `ApiError` carrying the HTTP status.

mod http;
pub mod oauth;

pub use http::HttpTransport;
pub use oauth::OAuthSigner;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;

use crate::error::ApiError;

/// A single REST call relative to the API base URL
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// HTTP method
    pub method: Method,

    /// Path below the REST base, e.g. `V1/orders/42`
    pub path: String,

    /// Query parameters, unencoded
    pub query: Vec<(String, String)>,
}

impl ApiRequest {
    /// A GET request
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            query: Vec::new(),
        }
    }

    /// A bodiless POST, as used by the order action endpoints
    pub fn post(path: impl Into<String>) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            query: Vec::new(),
        }
    }

    /// Add a query parameter
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }
}

/// One network exchange with the remote API
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the request and return the decoded JSON body
    ///
    /// An empty 2xx body decodes to `Value::Null`.
    async fn send(&self, request: &ApiRequest) -> Result<Value, ApiError>;
}
