//! Common utilities for service clients
//!
//! This module provides shared functionality for HTTP-backed clients.

use std::fmt;
use std::time::Duration;

use log::debug;
use reqwest::{header, Client};

use crate::error::mapping::{classify_http_error, map_magento_error};
use crate::error::{ApiError, ErrorContext, Result, ServiceError};

/// `User-Agent` value sent to storefronts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAgent {
    /// Product token, e.g. `NS8-Protect`
    pub product: String,

    /// Product version
    pub version: String,

    /// Parenthesised comment naming this client
    pub comment: Option<String>,
}

impl Default for UserAgent {
    fn default() -> Self {
        Self {
            product: "NS8-Protect".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            comment: Some("magento-sdk".to_string()),
        }
    }
}

impl fmt::Display for UserAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.comment {
            Some(ref comment) => write!(f, "{}/{} ({})", self.product, self.version, comment),
            None => write!(f, "{}/{}", self.product, self.version),
        }
    }
}

/// HTTP client with JSON `Accept`, the given user agent and a request timeout
pub fn build_http_client(user_agent: &str, timeout: Duration) -> Result<Client> {
    let mut headers = header::HeaderMap::new();

    headers.insert(
        header::USER_AGENT,
        header::HeaderValue::from_str(user_agent)
            .map_err(|e| ServiceError::configuration(format!("Invalid user agent: {}", e)))?,
    );
    headers.insert(
        header::ACCEPT,
        header::HeaderValue::from_static("application/json"),
    );

    reqwest::Client::builder()
        .default_headers(headers)
        .timeout(timeout)
        .gzip(true)
        .build()
        .map_err(|e| ServiceError::configuration(format!("Failed to build HTTP client: {}", e)))
}

/// Turn a non-2xx response into an `ApiError`, rendering Magento's message
pub async fn parse_error_response(response: reqwest::Response, context: ErrorContext) -> ApiError {
    let status = response.status();

    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => format!("<unreadable body: {}>", e),
    };

    debug!(
        "Magento error response ({}): {}",
        classify_http_error(status),
        crate::util::truncate_string(&body, 200)
    );

    map_magento_error(status, &body, context)
}
