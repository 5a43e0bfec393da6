//! reqwest-backed transport with OAuth1 signing

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::{header, Client};
use serde_json::Value;
use url::Url;

use super::{ApiRequest, OAuthSigner, Transport};
use crate::config::MagentoConfig;
use crate::error::{ApiError, ErrorContext, Result, ServiceError};
use crate::services::common::{build_http_client, parse_error_response};
use crate::session::Credentials;
use crate::util::{generate_request_id, measure_time_async};

/// Transport that talks to a Magento REST base URL over HTTP
#[derive(Debug, Clone)]
pub struct HttpTransport {
    /// HTTP client
    http_client: Client,

    /// REST base, e.g. `https://shop.example.com/index.php/rest`
    base_url: Url,

    /// Request signer, shared read-only across concurrent calls
    signer: Arc<OAuthSigner>,

    /// Per-request timeout the client was built with
    timeout: Duration,
}

impl HttpTransport {
    /// Create a transport; performs no network I/O
    pub fn new(base_url: &str, credentials: Credentials, config: &MagentoConfig) -> Result<Self> {
        let base_url = parse_base_url(base_url)?;
        let http_client = build_http_client(&config.user_agent, config.timeout)?;

        Ok(Self {
            http_client,
            base_url,
            signer: Arc::new(OAuthSigner::new(credentials)),
            timeout: config.timeout,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The REST base URL
    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    fn endpoint_url(&self, path: &str) -> std::result::Result<Url, ApiError> {
        let raw = format!("{}/{}", self.base_url(), path.trim_start_matches('/'));
        Url::parse(&raw).map_err(|e| ApiError::transport(format!("Invalid endpoint URL {}: {}", raw, e)))
    }
}

/// Validate a REST base URL
pub(crate) fn parse_base_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw)
        .map_err(|e| ServiceError::configuration(format!("Invalid Magento base URL {}: {}", raw, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ServiceError::configuration(format!(
            "Unsupported scheme {} in Magento base URL",
            other
        ))),
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &ApiRequest) -> std::result::Result<Value, ApiError> {
        let url = self.endpoint_url(&request.path)?;
        let request_id = generate_request_id();
        let context = ErrorContext::for_service("magento")
            .method(request.method.as_str())
            .endpoint(request.path.clone())
            .request_id(request_id.clone());

        let authorization =
            self.signer
                .authorization_header(request.method.as_str(), url.as_str(), &request.query);

        let mut builder = self
            .http_client
            .request(request.method.clone(), url)
            .header(header::AUTHORIZATION, authorization)
            .header("X-Request-Id", request_id.as_str());

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        debug!("Sending request to Magento: {} {}", request.method, request.path);

        let (result, elapsed) = measure_time_async(|| builder.send()).await;
        let response = result.map_err(|e| ApiError::from(e).with_context(context.clone()))?;
        let status = response.status();

        debug!(
            "Magento responded {} to {} {} in {:?}",
            status, request.method, request.path, elapsed
        );

        if !status.is_success() {
            return Err(parse_error_response(response, context).await);
        }

        let body = response
            .text()
            .await
            .map_err(|e| ApiError::from(e).with_context(context.clone()))?;

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&body).map_err(|e| {
            ApiError::decode(format!("Response decode error: {}", e))
                .with_context(context.with("status", status.as_u16()))
                .with_cause(e)
        })
    }
}
