//! Client builder implementation
//!
//! Assembles a `MagentoClient` from a merchant context (or explicit
//! credentials and base URL) plus optional overrides. Building never
//! touches the network; the only error it can produce is
//! `ServiceError::Configuration`.

use std::sync::Arc;
use std::time::Duration;

use log::debug;
use tokio_util::sync::CancellationToken;

use crate::config::{MagentoConfig, ServiceConfig};
use crate::error::{Result, ServiceError};
use crate::reporting::ErrorReporter;
use crate::resilience::RetryPolicy;
use crate::services::magento::MagentoClient;
use crate::session::{Credentials, MerchantContext};
use crate::transport::{HttpTransport, Transport};

/// Builder for `MagentoClient`
#[derive(Default)]
pub struct ClientBuilder {
    /// REST base URL, overriding the one derived from the merchant
    base_url: Option<String>,

    /// Merchant whose Magento integration supplies credentials and storefront
    merchant: Option<MerchantContext>,

    /// Explicit credentials, overriding the merchant's integration
    credentials: Option<Credentials>,

    /// Tunables; defaults when unset
    config: Option<MagentoConfig>,

    /// Retry policy, overriding the one derived from `config`
    retry_policy: Option<RetryPolicy>,

    /// Error sink
    reporter: Option<Arc<dyn ErrorReporter>>,

    /// Cancellation token shared by every operation of the client
    cancellation: Option<CancellationToken>,

    /// Request timeout
    timeout: Option<Duration>,

    /// User agent
    user_agent: Option<String>,
}

impl ClientBuilder {
    /// Create a new client builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive credentials and storefront from a merchant
    pub fn merchant(mut self, merchant: MerchantContext) -> Self {
        self.merchant = Some(merchant);
        self
    }

    /// Set the REST base URL, e.g. `https://shop.example.com/index.php/rest`
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Use explicit credentials
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Use explicit tunables
    pub fn config(mut self, config: MagentoConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Configure retry behavior
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    /// Set the error reporter
    pub fn reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Attach a cancellation token
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Set request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Build a client over HTTP
    ///
    /// Credentials are resolved first, so a merchant without a Magento
    /// integration fails here before anything else is looked at.
    pub fn build(self) -> Result<MagentoClient<HttpTransport>> {
        let credentials = self.resolve_credentials()?;

        let mut config = self.config.clone().unwrap_or_default();
        if let Some(timeout) = self.timeout {
            config.timeout = timeout;
        }
        if let Some(ref user_agent) = self.user_agent {
            config.user_agent = user_agent.clone();
        }
        config.validate()?;

        let base_url = self.resolve_base_url(&config)?;
        debug!("Building Magento client for {}", base_url);

        let transport = HttpTransport::new(&base_url, credentials, &config)?;
        let policy = self.retry_policy.unwrap_or_else(|| config.retry_policy());
        Ok(self.finish(transport, policy))
    }

    /// Build a client over a caller-supplied transport
    ///
    /// Merchant credentials are still resolved so that a merchant without
    /// a Magento integration is rejected the same way as with `build`.
    pub fn build_with_transport<T: Transport>(self, transport: T) -> Result<MagentoClient<T>> {
        if self.merchant.is_some() || self.credentials.is_some() {
            self.resolve_credentials()?;
        }

        let policy = self
            .retry_policy
            .or_else(|| self.config.as_ref().map(MagentoConfig::retry_policy))
            .unwrap_or_default();
        Ok(self.finish(transport, policy))
    }

    fn finish<T: Transport>(self, transport: T, policy: RetryPolicy) -> MagentoClient<T> {
        let mut client = MagentoClient::with_transport(transport).with_retry_policy(policy);

        if let Some(reporter) = self.reporter {
            client = client.with_reporter(reporter);
        }
        if let Some(token) = self.cancellation {
            client = client.with_cancellation(token);
        }

        client
    }

    fn resolve_credentials(&self) -> Result<Credentials> {
        if let Some(ref credentials) = self.credentials {
            credentials.validate()?;
            return Ok(credentials.clone());
        }

        match self.merchant {
            Some(ref merchant) => merchant.magento_credentials(),
            None => Err(ServiceError::configuration(
                "A merchant context or explicit credentials are required",
            )),
        }
    }

    fn resolve_base_url(&self, config: &MagentoConfig) -> Result<String> {
        if let Some(ref base_url) = self.base_url {
            return Ok(base_url.trim_end_matches('/').to_string());
        }

        let storefront = self
            .merchant
            .as_ref()
            .map(|merchant| merchant.storefront_url.trim())
            .filter(|url| !url.is_empty())
            .ok_or_else(|| ServiceError::configuration("Merchant has no storefront URL"))?;

        Ok(format!(
            "{}/{}",
            storefront.trim_end_matches('/'),
            config.rest_path.trim_matches('/')
        ))
    }
}
