//! Configuration management for the Magento client
//!
//! Tunables (REST path, timeout, retry budget) come from a `ConfigProvider`,
//! by default the process environment under `NS8_MAGENTO_*`. Credentials are
//! never read from here; they come from the merchant's service integration.

use std::collections::HashMap;
use std::env;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ServiceError};
use crate::resilience::{RetryPolicy, DEFAULT_MAX_RETRY, DEFAULT_WAIT_MS};
use crate::util::parse_duration;

/// Source of raw string settings
pub trait ConfigProvider: Send + Sync {
    /// Look up `key`; a missing key is a configuration error
    fn get_string(&self, key: &str) -> Result<String>;
}

/// Typed accessors layered over `ConfigProvider::get_string`
pub trait ConfigProviderExt: ConfigProvider {
    /// Read `key` as a signed integer
    fn get_int(&self, key: &str) -> Result<i64> {
        let raw = self.get_string(key)?;
        raw.trim().parse::<i64>().map_err(|e| {
            ServiceError::configuration(format!("Setting {} is not an integer ({}): {}", key, raw, e))
        })
    }

    /// Read `key` as a duration ("2000ms", "2s", bare milliseconds)
    fn get_duration(&self, key: &str) -> Result<Duration> {
        let raw = self.get_string(key)?;
        parse_duration(&raw).ok_or_else(|| {
            ServiceError::configuration(format!("Setting {} is not a duration: {}", key, raw))
        })
    }

    /// Read `key`, falling back to `default` when absent
    fn get_string_or(&self, key: &str, default: &str) -> String {
        self.get_string(key).unwrap_or_else(|_| default.to_owned())
    }

    /// Whether `key` is set at all
    fn contains(&self, key: &str) -> bool {
        self.get_string(key).is_ok()
    }

    /// Read `key` as a non-negative count; absent means `default`, malformed is an error
    fn get_u32_or(&self, key: &str, default: u32) -> Result<u32> {
        if !self.contains(key) {
            return Ok(default);
        }

        let value = self.get_int(key)?;
        u32::try_from(value).map_err(|_| {
            ServiceError::configuration(format!("Setting {} is out of range: {}", key, value))
        })
    }

    /// Read `key` as a duration; absent means `default`, malformed is an error
    fn get_duration_or(&self, key: &str, default: Duration) -> Result<Duration> {
        if self.contains(key) {
            self.get_duration(key)
        } else {
            Ok(default)
        }
    }
}

impl<T: ConfigProvider + ?Sized> ConfigProviderExt for T {}

/// Reads settings from `PREFIX_NAMESPACE_KEY` environment variables
#[derive(Debug, Clone, Default)]
pub struct EnvConfigProvider {
    /// Leading segment, e.g. `NS8`
    prefix: Option<String>,

    /// Second segment, e.g. `MAGENTO`
    namespace: Option<String>,
}

impl EnvConfigProvider {
    /// Provider with no prefix or namespace
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the leading variable segment
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Set the second variable segment
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// `max-retry` under `NS8`/`MAGENTO` becomes `NS8_MAGENTO_MAX_RETRY`
    fn format_key(&self, key: &str) -> String {
        let key = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
            .collect::<String>();

        self.prefix
            .iter()
            .chain(self.namespace.iter())
            .map(String::as_str)
            .chain(std::iter::once(key.as_str()))
            .collect::<Vec<_>>()
            .join("_")
    }
}

impl ConfigProvider for EnvConfigProvider {
    fn get_string(&self, key: &str) -> Result<String> {
        let var = self.format_key(key);

        env::var(&var).map_err(|e| match e {
            env::VarError::NotPresent => ServiceError::configuration(format!("{} is not set", var)),
            env::VarError::NotUnicode(_) => {
                ServiceError::configuration(format!("{} is not valid unicode", var))
            }
        })
    }
}

/// Fixed settings held in memory, for tests and embedding callers
#[derive(Debug, Clone, Default)]
pub struct MemoryConfigProvider {
    settings: HashMap<String, String>,
}

impl MemoryConfigProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under `key`, replacing any previous value
    pub fn set(&mut self, key: impl Into<String>, value: impl ToString) {
        self.settings.insert(key.into(), value.to_string());
    }
}

impl ConfigProvider for MemoryConfigProvider {
    fn get_string(&self, key: &str) -> Result<String> {
        match self.settings.get(key) {
            Some(value) => Ok(value.clone()),
            None => Err(ServiceError::configuration(format!("Setting {} is not defined", key))),
        }
    }
}

/// Process-wide provider reading `NS8_MAGENTO_*`
pub static DEFAULT_PROVIDER: Lazy<Arc<EnvConfigProvider>> = Lazy::new(|| {
    Arc::new(
        EnvConfigProvider::new()
            .with_prefix("NS8")
            .with_namespace("MAGENTO"),
    )
});

/// Trait for service-specific configuration
pub trait ServiceConfig: Debug + Send + Sync {
    /// Validate this configuration
    fn validate(&self) -> Result<()>;

    /// Service name
    fn service_name(&self) -> &str;
}

/// Default REST entry point relative to the storefront URL
pub const DEFAULT_REST_PATH: &str = "index.php/rest";

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Tunables for the Magento REST client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MagentoConfig {
    /// REST entry point appended to the storefront URL
    pub rest_path: String,

    /// Per-request timeout
    pub timeout: Duration,

    /// Retry budget for 404 responses
    pub max_retry: u32,

    /// Wait between retries in milliseconds
    pub wait_ms: u64,

    /// User agent sent with every request
    pub user_agent: String,
}

impl Default for MagentoConfig {
    fn default() -> Self {
        Self {
            rest_path: DEFAULT_REST_PATH.to_string(),
            timeout: DEFAULT_TIMEOUT,
            max_retry: DEFAULT_MAX_RETRY,
            wait_ms: DEFAULT_WAIT_MS,
            user_agent: crate::services::UserAgent::default().to_string(),
        }
    }
}

impl MagentoConfig {
    /// Load configuration from a provider
    ///
    /// Unset keys take their default; a key that is set but malformed or
    /// negative is a configuration error.
    pub fn from_provider<P: ConfigProvider + ?Sized>(provider: &P) -> Result<Self> {
        let defaults = Self::default();

        let wait = provider.get_duration_or("retry_wait", Duration::from_millis(defaults.wait_ms))?;

        let config = Self {
            rest_path: provider.get_string_or("rest_path", &defaults.rest_path),
            timeout: provider.get_duration_or("timeout", defaults.timeout)?,
            max_retry: provider.get_u32_or("max_retry", defaults.max_retry)?,
            wait_ms: wait.as_millis() as u64,
            user_agent: provider.get_string_or("user_agent", &defaults.user_agent),
        };

        config.validate()?;
        Ok(config)
    }

    /// Retry policy described by this configuration
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retry, self.wait_ms)
    }
}

impl ServiceConfig for MagentoConfig {
    fn validate(&self) -> Result<()> {
        if self.rest_path.trim_matches('/').is_empty() {
            return Err(ServiceError::configuration("Magento REST path is required"));
        }

        if self.timeout.is_zero() {
            return Err(ServiceError::configuration("Magento timeout must be positive"));
        }

        Ok(())
    }

    fn service_name(&self) -> &str {
        "magento"
    }
}
