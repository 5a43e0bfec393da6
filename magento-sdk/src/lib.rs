//! # Magento SDK
//!
//! A resilient Magento 2 REST client for NS8 Protect workflow steps.
//!
//! This crate provides:
//!
//! - OAuth1-signed transport over the Magento REST API
//! - A fixed-wait retry loop for 404s on freshly created entities
//! - Order, customer and transaction operations that never raise
//! - Merchant credential resolution and configuration management
//!
//! ## Architecture
//!
//! - `MagentoClient`: order/customer/transaction operations
//! - `Transport`: signs and sends one request, maps failures to `ApiError`
//! - `RetryPolicy` / `RetryExecutor`: bounded retry on 404
//! - `ErrorReporter`: sink for failures converted into sentinels
//! - `MerchantContext`: resolves OAuth credentials from service integrations
//! - `ServiceError`: error taxonomy shared by every layer

pub mod core;
pub use core::{ClientBuilder, ServiceClient};

pub mod services;
pub use services::magento::{self, Customer, MagentoClient, Operation, Order, Transaction};

pub mod error;
pub use error::{ApiError, ErrorContext, Result, ServiceError};

pub mod resilience;
pub use resilience::{AttemptState, RetryExecutor, RetryPolicy};

pub mod config;
pub use config::{ConfigProvider, MagentoConfig, ServiceConfig};

pub mod reporting;
pub use reporting::{ChannelReporter, ErrorReporter, LogReporter};

pub mod session;
pub use session::{Credentials, IntegrationType, MerchantContext, ServiceIntegration};

pub mod transport;
pub use transport::{ApiRequest, HttpTransport, Transport};

mod util;

#[cfg(test)]
mod tests;

/// Create a new default client builder
pub fn client() -> core::ClientBuilder {
    core::ClientBuilder::new()
}
