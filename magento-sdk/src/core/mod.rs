//! Core abstractions for the Magento SDK
//!
//! - `ServiceClient`: identity of a configured client
//! - `ClientBuilder`: builder pattern for creating clients

pub mod builder;
pub use builder::ClientBuilder;

/// Base trait for service clients
pub trait ServiceClient: Send + Sync {
    /// The client name/identifier
    fn name(&self) -> &str;

    /// The REST base URL requests are resolved against
    fn base_url(&self) -> &str;

    /// API version prefix
    fn version(&self) -> &str;
}
