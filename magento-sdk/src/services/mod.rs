//! Service-specific client implementations
//!
//! Only Magento lives here today; `common` holds the HTTP plumbing the
//! transport builds on.

pub mod magento;
pub(crate) mod common;

pub use common::UserAgent;
