//! Merchant identity and credential resolution
//!
//! A merchant carries a list of service integrations, one per external
//! system. The Magento client needs the OAuth1 credential set from the
//! `MAGENTO` integration; it is resolved once, before any network I/O.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ServiceError};

/// Type tag of a service integration
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum IntegrationType {
    /// Magento 2 storefront
    Magento,

    /// Any other integration, kept verbatim
    Other(String),
}

impl IntegrationType {
    /// Wire tag as stored on the merchant record
    pub fn as_str(&self) -> &str {
        match self {
            IntegrationType::Magento => "MAGENTO",
            IntegrationType::Other(tag) => tag,
        }
    }
}

impl From<String> for IntegrationType {
    fn from(tag: String) -> Self {
        if tag == "MAGENTO" {
            IntegrationType::Magento
        } else {
            IntegrationType::Other(tag)
        }
    }
}

impl From<IntegrationType> for String {
    fn from(kind: IntegrationType) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for IntegrationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A merchant's stored credential set for one external system
///
/// Credential fields may be absent on records for other systems; they
/// are only checked when the integration is resolved.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceIntegration {
    /// Which external system these credentials belong to
    #[serde(rename = "type")]
    pub kind: IntegrationType,

    /// OAuth consumer key
    #[serde(default)]
    pub identity_token: String,

    /// OAuth consumer secret
    #[serde(default)]
    pub identity_secret: String,

    /// OAuth access token
    #[serde(default)]
    pub token: String,

    /// OAuth access token secret
    #[serde(default)]
    pub secret: String,
}

impl fmt::Debug for ServiceIntegration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceIntegration")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// The merchant context handed to a workflow step
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerchantContext {
    /// Storefront base URL, e.g. `https://shop.example.com`
    pub storefront_url: String,

    /// Every integration configured for the merchant
    #[serde(default)]
    pub service_integrations: Vec<ServiceIntegration>,
}

/// OAuth1 credentials for the Magento REST API
///
/// Immutable once resolved. `Debug` never prints the values.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub access_token: String,
    pub access_token_secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credentials { .. }")
    }
}

impl Credentials {
    /// Reject credential sets with empty fields
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("consumer key", &self.consumer_key),
            ("consumer secret", &self.consumer_secret),
            ("access token", &self.access_token),
            ("access token secret", &self.access_token_secret),
        ];

        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(ServiceError::configuration(format!(
                    "Magento integration has an empty {}",
                    name
                )));
            }
        }

        Ok(())
    }
}

impl From<&ServiceIntegration> for Credentials {
    fn from(integration: &ServiceIntegration) -> Self {
        Self {
            consumer_key: integration.identity_token.clone(),
            consumer_secret: integration.identity_secret.clone(),
            access_token: integration.token.clone(),
            access_token_secret: integration.secret.clone(),
        }
    }
}

/// Pick the first integration of `required` type and turn it into credentials
pub fn resolve_credentials(
    integrations: &[ServiceIntegration],
    required: &IntegrationType,
) -> Result<Credentials> {
    let integration = integrations
        .iter()
        .find(|integration| &integration.kind == required)
        .ok_or_else(|| {
            ServiceError::configuration(format!(
                "No {} service integration defined on this merchant",
                required
            ))
        })?;

    let credentials = Credentials::from(integration);
    credentials.validate()?;
    Ok(credentials)
}

impl MerchantContext {
    /// Resolve the Magento credentials for this merchant
    pub fn magento_credentials(&self) -> Result<Credentials> {
        resolve_credentials(&self.service_integrations, &IntegrationType::Magento)
    }
}
