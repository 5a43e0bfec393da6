//! OAuth 1.0a request signing (HMAC-SHA1) for Magento integrations
//!
//! Magento integrations authenticate every REST call with a signed
//! `Authorization: OAuth ...` header. Signing is pure computation; no token
//! exchange takes place.

use base64::Engine as _;
use ring::hmac;

use crate::session::Credentials;

const SIGNATURE_METHOD: &str = "HMAC-SHA1";
const OAUTH_VERSION: &str = "1.0";

/// Signs requests with one merchant's credential set
#[derive(Debug, Clone)]
pub struct OAuthSigner {
    credentials: Credentials,
}

impl OAuthSigner {
    /// Create a signer for the given credentials
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }

    /// Build the `Authorization` header value with a fresh nonce and timestamp
    ///
    /// `url` must not carry a query string; query parameters go in `query`.
    pub fn authorization_header(&self, method: &str, url: &str, query: &[(String, String)]) -> String {
        let nonce = uuid::Uuid::new_v4().simple().to_string();
        let timestamp = chrono::Utc::now().timestamp().to_string();
        self.authorization_header_with(method, url, query, &nonce, &timestamp)
    }

    /// Deterministic variant of `authorization_header`
    pub fn authorization_header_with(
        &self,
        method: &str,
        url: &str,
        query: &[(String, String)],
        nonce: &str,
        timestamp: &str,
    ) -> String {
        let mut oauth_params = vec![
            ("oauth_consumer_key".to_string(), self.credentials.consumer_key.clone()),
            ("oauth_nonce".to_string(), nonce.to_string()),
            ("oauth_signature_method".to_string(), SIGNATURE_METHOD.to_string()),
            ("oauth_timestamp".to_string(), timestamp.to_string()),
            ("oauth_token".to_string(), self.credentials.access_token.clone()),
            ("oauth_version".to_string(), OAUTH_VERSION.to_string()),
        ];

        let mut all_params = oauth_params.clone();
        all_params.extend(query.iter().cloned());
        let signature = self.signature(method, url, &all_params);

        oauth_params.push(("oauth_signature".to_string(), signature));
        oauth_params.sort();

        let fields: Vec<String> = oauth_params
            .iter()
            .map(|(key, value)| format!("{}=\"{}\"", encode(key), encode(value)))
            .collect();

        format!("OAuth {}", fields.join(", "))
    }

    /// Compute the base64 HMAC-SHA1 signature over the signature base string
    pub fn signature(&self, method: &str, url: &str, params: &[(String, String)]) -> String {
        let base = signature_base_string(method, url, params);
        let signing_key = format!(
            "{}&{}",
            encode(&self.credentials.consumer_secret),
            encode(&self.credentials.access_token_secret)
        );

        let key = hmac::Key::new(hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY, signing_key.as_bytes());
        let tag = hmac::sign(&key, base.as_bytes());
        base64::engine::general_purpose::STANDARD.encode(tag.as_ref())
    }
}

/// `METHOD&enc(url)&enc(normalized params)`
pub fn signature_base_string(method: &str, url: &str, params: &[(String, String)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(key, value)| (encode(key), encode(value)))
        .collect();
    encoded.sort();

    let normalized = encoded
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        method.to_uppercase(),
        encode(url),
        encode(&normalized)
    )
}

/// RFC 3986 percent-encoding (unreserved characters pass through)
fn encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}
