//! Shared fixtures for the test modules

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use tokio::time::Instant;

use crate::error::ApiError;
use crate::session::{IntegrationType, MerchantContext, ServiceIntegration};
use crate::transport::{ApiRequest, Transport};

/// One canned transport outcome
#[derive(Debug, Clone)]
pub enum Reply {
    Json(Value),
    Status(u16),
    Unreachable,
}

impl Reply {
    fn into_result(self) -> Result<Value, ApiError> {
        match self {
            Reply::Json(value) => Ok(value),
            Reply::Status(code) => Err(ApiError::from_status(code, format!("status {}", code))),
            Reply::Unreachable => Err(ApiError::transport("Connection error: refused")),
        }
    }
}

/// In-memory transport replaying a script; the last reply repeats forever
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<(ApiRequest, Instant)>>,
}

impl ScriptedTransport {
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn paths(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(request, _)| request.path.clone())
            .collect()
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(request, _)| request.clone())
            .collect()
    }

    /// Time between consecutive sends
    pub fn gaps(&self) -> Vec<std::time::Duration> {
        let calls = self.calls.lock().unwrap();
        calls
            .windows(2)
            .map(|pair| pair[1].1.duration_since(pair[0].1))
            .collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &ApiRequest) -> Result<Value, ApiError> {
        self.calls
            .lock()
            .unwrap()
            .push((request.clone(), Instant::now()));

        let reply = {
            let mut replies = self.replies.lock().unwrap();
            if replies.len() > 1 {
                replies.pop_front()
            } else {
                replies.front().cloned()
            }
        };

        reply.unwrap_or(Reply::Status(500)).into_result()
    }
}

pub fn magento_integration() -> ServiceIntegration {
    ServiceIntegration {
        kind: IntegrationType::Magento,
        identity_token: "ck".to_string(),
        identity_secret: "cs".to_string(),
        token: "at".to_string(),
        secret: "ats".to_string(),
    }
}

pub fn other_integration(tag: &str) -> ServiceIntegration {
    ServiceIntegration {
        kind: IntegrationType::Other(tag.to_string()),
        identity_token: "other-ck".to_string(),
        identity_secret: "other-cs".to_string(),
        token: "other-at".to_string(),
        secret: "other-ats".to_string(),
    }
}

pub fn merchant(storefront_url: &str, integrations: Vec<ServiceIntegration>) -> MerchantContext {
    MerchantContext {
        storefront_url: storefront_url.to_string(),
        service_integrations: integrations,
    }
}
