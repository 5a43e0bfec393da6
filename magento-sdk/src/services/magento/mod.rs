//! Magento 2 REST client
//!
//! `MagentoClient` exposes orders, customers and transactions to workflow
//! steps. Each operation comes in three shapes:
//!
//! - `get_order(id)`: sentinel surface (`Option` / `bool`), never fails
//! - `get_order_with_policy(id, policy)`: same, with an explicit retry budget
//! - `try_get_order(id)`: explicit `Result` for callers that want the cause
//!
//! Sentinel variants report every failure to the configured `ErrorReporter`
//! exactly once before returning.

mod models;
pub use models::*;

use std::fmt;
use std::sync::Arc;

use futures::future::join_all;
use log::debug;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::config::{MagentoConfig, DEFAULT_PROVIDER};
use crate::core::{ClientBuilder, ServiceClient};
use crate::error::{Result, ServiceError};
use crate::reporting::{ErrorReporter, LogReporter};
use crate::resilience::{RetryExecutor, RetryPolicy, TransitionObserver};
use crate::session::MerchantContext;
use crate::transport::{ApiRequest, HttpTransport, Transport};

const TXN_FILTER: &str = "searchCriteria[filter_groups][0][filters][0]";

/// One addressable call against the Magento API
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    GetOrder(u64),
    CancelOrder(u64),
    HoldOrder(u64),
    UnholdOrder(u64),
    GetCustomer(u64),
    GetTransaction(String),
}

impl Operation {
    /// Human readable operation name
    pub fn name(&self) -> &'static str {
        match self {
            Operation::GetOrder(_) => "get order",
            Operation::CancelOrder(_) => "cancel order",
            Operation::HoldOrder(_) => "hold order",
            Operation::UnholdOrder(_) => "unhold order",
            Operation::GetCustomer(_) => "get customer",
            Operation::GetTransaction(_) => "get transaction",
        }
    }

    /// Identifier of the addressed resource
    pub fn resource_id(&self) -> String {
        match self {
            Operation::GetOrder(id)
            | Operation::CancelOrder(id)
            | Operation::HoldOrder(id)
            | Operation::UnholdOrder(id)
            | Operation::GetCustomer(id) => id.to_string(),
            Operation::GetTransaction(id) => id.clone(),
        }
    }

    /// The REST request implementing this operation
    pub fn request(&self) -> ApiRequest {
        match self {
            Operation::GetOrder(id) => ApiRequest::get(format!("V1/orders/{}", id)),
            Operation::CancelOrder(id) => ApiRequest::post(format!("V1/orders/{}/cancel", id)),
            Operation::HoldOrder(id) => ApiRequest::post(format!("V1/orders/{}/hold", id)),
            Operation::UnholdOrder(id) => ApiRequest::post(format!("V1/orders/{}/unhold", id)),
            Operation::GetCustomer(id) => ApiRequest::get(format!("V1/customers/{}", id)),
            Operation::GetTransaction(txn_id) => ApiRequest::get("V1/transactions")
                .query(format!("{}[field]", TXN_FILTER), "txn_id")
                .query(format!("{}[value]", TXN_FILTER), txn_id.clone())
                .query(format!("{}[condition_type]", TXN_FILTER), "eq"),
        }
    }

    /// Message handed to the reporter when this operation fails
    pub fn failure_message(&self) -> String {
        format!("Failed to {} {} in Magento", self.name(), self.resource_id())
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name(), self.resource_id())
    }
}

/// Retrying Magento REST client
pub struct MagentoClient<T = HttpTransport> {
    /// Transport, shared across clones
    transport: Arc<T>,

    /// Default retry policy for operations without an explicit one
    policy: RetryPolicy,

    /// Sink for terminal failures
    reporter: Arc<dyn ErrorReporter>,

    /// Aborts in-flight operations when cancelled
    cancellation: Option<CancellationToken>,

    /// Optional retry state hook
    observer: Option<TransitionObserver>,
}

impl<T> Clone for MagentoClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            policy: self.policy,
            reporter: Arc::clone(&self.reporter),
            cancellation: self.cancellation.clone(),
            observer: self.observer.clone(),
        }
    }
}

impl<T> fmt::Debug for MagentoClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MagentoClient")
            .field("policy", &self.policy)
            .field("cancellable", &self.cancellation.is_some())
            .finish_non_exhaustive()
    }
}

impl MagentoClient<HttpTransport> {
    /// Build a client for a merchant, with tunables read from the environment
    ///
    /// Fails with `ServiceError::Configuration` when the merchant has no
    /// Magento integration. No network I/O happens here.
    pub fn from_merchant(merchant: &MerchantContext) -> Result<Self> {
        let config = MagentoConfig::from_provider(&**DEFAULT_PROVIDER)?;
        Self::from_merchant_with_config(merchant, config)
    }

    /// Build a client for a merchant with explicit tunables
    pub fn from_merchant_with_config(merchant: &MerchantContext, config: MagentoConfig) -> Result<Self> {
        ClientBuilder::new()
            .config(config)
            .merchant(merchant.clone())
            .build()
    }

    /// Create a new builder
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }
}

impl ServiceClient for MagentoClient<HttpTransport> {
    fn name(&self) -> &str {
        "magento"
    }

    fn base_url(&self) -> &str {
        self.transport.base_url()
    }

    fn version(&self) -> &str {
        "V1"
    }
}

impl<T: Transport> MagentoClient<T> {
    /// Assemble a client around an existing transport
    pub fn with_transport(transport: T) -> Self {
        Self {
            transport: Arc::new(transport),
            policy: RetryPolicy::default(),
            reporter: Arc::new(LogReporter),
            cancellation: None,
            observer: None,
        }
    }

    /// Replace the default retry policy
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the error reporter
    pub fn with_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Abort operations when `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Observe retry state transitions
    pub fn with_observer(mut self, observer: TransitionObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// The default retry policy
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// The underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    async fn call(&self, operation: &Operation, policy: RetryPolicy) -> Result<Value> {
        let mut executor = RetryExecutor::new(policy);
        if let Some(ref observer) = self.observer {
            executor = executor.with_observer(Arc::clone(observer));
        }

        let request = operation.request();
        let request = &request;
        let transport = &*self.transport;

        executor
            .execute(
                move |state| {
                    debug!("{} (attempt {}/{})", operation, state.attempts, state.max_retry);
                    transport.send(request)
                },
                self.cancellation.as_ref(),
            )
            .await
    }

    async fn fetch<R: DeserializeOwned>(&self, operation: &Operation, policy: RetryPolicy) -> Result<R> {
        let value = self.call(operation, policy).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn act(&self, operation: &Operation, policy: RetryPolicy) -> Result<()> {
        match self.call(operation, policy).await? {
            Value::Bool(false) => Err(ServiceError::Declined(operation.to_string())),
            _ => Ok(()),
        }
    }

    fn report<V>(&self, operation: &Operation, result: Result<V>) -> Option<V> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.reporter.report(&operation.failure_message(), &err);
                None
            }
        }
    }

    // Orders

    /// Get an order by entity id
    #[tracing::instrument(skip(self))]
    pub async fn try_get_order_with_policy(&self, order_id: u64, policy: RetryPolicy) -> Result<Order> {
        self.fetch(&Operation::GetOrder(order_id), policy).await
    }

    pub async fn try_get_order(&self, order_id: u64) -> Result<Order> {
        self.try_get_order_with_policy(order_id, self.policy).await
    }

    pub async fn get_order_with_policy(&self, order_id: u64, policy: RetryPolicy) -> Option<Order> {
        let result = self.try_get_order_with_policy(order_id, policy).await;
        self.report(&Operation::GetOrder(order_id), result)
    }

    /// Get an order, or `None` after reporting the failure
    pub async fn get_order(&self, order_id: u64) -> Option<Order> {
        self.get_order_with_policy(order_id, self.policy).await
    }

    /// Get several orders concurrently; each id runs its own retry chain
    pub async fn get_orders(&self, order_ids: &[u64]) -> Vec<Option<Order>> {
        join_all(order_ids.iter().map(|&order_id| self.get_order(order_id))).await
    }

    /// Cancel an order
    #[tracing::instrument(skip(self))]
    pub async fn try_cancel_order_with_policy(&self, order_id: u64, policy: RetryPolicy) -> Result<()> {
        self.act(&Operation::CancelOrder(order_id), policy).await
    }

    pub async fn try_cancel_order(&self, order_id: u64) -> Result<()> {
        self.try_cancel_order_with_policy(order_id, self.policy).await
    }

    pub async fn cancel_order_with_policy(&self, order_id: u64, policy: RetryPolicy) -> bool {
        let result = self.try_cancel_order_with_policy(order_id, policy).await;
        self.report(&Operation::CancelOrder(order_id), result).is_some()
    }

    /// Cancel an order; `true` when Magento accepted it
    pub async fn cancel_order(&self, order_id: u64) -> bool {
        self.cancel_order_with_policy(order_id, self.policy).await
    }

    /// Place an order on hold
    #[tracing::instrument(skip(self))]
    pub async fn try_hold_order_with_policy(&self, order_id: u64, policy: RetryPolicy) -> Result<()> {
        self.act(&Operation::HoldOrder(order_id), policy).await
    }

    pub async fn try_hold_order(&self, order_id: u64) -> Result<()> {
        self.try_hold_order_with_policy(order_id, self.policy).await
    }

    pub async fn hold_order_with_policy(&self, order_id: u64, policy: RetryPolicy) -> bool {
        let result = self.try_hold_order_with_policy(order_id, policy).await;
        self.report(&Operation::HoldOrder(order_id), result).is_some()
    }

    /// Place an order on hold; `true` when Magento accepted it
    pub async fn hold_order(&self, order_id: u64) -> bool {
        self.hold_order_with_policy(order_id, self.policy).await
    }

    /// Release an order from hold
    #[tracing::instrument(skip(self))]
    pub async fn try_unhold_order_with_policy(&self, order_id: u64, policy: RetryPolicy) -> Result<()> {
        self.act(&Operation::UnholdOrder(order_id), policy).await
    }

    pub async fn try_unhold_order(&self, order_id: u64) -> Result<()> {
        self.try_unhold_order_with_policy(order_id, self.policy).await
    }

    pub async fn unhold_order_with_policy(&self, order_id: u64, policy: RetryPolicy) -> bool {
        let result = self.try_unhold_order_with_policy(order_id, policy).await;
        self.report(&Operation::UnholdOrder(order_id), result).is_some()
    }

    /// Release an order from hold; `true` when Magento accepted it
    pub async fn unhold_order(&self, order_id: u64) -> bool {
        self.unhold_order_with_policy(order_id, self.policy).await
    }

    // Customers

    #[tracing::instrument(skip(self))]
    pub async fn try_get_customer_with_policy(&self, customer_id: u64, policy: RetryPolicy) -> Result<Customer> {
        self.fetch(&Operation::GetCustomer(customer_id), policy).await
    }

    pub async fn try_get_customer(&self, customer_id: u64) -> Result<Customer> {
        self.try_get_customer_with_policy(customer_id, self.policy).await
    }

    pub async fn get_customer_with_policy(&self, customer_id: u64, policy: RetryPolicy) -> Option<Customer> {
        let result = self.try_get_customer_with_policy(customer_id, policy).await;
        self.report(&Operation::GetCustomer(customer_id), result)
    }

    /// Get a customer, or `None` after reporting the failure
    pub async fn get_customer(&self, customer_id: u64) -> Option<Customer> {
        self.get_customer_with_policy(customer_id, self.policy).await
    }

    // Transactions

    /// Look up a transaction by payment gateway id
    ///
    /// `Ok(None)` when the search matched nothing; that is not a failure.
    #[tracing::instrument(skip(self))]
    pub async fn try_get_transaction_with_policy(
        &self,
        transaction_id: &str,
        policy: RetryPolicy,
    ) -> Result<Option<Transaction>> {
        if transaction_id.trim().is_empty() {
            return Err(ServiceError::validation("Transaction id must not be empty"));
        }

        let operation = Operation::GetTransaction(transaction_id.to_string());
        let found: TransactionSearchResult = self.fetch(&operation, policy).await?;
        Ok(found.into_first())
    }

    pub async fn try_get_transaction(&self, transaction_id: &str) -> Result<Option<Transaction>> {
        self.try_get_transaction_with_policy(transaction_id, self.policy).await
    }

    pub async fn get_transaction_with_policy(&self, transaction_id: &str, policy: RetryPolicy) -> Option<Transaction> {
        let result = self.try_get_transaction_with_policy(transaction_id, policy).await;
        self.report(&Operation::GetTransaction(transaction_id.to_string()), result)
            .flatten()
    }

    /// Get a transaction, or `None` when absent or after reporting a failure
    pub async fn get_transaction(&self, transaction_id: &str) -> Option<Transaction> {
        self.get_transaction_with_policy(transaction_id, self.policy).await
    }
}
