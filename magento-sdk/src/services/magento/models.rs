//! Magento resource payloads
//!
//! Entities are opaque JSON passed through to the caller. Only the
//! identifiers used for addressing are read.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A sales order (`GET /V1/orders/{id}`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Order(pub Value);

impl Order {
    /// Numeric entity id
    pub fn entity_id(&self) -> Option<u64> {
        self.0.get("entity_id").and_then(Value::as_u64)
    }

    /// Customer-facing order number
    pub fn increment_id(&self) -> Option<&str> {
        self.0.get("increment_id").and_then(Value::as_str)
    }

    /// Raw payload
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_inner(self) -> Value {
        self.0
    }
}

/// A customer account (`GET /V1/customers/{id}`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Customer(pub Value);

impl Customer {
    pub fn id(&self) -> Option<u64> {
        self.0.get("id").and_then(Value::as_u64)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_inner(self) -> Value {
        self.0
    }
}

/// A payment transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transaction(pub Value);

impl Transaction {
    /// Magento's numeric transaction id
    pub fn transaction_id(&self) -> Option<u64> {
        self.0.get("transaction_id").and_then(Value::as_u64)
    }

    /// Payment gateway transaction id
    pub fn txn_id(&self) -> Option<&str> {
        self.0.get("txn_id").and_then(Value::as_str)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_inner(self) -> Value {
        self.0
    }
}

/// Search-criteria envelope returned by list endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionSearchResult {
    #[serde(default)]
    pub items: Vec<Transaction>,

    #[serde(default)]
    pub total_count: Option<u64>,
}

impl TransactionSearchResult {
    /// The first matching transaction, if any
    pub fn into_first(self) -> Option<Transaction> {
        self.items.into_iter().next()
    }
}
