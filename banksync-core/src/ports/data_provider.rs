//! Transaction provider port
//!
//! Defines the interface for fetching raw transaction payloads from a
//! banking-data aggregator (Akahu, a static fixture, etc.)

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;

use crate::domain::result::Result;

/// One untouched provider record plus the provider account it belongs to
#[derive(Debug, Clone, PartialEq)]
pub struct RawPayload {
    pub account_id: String,
    pub payload: JsonValue,
}

impl RawPayload {
    pub fn new(account_id: impl Into<String>, payload: JsonValue) -> Self {
        Self {
            account_id: account_id.into(),
            payload,
        }
    }
}

/// Result of fetching transactions from a provider
#[derive(Debug, Default)]
pub struct FetchTransactionsResult {
    /// Payloads in fetch order
    pub payloads: Vec<RawPayload>,
    pub warnings: Vec<String>,
}

/// Transaction provider trait
///
/// The SyncService uses this trait to pull payloads without knowing the
/// specifics of each provider. Payloads are normalized by the caller so that
/// one malformed record never fails the whole fetch.
pub trait TransactionProvider: Send + Sync {
    /// Provider name (e.g., "akahu")
    fn name(&self) -> &str;

    /// Fetch every transaction booked in `[start, end]`
    fn fetch_transactions(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<FetchTransactionsResult>;
}
