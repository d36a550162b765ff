//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The core domain
//! depends only on these traits, not on concrete implementations.

mod data_provider;
mod store;

pub use data_provider::{FetchTransactionsResult, RawPayload, TransactionProvider};
pub use store::{TransactionStore, WriteMode};
