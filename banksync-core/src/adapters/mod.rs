//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - Akahu HTTP client for TransactionProvider
//! - CSV file, Google Sheets and in-memory tables for TransactionStore
//! - JSON file for the last-sync state

pub mod akahu;
pub mod csv_store;
pub mod memory;
pub mod sheets;
pub mod state;

#[cfg(test)]
pub mod akahu_mock;
