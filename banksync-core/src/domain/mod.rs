//! Core domain entities
//!
//! Pure data structures with validation logic - no I/O.

mod ignore;
pub mod result;
pub mod row;
pub mod rule;
mod transaction;

pub use ignore::IgnoreRule;
pub use row::{Column, SheetRow, COLUMN_COUNT, TRANSACTION_HEADERS};
pub use rule::{AmountCondition, CategoryRule, Comparator, RuleField};
pub use transaction::{format_money, format_timestamp, parse_amount, Transaction, TransactionFields};
