//! Service layer - decision logic and orchestration
//!
//! `categoriser`, `reconcile` and `sync_window` are pure functions over
//! domain values. `SyncService` wires them to the provider and store ports.

pub mod categoriser;
pub mod reconcile;
pub mod sync_window;
mod status;
mod sync;

pub use categoriser::{Categorisation, Categoriser, TRANSFER_INDICATORS};
pub use reconcile::{changed_columns, dedupe_by_id, needs_update, plan, RowAction, COMPARED_COLUMNS};
pub use status::{AccountSummary, StatusService, StatusSummary};
pub use sync::{ChangeKind, RowChange, SyncResult, SyncService, TransactionStats};
pub use sync_window::{fetch_start, SyncKind, SyncWindow};
