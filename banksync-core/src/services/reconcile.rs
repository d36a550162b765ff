//! Reconciliation - decide insert / overwrite / no-op for a fresh row
//!
//! Rows are compared by column, not by position, so a store whose header
//! order differs from the schema still reconciles correctly. `imported_at` is
//! metadata of the first import: it is never compared and an overwrite keeps
//! the persisted value.

use std::collections::HashMap;

use tracing::warn;

use crate::domain::result::Error;
use crate::domain::{Column, SheetRow, Transaction};

/// Columns whose drift forces an overwrite (every column but `imported_at`)
pub const COMPARED_COLUMNS: [Column; 11] = [
    Column::Id,
    Column::Date,
    Column::Account,
    Column::Amount,
    Column::Balance,
    Column::DescriptionRaw,
    Column::MerchantNormalised,
    Column::Category,
    Column::CategoryType,
    Column::IsTransfer,
    Column::Source,
];

/// True iff any compared column differs (exact string equality)
pub fn needs_update(existing: &SheetRow, fresh: &SheetRow) -> bool {
    COMPARED_COLUMNS
        .iter()
        .any(|&c| existing.get(c) != fresh.get(c))
}

/// Compared columns whose values differ, in schema order
pub fn changed_columns(existing: &SheetRow, fresh: &SheetRow) -> Vec<Column> {
    COMPARED_COLUMNS
        .iter()
        .copied()
        .filter(|&c| existing.get(c) != fresh.get(c))
        .collect()
}

/// What the store should do with a freshly computed row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowAction {
    Insert(SheetRow),
    /// Replacement row, already carrying the persisted `imported_at`
    Overwrite {
        row: SheetRow,
        changed: Vec<Column>,
    },
    Unchanged,
}

/// Reconcile a fresh row against the persisted row with the same id
pub fn plan(existing: Option<&SheetRow>, mut fresh: SheetRow) -> RowAction {
    let Some(existing) = existing else {
        return RowAction::Insert(fresh);
    };

    let changed = changed_columns(existing, &fresh);
    if changed.is_empty() {
        return RowAction::Unchanged;
    }

    let imported_at = existing.get(Column::ImportedAt);
    if !imported_at.is_empty() {
        fresh.set(Column::ImportedAt, imported_at);
    }
    RowAction::Overwrite {
        row: fresh,
        changed,
    }
}

/// Collapse duplicate ids within one fetch.
///
/// The later payload wins but takes the slot of the first occurrence, so the
/// batch order stays stable. Each collision is reported as a warning.
pub fn dedupe_by_id(transactions: Vec<Transaction>) -> (Vec<Transaction>, Vec<String>) {
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut unique: Vec<Transaction> = Vec::with_capacity(transactions.len());
    let mut warnings = Vec::new();

    for tx in transactions {
        match slots.get(&tx.id) {
            Some(&slot) => {
                let err = Error::IdentityCollision(tx.id.clone());
                warn!(id = %tx.id, "{}", err);
                warnings.push(err.to_string());
                unique[slot] = tx;
            }
            None => {
                slots.insert(tx.id.clone(), unique.len());
                unique.push(tx);
            }
        }
    }

    (unique, warnings)
}
