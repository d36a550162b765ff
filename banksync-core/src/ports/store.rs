//! Transaction store port - the persisted row table

use crate::domain::result::Result;
use crate::domain::SheetRow;

/// How a row reaches the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Append a row for an id the store has not seen
    Insert,
    /// Replace the row carrying the same id, in place
    Overwrite,
}

/// Persisted transaction rows keyed by `id`
///
/// Implementations may buffer writes; nothing is guaranteed durable until
/// `flush` returns.
pub trait TransactionStore: Send {
    /// Store name (e.g., "csv", "google_sheets")
    fn name(&self) -> &str;

    /// The persisted row for `id`, if any
    fn read_existing(&self, id: &str) -> Result<Option<SheetRow>>;

    fn write(&mut self, row: &SheetRow, mode: WriteMode) -> Result<()>;

    /// Persist buffered writes
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    /// Number of rows currently known to the store
    fn row_count(&self) -> usize;
}
