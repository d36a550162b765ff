//! In-memory transaction store for tests and dry-run previews

use std::collections::HashMap;

use crate::domain::result::{Error, Result};
use crate::domain::SheetRow;
use crate::ports::{TransactionStore, WriteMode};

/// Rows in insertion order with an id index
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    rows: Vec<SheetRow>,
    index: HashMap<String, usize>,
    flushes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with already-persisted rows
    pub fn with_rows(rows: impl IntoIterator<Item = SheetRow>) -> Self {
        let mut store = Self::new();
        for row in rows {
            let id = row.id().to_string();
            match store.index.get(&id) {
                Some(&slot) => store.rows[slot] = row,
                None => {
                    store.index.insert(id, store.rows.len());
                    store.rows.push(row);
                }
            }
        }
        store
    }

    pub fn rows(&self) -> &[SheetRow] {
        &self.rows
    }

    /// How many times `flush` was called
    pub fn flush_count(&self) -> usize {
        self.flushes
    }
}

impl TransactionStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn read_existing(&self, id: &str) -> Result<Option<SheetRow>> {
        Ok(self.index.get(id).map(|&slot| self.rows[slot].clone()))
    }

    fn write(&mut self, row: &SheetRow, mode: WriteMode) -> Result<()> {
        let id = row.id();
        if id.is_empty() {
            return Err(Error::store("cannot write a row without an id"));
        }
        match (mode, self.index.get(id).copied()) {
            (WriteMode::Insert, None) => {
                self.index.insert(id.to_string(), self.rows.len());
                self.rows.push(row.clone());
            }
            (WriteMode::Insert, Some(_)) => {
                return Err(Error::store(format!("row '{}' already exists", id)));
            }
            (WriteMode::Overwrite, Some(slot)) => self.rows[slot] = row.clone(),
            (WriteMode::Overwrite, None) => {
                return Err(Error::store(format!("no row '{}' to overwrite", id)));
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.flushes += 1;
        Ok(())
    }

    fn row_count(&self) -> usize {
        self.rows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Column;

    fn row(id: &str, balance: &str) -> SheetRow {
        let mut row = SheetRow::default();
        row.set(Column::Id, id);
        row.set(Column::Balance, balance);
        row
    }

    #[test]
    fn test_insert_then_overwrite_in_place() {
        let mut store = MemoryStore::new();
        store.write(&row("a", "1.00"), WriteMode::Insert).unwrap();
        store.write(&row("b", "2.00"), WriteMode::Insert).unwrap();
        store.write(&row("a", "9.00"), WriteMode::Overwrite).unwrap();

        assert_eq!(store.row_count(), 2);
        assert_eq!(store.rows()[0].get(Column::Balance), "9.00");
        assert_eq!(
            store.read_existing("a").unwrap().unwrap().get(Column::Balance),
            "9.00"
        );
        assert!(store.read_existing("zzz").unwrap().is_none());
    }

    #[test]
    fn test_mode_mismatches_are_errors() {
        let mut store = MemoryStore::with_rows([row("a", "1.00")]);
        assert!(store.write(&row("a", "1.00"), WriteMode::Insert).is_err());
        assert!(store.write(&row("b", "1.00"), WriteMode::Overwrite).is_err());
        assert!(store.write(&row("", "1.00"), WriteMode::Insert).is_err());
    }
}
