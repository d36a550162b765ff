//! CSV spreadsheet store
//!
//! A local CSV file standing in for the spreadsheet. The whole file is loaded
//! on open and rewritten atomically on flush. Columns are matched by header
//! name, so hand-reordered files and extra user columns survive a rewrite.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::domain::result::{Error, Result};
use crate::domain::{Column, SheetRow, TRANSACTION_HEADERS};
use crate::ports::{TransactionStore, WriteMode};

#[derive(Debug, Clone)]
struct StoredRow {
    row: SheetRow,
    /// Values of columns outside the schema, by header
    extra: HashMap<String, String>,
}

#[derive(Debug)]
pub struct CsvSheetStore {
    path: PathBuf,
    headers: Vec<String>,
    rows: Vec<StoredRow>,
    index: HashMap<String, usize>,
    dirty: bool,
}

impl CsvSheetStore {
    /// Load `path`, or start empty if it does not exist yet
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut store = Self {
            path,
            headers: TRANSACTION_HEADERS.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
            index: HashMap::new(),
            dirty: false,
        };

        if store.path.exists() {
            store.load()?;
        }
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Header row as it will be written
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    fn load(&mut self) -> Result<()> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&self.path)?;

        let file_headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        if file_headers.iter().all(|h| h.is_empty()) {
            return Ok(());
        }
        if !file_headers.iter().any(|h| h == Column::Id.header()) {
            return Err(Error::store(format!(
                "{} has no '{}' column",
                self.path.display(),
                Column::Id.header()
            )));
        }

        // File order first, then any schema columns the file lacks
        let mut headers = file_headers.clone();
        for column in Column::ALL {
            if !headers.iter().any(|h| h == column.header()) {
                headers.push(column.header().to_string());
            }
        }
        self.headers = headers;

        for (line, record) in reader.records().enumerate() {
            let record = record?;
            let pairs: Vec<(&str, &str)> = file_headers
                .iter()
                .map(String::as_str)
                .zip(record.iter())
                .collect();

            let row = SheetRow::from_record(pairs.iter().copied());
            if row.id().is_empty() {
                debug!(line = line + 2, "Skipping CSV row without an id");
                continue;
            }
            let extra = pairs
                .iter()
                .filter(|(h, _)| Column::from_header(h).is_none())
                .map(|(h, v)| (h.to_string(), v.to_string()))
                .collect();

            let stored = StoredRow { row, extra };
            match self.index.get(stored.row.id()) {
                // A hand-edited file may repeat an id; the last line wins
                Some(&slot) => self.rows[slot] = stored,
                None => {
                    self.index.insert(stored.row.id().to_string(), self.rows.len());
                    self.rows.push(stored);
                }
            }
        }

        debug!(path = %self.path.display(), rows = self.rows.len(), "Loaded CSV store");
        Ok(())
    }

    fn write_to(&self, out: impl Write) -> Result<()> {
        let mut writer = csv::Writer::from_writer(out);
        writer.write_record(&self.headers)?;
        for stored in &self.rows {
            let record: Vec<String> = self
                .headers
                .iter()
                .map(|h| match Column::from_header(h) {
                    Some(column) => stored.row.get(column).to_string(),
                    None => stored.extra.get(h).cloned().unwrap_or_default(),
                })
                .collect();
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl TransactionStore for CsvSheetStore {
    fn name(&self) -> &str {
        "csv"
    }

    fn read_existing(&self, id: &str) -> Result<Option<SheetRow>> {
        Ok(self.index.get(id).map(|&slot| self.rows[slot].row.clone()))
    }

    fn write(&mut self, row: &SheetRow, mode: WriteMode) -> Result<()> {
        let id = row.id();
        if id.is_empty() {
            return Err(Error::store("cannot write a row without an id"));
        }
        match (mode, self.index.get(id).copied()) {
            (WriteMode::Insert, None) => {
                self.index.insert(id.to_string(), self.rows.len());
                self.rows.push(StoredRow {
                    row: row.clone(),
                    extra: HashMap::new(),
                });
            }
            (WriteMode::Overwrite, Some(slot)) => self.rows[slot].row = row.clone(),
            (WriteMode::Insert, Some(_)) => {
                return Err(Error::store(format!("row '{}' already exists", id)));
            }
            (WriteMode::Overwrite, None) => {
                return Err(Error::store(format!("no row '{}' to overwrite", id)));
            }
        }
        self.dirty = true;
        Ok(())
    }

    /// Rewrite the file via a temp file in the same directory
    fn flush(&mut self) -> Result<()> {
        if !self.dirty && self.path.exists() {
            return Ok(());
        }

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let mut temp = tempfile::NamedTempFile::new_in(&dir)?;
        self.write_to(temp.as_file_mut())?;
        temp.persist(&self.path).map_err(|e| Error::Io(e.error))?;

        self.dirty = false;
        debug!(path = %self.path.display(), rows = self.rows.len(), "Flushed CSV store");
        Ok(())
    }

    fn row_count(&self) -> usize {
        self.rows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn row(id: &str, balance: &str) -> SheetRow {
        let mut row = SheetRow::default();
        row.set(Column::Id, id);
        row.set(Column::Balance, balance);
        row.set(Column::IsTransfer, "FALSE");
        row
    }

    #[test]
    fn test_missing_file_starts_empty_and_flush_writes_headers() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("transactions.csv");

        let mut store = CsvSheetStore::open(&path).unwrap();
        assert_eq!(store.row_count(), 0);
        store.flush().unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.trim_end(), TRANSACTION_HEADERS.join(","));
    }

    #[test]
    fn test_round_trip_through_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("transactions.csv");

        let mut store = CsvSheetStore::open(&path).unwrap();
        store.write(&row("txn_1", "100.00"), WriteMode::Insert).unwrap();
        store.write(&row("txn_2", "5.00"), WriteMode::Insert).unwrap();
        store.write(&row("txn_1", "99.50"), WriteMode::Overwrite).unwrap();
        store.flush().unwrap();

        let reopened = CsvSheetStore::open(&path).unwrap();
        assert_eq!(reopened.row_count(), 2);
        let txn_1 = reopened.read_existing("txn_1").unwrap().unwrap();
        assert_eq!(txn_1.get(Column::Balance), "99.50");
        assert_eq!(txn_1, row("txn_1", "99.50"));
    }

    #[test]
    fn test_reordered_and_extra_columns_survive_rewrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("transactions.csv");
        fs::write(
            &path,
            "notes,balance,id,category\nchecked,100.00,txn_1,Groceries\n",
        )
        .unwrap();

        let mut store = CsvSheetStore::open(&path).unwrap();
        let existing = store.read_existing("txn_1").unwrap().unwrap();
        assert_eq!(existing.get(Column::Balance), "100.00");
        assert_eq!(existing.get(Column::Source), "");

        let mut updated = existing.clone();
        updated.set(Column::Balance, "99.50");
        store.write(&updated, WriteMode::Overwrite).unwrap();
        store.flush().unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(&headers[..4], &["notes", "balance", "id", "category"]);
        assert_eq!(headers.len(), 4 + 9);

        let record = reader.records().next().unwrap().unwrap();
        assert_eq!(&record[0], "checked");
        assert_eq!(&record[1], "99.50");
        assert_eq!(&record[2], "txn_1");
    }

    #[test]
    fn test_file_without_id_column_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("transactions.csv");
        fs::write(&path, "date,amount\n2025-11-15,-4.50\n").unwrap();

        let err = CsvSheetStore::open(&path).unwrap_err();
        assert!(matches!(err, Error::Store(_)), "{err:?}");
    }

    #[test]
    fn test_unflushed_writes_are_not_persisted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("transactions.csv");

        let mut store = CsvSheetStore::open(&path).unwrap();
        store.write(&row("txn_1", "1.00"), WriteMode::Insert).unwrap();
        drop(store);

        assert!(!path.exists());
    }
}
