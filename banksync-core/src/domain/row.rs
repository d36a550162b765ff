//! Persisted row schema
//!
//! A `SheetRow` is the durable form of a transaction: twelve string cells in a
//! fixed header order. Cells are addressed by `Column` rather than by position
//! so that stores whose columns are ordered differently still compare cleanly.

use std::fmt;
use std::ops::Index;

use crate::domain::result::{Error, Result};

/// Header names in persisted order
pub const TRANSACTION_HEADERS: [&str; COLUMN_COUNT] = [
    "id",
    "date",
    "account",
    "amount",
    "balance",
    "description_raw",
    "merchant_normalised",
    "category",
    "category_type",
    "is_transfer",
    "source",
    "imported_at",
];

pub const COLUMN_COUNT: usize = 12;

/// A column of the persisted row schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Column {
    Id,
    Date,
    Account,
    Amount,
    Balance,
    DescriptionRaw,
    MerchantNormalised,
    Category,
    CategoryType,
    IsTransfer,
    Source,
    ImportedAt,
}

impl Column {
    /// All columns in persisted order
    pub const ALL: [Column; COLUMN_COUNT] = [
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
        Column::ImportedAt,
    ];

    /// Zero-based position in the persisted order
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn header(self) -> &'static str {
        TRANSACTION_HEADERS[self.index()]
    }

    /// Look up a column by header name (exact, trimmed)
    pub fn from_header(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL.into_iter().find(|c| c.header() == name)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

/// Serialized `is_transfer` values
pub const TRUE_LITERAL: &str = "TRUE";
pub const FALSE_LITERAL: &str = "FALSE";

/// One persisted transaction row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRow {
    cells: [String; COLUMN_COUNT],
}

impl Default for SheetRow {
    fn default() -> Self {
        Self {
            cells: std::array::from_fn(|_| String::new()),
        }
    }
}

impl SheetRow {
    /// Build a row from values in persisted order.
    ///
    /// Stores commonly drop trailing empty cells, so shorter input is padded
    /// with empty strings. More values than the schema has columns is an error.
    pub fn from_values<I, S>(values: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut row = Self::default();
        for (i, value) in values.into_iter().enumerate() {
            if i >= COLUMN_COUNT {
                return Err(Error::store(format!(
                    "row has more than {} columns",
                    COLUMN_COUNT
                )));
            }
            row.cells[i] = value.into();
        }
        Ok(row)
    }

    /// Build a row from (header, value) pairs.
    ///
    /// Unknown headers are ignored; columns absent from the record are empty.
    pub fn from_record<'a, I>(record: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut row = Self::default();
        for (header, value) in record {
            if let Some(column) = Column::from_header(header) {
                row.cells[column.index()] = value.to_string();
            }
        }
        row
    }

    pub fn get(&self, column: Column) -> &str {
        &self.cells[column.index()]
    }

    pub fn set(&mut self, column: Column, value: impl Into<String>) {
        self.cells[column.index()] = value.into();
    }

    pub fn id(&self) -> &str {
        self.get(Column::Id)
    }

    /// Cells in persisted order
    pub fn values(&self) -> &[String] {
        &self.cells
    }

    /// Iterate (column, value) pairs in persisted order
    pub fn iter(&self) -> impl Iterator<Item = (Column, &str)> {
        Column::ALL.into_iter().map(move |c| (c, self.get(c)))
    }
}

impl Index<Column> for SheetRow {
    type Output = str;

    fn index(&self, column: Column) -> &str {
        self.get(column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_columns_match_headers() {
        assert_eq!(Column::ALL.len(), TRANSACTION_HEADERS.len());
        for (i, column) in Column::ALL.iter().enumerate() {
            assert_eq!(column.index(), i);
            assert_eq!(column.header(), TRANSACTION_HEADERS[i]);
            assert_eq!(Column::from_header(column.header()), Some(*column));
        }
        assert_eq!(Column::IsTransfer.index(), 9);
    }

    #[test]
    fn test_from_values_pads_short_rows() {
        let row = SheetRow::from_values(["txn_1", "2025-11-15"]).unwrap();
        assert_eq!(row.id(), "txn_1");
        assert_eq!(row.get(Column::Date), "2025-11-15");
        assert_eq!(row.get(Column::ImportedAt), "");
        assert_eq!(row.values().len(), COLUMN_COUNT);
    }

    #[test]
    fn test_from_values_rejects_long_rows() {
        let values: Vec<String> = (0..13).map(|i| i.to_string()).collect();
        assert!(SheetRow::from_values(values).is_err());
    }

    #[test]
    fn test_from_record_is_order_independent() {
        let row = SheetRow::from_record([
            ("balance", "99.50"),
            ("id", "txn_9"),
            ("unrelated", "ignored"),
            (" category ", "Groceries"),
        ]);
        assert_eq!(row.id(), "txn_9");
        assert_eq!(&row[Column::Balance], "99.50");
        assert_eq!(row.get(Column::Category), "Groceries");
        assert_eq!(row.get(Column::Source), "");
    }
}
