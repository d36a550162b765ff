//! Google Sheets store
//!
//! Talks to the Sheets v4 values API with a pre-issued OAuth access token.
//! The tab is read once on open; writes are buffered and sent on flush as one
//! `values:batchUpdate` (in-place overwrites) plus one `:append` (inserts).
//!
//! API Documentation: https://developers.google.com/sheets/api/reference/rest/v4/spreadsheets.values

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::Url;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use tracing::{debug, info};

use crate::domain::result::{Error as DomainError, Result as DomainResult};
use crate::domain::{Column, SheetRow, TRANSACTION_HEADERS};
use crate::ports::{TransactionStore, WriteMode};

/// Default production API URL
const SHEETS_PRODUCTION_URL: &str = "https://sheets.googleapis.com/v4";

/// Environment variable to override the Sheets API base URL
pub const SHEETS_BASE_URL_ENV: &str = "GOOGLE_SHEETS_BASE_URL";

const REQUEST_TIMEOUT_SECS: u64 = 30;

pub fn get_base_url() -> String {
    std::env::var(SHEETS_BASE_URL_ENV).unwrap_or_else(|_| SHEETS_PRODUCTION_URL.to_string())
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<JsonValue>>,
}

// =============================================================================
// Sheets HTTP Client
// =============================================================================

#[derive(Debug)]
pub struct GoogleSheetsClient {
    client: Client,
    access_token: String,
    base_url: String,
    spreadsheet_id: String,
}

impl GoogleSheetsClient {
    pub fn new(access_token: &str, spreadsheet_id: &str) -> Result<Self> {
        Self::new_with_base_url(access_token, spreadsheet_id, &get_base_url())
    }

    pub fn new_with_base_url(
        access_token: &str,
        spreadsheet_id: &str,
        base_url: &str,
    ) -> Result<Self> {
        if access_token.trim().is_empty() {
            anyhow::bail!("Google Sheets access token cannot be empty");
        }
        if spreadsheet_id.trim().is_empty() {
            anyhow::bail!("Spreadsheet id cannot be empty");
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            access_token: access_token.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            spreadsheet_id: spreadsheet_id.to_string(),
        })
    }

    /// `{base}/spreadsheets/{id}/{segments...}`, each segment percent-encoded
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .with_context(|| format!("Invalid Sheets base URL: {}", self.base_url))?;
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("Sheets base URL cannot have a path"))?
            .push("spreadsheets")
            .push(&self.spreadsheet_id)
            .extend(segments);
        Ok(url)
    }

    /// Every cell of `range`, stringified
    pub fn get_values(&self, range: &str) -> Result<Vec<Vec<String>>> {
        let url = self.url(&["values", range])?;
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .map_err(|e| self.map_request_error(e))?;
        self.check_response_status(&response)?;

        let body: ValueRange = response
            .json()
            .context("Failed to parse Sheets values response")?;
        Ok(body
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect())
    }

    /// Overwrite ranges in one request
    pub fn batch_update(&self, data: Vec<(String, Vec<Vec<String>>)>) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        let url = self.url(&["values:batchUpdate"])?;
        let body = json!({
            "valueInputOption": "RAW",
            "data": data
                .into_iter()
                .map(|(range, values)| json!({ "range": range, "values": values }))
                .collect::<Vec<_>>(),
        });

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .map_err(|e| self.map_request_error(e))?;
        self.check_response_status(&response)
    }

    /// Append rows after the last non-empty row of `range`
    pub fn append(&self, range: &str, values: Vec<Vec<String>>) -> Result<()> {
        if values.is_empty() {
            return Ok(());
        }
        let mut url = self.url(&["values", &format!("{}:append", range)])?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "RAW")
            .append_pair("insertDataOption", "INSERT_ROWS");

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.access_token)
            .json(&json!({ "values": values }))
            .send()
            .map_err(|e| self.map_request_error(e))?;
        self.check_response_status(&response)
    }

    fn map_request_error(&self, error: reqwest::Error) -> anyhow::Error {
        if error.is_timeout() {
            anyhow::anyhow!("Connection timed out after {} seconds", REQUEST_TIMEOUT_SECS)
        } else if error.is_connect() {
            anyhow::anyhow!("Unable to connect to Google Sheets")
        } else {
            anyhow::anyhow!("Google Sheets request failed: {}", error)
        }
    }

    fn check_response_status(&self, response: &reqwest::blocking::Response) -> Result<()> {
        match response.status().as_u16() {
            200 => Ok(()),
            400 => anyhow::bail!("Google Sheets rejected the request. Check the tab name."),
            401 => anyhow::bail!(
                "Google Sheets authentication failed. The access token may have expired."
            ),
            403 => anyhow::bail!(
                "Google Sheets access denied. Share the spreadsheet with the token's account."
            ),
            404 => anyhow::bail!("Spreadsheet not found: {}", self.spreadsheet_id),
            429 => anyhow::bail!("Google Sheets quota exceeded. Please wait a moment and try again."),
            status => anyhow::bail!("Google Sheets API error: HTTP {}", status),
        }
    }
}

fn cell_to_string(cell: JsonValue) -> String {
    match cell {
        JsonValue::String(s) => s,
        JsonValue::Null => String::new(),
        JsonValue::Bool(true) => "TRUE".to_string(),
        JsonValue::Bool(false) => "FALSE".to_string(),
        other => other.to_string(),
    }
}

/// A1 reference to a whole tab, quoted so names with spaces work
pub fn tab_range(tab: &str) -> String {
    format!("'{}'", tab.replace('\'', "''"))
}

// =============================================================================
// SheetTable - in-memory view of the tab plus pending writes
// =============================================================================

/// A known row plus the cells of columns outside the schema
#[derive(Debug, Clone)]
struct SheetEntry {
    row: SheetRow,
    /// Non-schema cells keyed by column position in the tab
    extra: BTreeMap<usize, String>,
}

#[derive(Debug, Default)]
pub struct SheetTable {
    headers: Vec<String>,
    /// Whether the header row must be (re)written: empty tab, or schema
    /// columns appended to an existing header row
    write_headers: bool,
    /// Known rows keyed by sheet row number (1-based, header is row 1)
    rows: BTreeMap<usize, SheetEntry>,
    index: HashMap<String, usize>,
    /// Last row holding any content, with or without an id
    last_row: usize,
    pending_updates: BTreeSet<usize>,
    pending_inserts: Vec<SheetRow>,
}

impl SheetTable {
    /// Build from the tab's cells as returned by the API
    pub fn from_values(values: Vec<Vec<String>>) -> DomainResult<Self> {
        let mut iter = values.into_iter();
        let tab_headers: Vec<String> = iter
            .next()
            .map(|h| h.into_iter().map(|c| c.trim().to_string()).collect())
            .unwrap_or_default();

        if tab_headers.iter().all(String::is_empty) {
            return Ok(Self {
                headers: TRANSACTION_HEADERS.iter().map(|h| h.to_string()).collect(),
                write_headers: true,
                last_row: 1,
                ..Default::default()
            });
        }
        if !tab_headers.iter().any(|h| h == Column::Id.header()) {
            return Err(DomainError::store(format!(
                "sheet has no '{}' column in its header row",
                Column::Id.header()
            )));
        }

        // Tab order first, then any schema columns the tab lacks
        let mut headers = tab_headers.clone();
        for column in Column::ALL {
            if !headers.iter().any(|h| h == column.header()) {
                headers.push(column.header().to_string());
            }
        }

        let mut table = Self {
            write_headers: headers.len() != tab_headers.len(),
            headers,
            last_row: 1,
            ..Default::default()
        };
        for (offset, cells) in iter.enumerate() {
            let row_number = offset + 2;
            if cells.iter().any(|c| !c.trim().is_empty()) {
                table.last_row = row_number;
            }
            let row = SheetRow::from_record(
                tab_headers
                    .iter()
                    .map(String::as_str)
                    .zip(cells.iter().map(String::as_str)),
            );
            if row.id().is_empty() {
                continue;
            }
            let extra = tab_headers
                .iter()
                .zip(cells)
                .enumerate()
                .filter(|(_, (h, _))| Column::from_header(h).is_none())
                .map(|(position, (_, value))| (position, value))
                .collect();
            table.index.insert(row.id().to_string(), row_number);
            table.rows.insert(row_number, SheetEntry { row, extra });
        }
        Ok(table)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn get(&self, id: &str) -> Option<&SheetRow> {
        self.index
            .get(id)
            .and_then(|n| self.rows.get(n))
            .map(|entry| &entry.row)
    }

    pub fn len(&self) -> usize {
        self.rows.len() + self.pending_inserts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has_pending(&self) -> bool {
        self.write_headers || !self.pending_updates.is_empty() || !self.pending_inserts.is_empty()
    }

    pub fn write(&mut self, row: &SheetRow, mode: WriteMode) -> DomainResult<()> {
        let id = row.id();
        if id.is_empty() {
            return Err(DomainError::store("cannot write a row without an id"));
        }
        let pending_insert = self.pending_inserts.iter().position(|r| r.id() == id);

        match (mode, self.index.get(id).copied(), pending_insert) {
            (WriteMode::Insert, None, None) => self.pending_inserts.push(row.clone()),
            (WriteMode::Overwrite, Some(row_number), _) => {
                if let Some(entry) = self.rows.get_mut(&row_number) {
                    entry.row = row.clone();
                }
                self.pending_updates.insert(row_number);
            }
            (WriteMode::Overwrite, None, Some(slot)) => self.pending_inserts[slot] = row.clone(),
            (WriteMode::Insert, _, _) => {
                return Err(DomainError::store(format!("row '{}' already exists", id)));
            }
            (WriteMode::Overwrite, None, None) => {
                return Err(DomainError::store(format!("no row '{}' to overwrite", id)));
            }
        }
        Ok(())
    }

    /// Cells for the tab's header order, carrying non-schema cells through
    fn layout(&self, row: &SheetRow, extra: &BTreeMap<usize, String>) -> Vec<String> {
        self.headers
            .iter()
            .enumerate()
            .map(|(position, header)| match Column::from_header(header) {
                Some(column) => row.get(column).to_string(),
                None => extra.get(&position).cloned().unwrap_or_default(),
            })
            .collect()
    }

    /// Pending in-place updates as (A1 range, values) pairs
    pub fn update_batch(&self, tab: &str) -> Vec<(String, Vec<Vec<String>>)> {
        let mut batch = Vec::new();
        if self.write_headers {
            batch.push((format!("{}!A1", tab_range(tab)), vec![self.headers.clone()]));
        }
        for row_number in &self.pending_updates {
            if let Some(entry) = self.rows.get(row_number) {
                batch.push((
                    format!("{}!A{}", tab_range(tab), row_number),
                    vec![self.layout(&entry.row, &entry.extra)],
                ));
            }
        }
        batch
    }

    /// Pending inserts laid out for the tab's header order
    pub fn insert_batch(&self) -> Vec<Vec<String>> {
        let no_extra = BTreeMap::new();
        self.pending_inserts
            .iter()
            .map(|row| self.layout(row, &no_extra))
            .collect()
    }

    /// Mark pending writes as applied; appended rows land after the last
    /// non-empty row
    fn commit(&mut self) {
        self.write_headers = false;
        self.pending_updates.clear();
        for row in std::mem::take(&mut self.pending_inserts) {
            self.last_row += 1;
            self.index.insert(row.id().to_string(), self.last_row);
            self.rows.insert(
                self.last_row,
                SheetEntry {
                    row,
                    extra: BTreeMap::new(),
                },
            );
        }
    }
}

// =============================================================================
// GoogleSheetsStore - implements TransactionStore
// =============================================================================

pub struct GoogleSheetsStore {
    client: GoogleSheetsClient,
    tab: String,
    table: SheetTable,
}

impl GoogleSheetsStore {
    /// Read the tab and build the id index
    pub fn open(client: GoogleSheetsClient, tab: &str) -> DomainResult<Self> {
        let values = client
            .get_values(&tab_range(tab))
            .map_err(|e| DomainError::store(format!("{:#}", e)))?;
        let table = SheetTable::from_values(values)?;
        debug!(tab, rows = table.len(), "Loaded Google Sheets tab");

        Ok(Self {
            client,
            tab: tab.to_string(),
            table,
        })
    }
}

impl TransactionStore for GoogleSheetsStore {
    fn name(&self) -> &str {
        "google_sheets"
    }

    fn read_existing(&self, id: &str) -> DomainResult<Option<SheetRow>> {
        Ok(self.table.get(id).cloned().or_else(|| {
            self.table
                .pending_inserts
                .iter()
                .find(|r| r.id() == id)
                .cloned()
        }))
    }

    fn write(&mut self, row: &SheetRow, mode: WriteMode) -> DomainResult<()> {
        self.table.write(row, mode)
    }

    fn flush(&mut self) -> DomainResult<()> {
        if !self.table.has_pending() {
            return Ok(());
        }

        let updates = self.table.update_batch(&self.tab);
        let inserts = self.table.insert_batch();
        let (updated, inserted) = (updates.len(), inserts.len());

        self.client
            .batch_update(updates)
            .and_then(|_| self.client.append(&tab_range(&self.tab), inserts))
            .map_err(|e| DomainError::store(format!("{:#}", e)))?;

        self.table.commit();
        info!(tab = %self.tab, updated, inserted, "Flushed Google Sheets writes");
        Ok(())
    }

    fn row_count(&self) -> usize {
        self.table.len()
    }
}
