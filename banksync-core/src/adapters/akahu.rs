//! Akahu API client
//!
//! Fetches transactions for every account the user has connected to the
//! Akahu app. Items are passed through as raw JSON so that normalization (and
//! its per-record error isolation) happens in the sync service.
//!
//! API Documentation: https://developers.akahu.nz/reference/get_transactions

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::domain::result::{Error as DomainError, Result as DomainResult};
use crate::ports::{FetchTransactionsResult, RawPayload, TransactionProvider};

// =============================================================================
// API Response Models
// =============================================================================

/// One page of `GET /transactions`
#[derive(Debug, Clone, Deserialize)]
struct TransactionsPage {
    #[serde(default = "default_success")]
    success: bool,
    #[serde(default)]
    items: Vec<JsonValue>,
    #[serde(default)]
    cursor: Option<Cursor>,
    #[serde(default)]
    message: Option<String>,
}

fn default_success() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
struct Cursor {
    #[serde(default)]
    next: Option<String>,
}

// =============================================================================
// Akahu HTTP Client
// =============================================================================

/// Default production API URL
const AKAHU_PRODUCTION_URL: &str = "https://api.akahu.io/v1";

/// Environment variable to override the Akahu API base URL
pub const AKAHU_BASE_URL_ENV: &str = "AKAHU_BASE_URL";

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Upper bound on followed cursors, in case the API keeps returning one
const MAX_PAGES: usize = 500;

/// Get the Akahu base URL, checking environment variable first
pub fn get_base_url() -> String {
    std::env::var(AKAHU_BASE_URL_ENV).unwrap_or_else(|_| AKAHU_PRODUCTION_URL.to_string())
}

/// Akahu API client
#[derive(Debug)]
pub struct AkahuClient {
    client: Client,
    app_token: String,
    user_token: String,
    base_url: String,
}

impl AkahuClient {
    /// Create a new Akahu client.
    ///
    /// Uses the `AKAHU_BASE_URL` environment variable if set,
    /// otherwise defaults to the production API.
    pub fn new(app_token: &str, user_token: &str) -> Result<Self> {
        Self::new_with_base_url(app_token, user_token, &get_base_url())
    }

    pub fn new_with_base_url(app_token: &str, user_token: &str, base_url: &str) -> Result<Self> {
        if app_token.trim().is_empty() {
            anyhow::bail!("Akahu app token cannot be empty");
        }
        if user_token.trim().is_empty() {
            anyhow::bail!("Akahu user token cannot be empty");
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            app_token: app_token.to_string(),
            user_token: user_token.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch all transactions in `[start, end]`, following cursors
    pub fn get_transactions(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<FetchTransactionsResult> {
        let start = start.to_rfc3339_opts(SecondsFormat::Millis, true);
        let end = end.to_rfc3339_opts(SecondsFormat::Millis, true);

        let mut payloads = Vec::new();
        let mut warnings = Vec::new();
        let mut cursor: Option<String> = None;

        for page_number in 1..=MAX_PAGES {
            let page = self.fetch_page(&start, &end, cursor.as_deref())?;
            debug!(page = page_number, items = page.items.len(), "Fetched Akahu page");

            for item in page.items {
                let account = item
                    .get("_account")
                    .and_then(JsonValue::as_str)
                    .map(str::to_string);
                match account {
                    Some(account) => payloads.push(RawPayload::new(account, item)),
                    None => {
                        let id = item.get("_id").and_then(JsonValue::as_str).unwrap_or("?");
                        warnings.push(format!("Transaction {} has no '_account' - skipping", id));
                    }
                }
            }

            match page.cursor.and_then(|c| c.next) {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => return Ok(FetchTransactionsResult { payloads, warnings }),
            }
        }

        warn!(max_pages = MAX_PAGES, "Akahu pagination did not terminate");
        warnings.push(format!(
            "Stopped after {} pages; some transactions may be missing",
            MAX_PAGES
        ));
        Ok(FetchTransactionsResult { payloads, warnings })
    }

    fn fetch_page(&self, start: &str, end: &str, cursor: Option<&str>) -> Result<TransactionsPage> {
        let url = format!("{}/transactions", self.base_url);

        let mut query: Vec<(&str, &str)> = vec![("start", start), ("end", end)];
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor));
        }

        let response = self
            .client
            .get(&url)
            .query(&query)
            .bearer_auth(&self.user_token)
            .header("X-Akahu-Id", &self.app_token)
            .send()
            .map_err(|e| self.map_request_error(e))?;

        self.check_response_status(&response)?;

        let page: TransactionsPage = response
            .json()
            .context("Failed to parse Akahu transactions response")?;

        if !page.success {
            anyhow::bail!(
                "Akahu API reported failure: {}",
                page.message.as_deref().unwrap_or("no message")
            );
        }
        Ok(page)
    }

    /// Map request errors to user-friendly messages
    fn map_request_error(&self, error: reqwest::Error) -> anyhow::Error {
        if error.is_timeout() {
            anyhow::anyhow!("Connection timed out after {} seconds", REQUEST_TIMEOUT_SECS)
        } else if error.is_connect() {
            anyhow::anyhow!("Unable to connect to Akahu servers")
        } else {
            anyhow::anyhow!("Akahu request failed: {}", error)
        }
    }

    /// Check response status and return appropriate errors
    fn check_response_status(&self, response: &reqwest::blocking::Response) -> Result<()> {
        match response.status().as_u16() {
            200 => Ok(()),
            400 => anyhow::bail!("Akahu rejected the request. Check the sync date range."),
            401 => anyhow::bail!(
                "Akahu authentication failed. Your app or user token may be invalid or revoked."
            ),
            403 => anyhow::bail!(
                "Akahu access denied. The user has not granted this app access to transactions."
            ),
            429 => anyhow::bail!("Akahu rate limit exceeded. Please wait a moment and try again."),
            status @ 500..=599 => anyhow::bail!("Akahu server error: HTTP {}", status),
            status => anyhow::bail!("Akahu API error: HTTP {}", status),
        }
    }
}

// =============================================================================
// AkahuProvider - implements TransactionProvider
// =============================================================================

/// Akahu transaction provider
pub struct AkahuProvider {
    client: AkahuClient,
}

impl AkahuProvider {
    pub fn new(client: AkahuClient) -> Self {
        Self { client }
    }

    pub fn from_tokens(app_token: &str, user_token: &str) -> DomainResult<Self> {
        let client = AkahuClient::new(app_token, user_token)
            .map_err(|e| DomainError::provider(e.to_string()))?;
        Ok(Self::new(client))
    }
}

impl TransactionProvider for AkahuProvider {
    fn name(&self) -> &str {
        "akahu"
    }

    fn fetch_transactions(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<FetchTransactionsResult> {
        self.client
            .get_transactions(start, end)
            .map_err(|e| DomainError::provider(format!("{:#}", e)))
    }
}

// =============================================================================
// Tests
// =============================================================================
