//! Sync service - one fetch / normalize / filter / categorise / reconcile pass

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::adapters::state::SyncStateStore;
use crate::config::{AccountLink, Config, SyncSettings};
use crate::domain::{IgnoreRule, Transaction};
use crate::ports::{TransactionProvider, TransactionStore, WriteMode};
use crate::services::categoriser::Categoriser;
use crate::services::reconcile::{dedupe_by_id, plan, RowAction};
use crate::services::sync_window::{SyncKind, SyncWindow};

/// Sync service for a single provider and store
pub struct SyncService {
    provider: Box<dyn TransactionProvider>,
    store: Box<dyn TransactionStore>,
    state: SyncStateStore,
    categoriser: Categoriser,
    ignore_rules: Vec<IgnoreRule>,
    accounts: BTreeMap<String, AccountLink>,
    settings: SyncSettings,
}

impl SyncService {
    pub fn new(
        provider: Box<dyn TransactionProvider>,
        store: Box<dyn TransactionStore>,
        state: SyncStateStore,
        config: &Config,
    ) -> Self {
        let categoriser =
            Categoriser::new(config.rules.clone()).with_transfer_patterns(&config.transfer_patterns);
        Self {
            provider,
            store,
            state,
            categoriser,
            ignore_rules: config.ignore_rules.clone(),
            accounts: config.accounts.clone(),
            settings: config.sync.clone(),
        }
    }

    pub fn store(&self) -> &dyn TransactionStore {
        self.store.as_ref()
    }

    /// Hand the store back, e.g. to run a pass under different rules
    pub fn into_store(self) -> Box<dyn TransactionStore> {
        self.store
    }

    /// The window a sync starting at `now` would fetch
    pub fn window_at(&self, now: DateTime<Utc>) -> Result<SyncWindow> {
        let last_sync = self
            .state
            .last_sync()
            .context("Failed to read sync state")?;
        Ok(SyncWindow::compute(
            last_sync,
            now,
            self.settings.lookback_buffer_days,
            self.settings.initial_sync_days,
        ))
    }

    pub fn sync(&mut self, dry_run: bool) -> Result<SyncResult> {
        self.sync_at(Utc::now(), dry_run)
    }

    /// Run one batch pass as of `now`.
    ///
    /// Per-transaction problems are counted and reported; only a failed
    /// fetch, state read or store flush aborts the run.
    pub fn sync_at(&mut self, now: DateTime<Utc>, dry_run: bool) -> Result<SyncResult> {
        let window = self.window_at(now)?;
        info!(
            provider = self.provider.name(),
            store = self.store.name(),
            kind = %window.kind,
            start = %window.start,
            end = %window.end,
            dry_run,
            "Starting sync"
        );

        let fetched = self
            .provider
            .fetch_transactions(window.start, window.end)
            .with_context(|| format!("Failed to fetch transactions from {}", self.provider.name()))?;

        let mut stats = TransactionStats {
            discovered: fetched.payloads.len(),
            ..Default::default()
        };
        let mut warnings = fetched.warnings;
        let mut changes = Vec::new();

        // Normalize, mapping provider accounts to configured labels
        let mut unknown_accounts = BTreeSet::new();
        let mut transactions = Vec::with_capacity(fetched.payloads.len());
        for raw in &fetched.payloads {
            let Some(link) = self.accounts.get(&raw.account_id) else {
                stats.skipped += 1;
                unknown_accounts.insert(raw.account_id.clone());
                continue;
            };
            match Transaction::from_payload(&raw.payload, &link.source, &link.name) {
                Ok(tx) => transactions.push(tx),
                Err(e) => {
                    warn!(account = %raw.account_id, error = %e, "Skipping malformed payload");
                    stats.malformed += 1;
                    warnings.push(e.to_string());
                }
            }
        }
        for account in unknown_accounts {
            warn!(account = %account, "Skipping transactions for unconfigured account");
            warnings.push(format!(
                "Account '{}' is not configured - its transactions were skipped",
                account
            ));
        }

        let (transactions, collisions) = dedupe_by_id(transactions);
        warnings.extend(collisions);

        for tx in transactions {
            if let Some(rule) = self.ignore_rules.iter().find(|r| r.matches(&tx)) {
                debug!(id = %tx.id, pattern = %rule.pattern, "Ignored");
                stats.ignored += 1;
                continue;
            }

            let fields = tx.fields();
            let categorisation = self.categoriser.categorise(&fields);
            let is_transfer = self.categoriser.detect_transfer(&fields);
            let fresh = tx.to_row(
                &categorisation.category,
                &categorisation.category_type,
                is_transfer,
                now,
            );

            let existing = match self.store.read_existing(&tx.id) {
                Ok(existing) => existing,
                Err(e) => {
                    warn!(id = %tx.id, error = %e, "Failed to read existing row");
                    stats.failed += 1;
                    warnings.push(format!("{}: {}", tx.id, e));
                    continue;
                }
            };

            let (mode, row, change) = match plan(existing.as_ref(), fresh) {
                RowAction::Unchanged => {
                    debug!(id = %tx.id, "Unchanged");
                    stats.unchanged += 1;
                    continue;
                }
                RowAction::Insert(row) => {
                    debug!(id = %tx.id, category = %categorisation.category, "Insert");
                    let change = RowChange::new(&tx.id, ChangeKind::Insert, Vec::new());
                    (WriteMode::Insert, row, change)
                }
                RowAction::Overwrite { row, changed } => {
                    let columns: Vec<String> = changed.iter().map(|c| c.to_string()).collect();
                    debug!(id = %tx.id, changed = ?columns, "Overwrite");
                    let change = RowChange::new(&tx.id, ChangeKind::Overwrite, columns);
                    (WriteMode::Overwrite, row, change)
                }
            };

            if !dry_run {
                if let Err(e) = self.store.write(&row, mode) {
                    warn!(id = %tx.id, error = %e, "Failed to write row");
                    stats.failed += 1;
                    warnings.push(format!("{}: {}", tx.id, e));
                    continue;
                }
            }
            match mode {
                WriteMode::Insert => stats.inserted += 1,
                WriteMode::Overwrite => stats.updated += 1,
            }
            changes.push(change);
        }

        let mut last_sync_advanced = false;
        if !dry_run {
            self.store
                .flush()
                .with_context(|| format!("Failed to save rows to {}", self.store.name()))?;

            if stats.failed == 0 {
                self.state
                    .record_sync(now)
                    .context("Failed to record sync state")?;
                last_sync_advanced = true;
            } else {
                warnings.push(format!(
                    "{} transaction(s) failed; last sync time was not advanced",
                    stats.failed
                ));
            }
        }

        info!(
            discovered = stats.discovered,
            inserted = stats.inserted,
            updated = stats.updated,
            unchanged = stats.unchanged,
            ignored = stats.ignored,
            malformed = stats.malformed,
            failed = stats.failed,
            "Sync finished"
        );

        Ok(SyncResult {
            provider: self.provider.name().to_string(),
            store: self.store.name().to_string(),
            sync_type: window.kind,
            start: window.start,
            end: window.end,
            dry_run,
            last_sync_advanced,
            stats,
            changes,
            warnings,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct SyncResult {
    pub provider: String,
    pub store: String,
    pub sync_type: SyncKind,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub dry_run: bool,
    pub last_sync_advanced: bool,
    pub stats: TransactionStats,
    /// Inserts and overwrites (planned ones, for a dry run)
    pub changes: Vec<RowChange>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionStats {
    /// Payloads returned by the provider
    pub discovered: usize,
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub ignored: usize,
    pub malformed: usize,
    /// Payloads for accounts missing from the config
    pub skipped: usize,
    /// Store read/write errors
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Insert,
    Overwrite,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowChange {
    pub id: String,
    pub kind: ChangeKind,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub changed_columns: Vec<String>,
}

impl RowChange {
    fn new(id: &str, kind: ChangeKind, changed_columns: Vec<String>) -> Self {
        Self {
            id: id.to_string(),
            kind,
            changed_columns,
        }
    }
}
