//! Status service - sync state and configuration summary

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::adapters::state::SyncStateStore;
use crate::config::Config;
use crate::services::categoriser::Categoriser;
use crate::services::sync_window::SyncWindow;

/// Status service; never touches the network
pub struct StatusService {
    config: Config,
    state: SyncStateStore,
    dir: PathBuf,
}

impl StatusService {
    pub fn new(config: Config, state: SyncStateStore, dir: PathBuf) -> Self {
        Self { config, state, dir }
    }

    pub fn get_status(&self) -> Result<StatusSummary> {
        self.get_status_at(Utc::now())
    }

    pub fn get_status_at(&self, now: DateTime<Utc>) -> Result<StatusSummary> {
        let last_sync = self
            .state
            .last_sync()
            .context("Failed to read sync state")?;
        let next_window = SyncWindow::compute(
            last_sync,
            now,
            self.config.sync.lookback_buffer_days,
            self.config.sync.initial_sync_days,
        );
        let categoriser = Categoriser::new(self.config.rules.clone());

        Ok(StatusSummary {
            last_sync,
            next_window,
            store_kind: self.config.store.kind().to_string(),
            store_location: self.config.store.describe(&self.dir),
            accounts: self
                .config
                .accounts
                .iter()
                .map(|(id, link)| AccountSummary {
                    id: id.clone(),
                    name: link.name.clone(),
                    source: link.source.clone(),
                })
                .collect(),
            total_rules: self.config.rules.len(),
            invalid_rules: categoriser.invalid_rules().len(),
            total_ignore_rules: self.config.ignore_rules.len(),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct StatusSummary {
    pub last_sync: Option<DateTime<Utc>>,
    pub next_window: SyncWindow,
    pub store_kind: String,
    pub store_location: String,
    pub accounts: Vec<AccountSummary>,
    pub total_rules: usize,
    /// Rules with an unparseable amount condition
    pub invalid_rules: usize,
    pub total_ignore_rules: usize,
}

#[derive(Debug, Serialize)]
pub struct AccountSummary {
    pub id: String,
    pub name: String,
    pub source: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AccountLink;
    use crate::domain::CategoryRule;
    use crate::services::sync_window::{fetch_start, SyncKind};
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn test_status_before_and_after_first_sync() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.accounts.insert(
            "acc_1".to_string(),
            AccountLink {
                name: "Cheque".to_string(),
                source: "akahu_bnz".to_string(),
            },
        );
        config.rules = vec![
            CategoryRule::new("a", "A", "E", 1),
            CategoryRule::new("b", "B", "E", 2).with_amount_condition("lots"),
        ];
        let state = SyncStateStore::new(dir.path());
        let now = Utc.with_ymd_and_hms(2025, 11, 17, 12, 0, 0).unwrap();

        let service = StatusService::new(config, state.clone(), dir.path().to_path_buf());
        let status = service.get_status_at(now).unwrap();
        assert!(status.last_sync.is_none());
        assert_eq!(status.next_window.kind, SyncKind::Initial);
        assert_eq!(status.store_kind, "csv");
        assert_eq!(status.accounts[0].name, "Cheque");
        assert_eq!(status.total_rules, 2);
        assert_eq!(status.invalid_rules, 1);

        let last = Utc.with_ymd_and_hms(2025, 11, 16, 12, 0, 0).unwrap();
        state.record_sync(last).unwrap();
        let status = service.get_status_at(now).unwrap();
        assert_eq!(status.last_sync, Some(last));
        assert_eq!(status.next_window.start, fetch_start(&last, 3));
    }
}
