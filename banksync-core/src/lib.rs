//! banksync core - reconcile bank transactions into a spreadsheet
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Transactions, persisted rows, categorisation and ignore rules
//! - **ports**: Trait definitions for external dependencies (provider, store)
//! - **services**: Categoriser, reconciliation, sync window and the sync pass
//! - **adapters**: Concrete implementations (Akahu, CSV, Google Sheets, memory)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod services;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use adapters::akahu::AkahuProvider;
use adapters::csv_store::CsvSheetStore;
use adapters::sheets::{GoogleSheetsClient, GoogleSheetsStore};
use adapters::state::SyncStateStore;
use config::{Config, Credentials, StoreSettings};
use ports::{TransactionProvider, TransactionStore};
use services::{Categoriser, StatusService, SyncService};

// Re-export commonly used types at crate root
pub use domain::result::Error;
pub use domain::{CategoryRule, IgnoreRule, SheetRow, Transaction};

/// Main context for banksync operations
///
/// Holds the loaded configuration and credentials. Configuration problems
/// surface here, before any transaction is processed. Network-backed
/// collaborators are only built when a command needs them.
pub struct BankSyncContext {
    pub dir: PathBuf,
    pub config: Config,
    pub credentials: Credentials,
    pub status_service: StatusService,
}

impl BankSyncContext {
    /// Create a context with credentials from the environment
    pub fn new(dir: &Path) -> Result<Self> {
        Self::with_credentials(dir, Credentials::from_env())
    }

    pub fn with_credentials(dir: &Path, credentials: Credentials) -> Result<Self> {
        let config = Config::load(dir)
            .with_context(|| format!("Failed to load settings from {}", dir.display()))?;
        let status_service =
            StatusService::new(config.clone(), SyncStateStore::new(dir), dir.to_path_buf());

        Ok(Self {
            dir: dir.to_path_buf(),
            config,
            credentials,
            status_service,
        })
    }

    pub fn state_store(&self) -> SyncStateStore {
        SyncStateStore::new(&self.dir)
    }

    /// Categoriser for the configured rules and transfer patterns
    pub fn categoriser(&self) -> Categoriser {
        Categoriser::new(self.config.rules.clone())
            .with_transfer_patterns(&self.config.transfer_patterns)
    }

    pub fn open_provider(&self) -> Result<Box<dyn TransactionProvider>> {
        let (app_token, user_token) = self.credentials.akahu()?;
        let provider = AkahuProvider::from_tokens(app_token, user_token)?;
        Ok(Box::new(provider))
    }

    pub fn open_store(&self) -> Result<Box<dyn TransactionStore>> {
        match &self.config.store {
            StoreSettings::Csv { path } => {
                let path = self.dir.join(path);
                let store = CsvSheetStore::open(&path)
                    .with_context(|| format!("Failed to open {}", path.display()))?;
                Ok(Box::new(store))
            }
            StoreSettings::GoogleSheets {
                spreadsheet_id,
                tab,
            } => {
                let token = self.credentials.google()?;
                let client = GoogleSheetsClient::new(token, spreadsheet_id)?;
                let store = GoogleSheetsStore::open(client, tab)
                    .with_context(|| format!("Failed to open sheet tab '{}'", tab))?;
                Ok(Box::new(store))
            }
        }
    }

    /// Sync service wired to the configured provider and store
    pub fn sync_service(&self) -> Result<SyncService> {
        let provider = self.open_provider()?;
        let store = self.open_store()?;
        Ok(SyncService::new(provider, store, self.state_store(), &self.config))
    }
}
