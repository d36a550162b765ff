//! Configuration management
//!
//! Settings live in `<dir>/settings.json`:
//! ```json
//! {
//!   "accounts": { "acc_xxx": { "name": "Cheque", "source": "akahu_bnz" } },
//!   "sync": { "lookback_buffer_days": 3, "initial_sync_days": 90 },
//!   "store": { "kind": "csv", "path": "transactions.csv" },
//!   "rules": [ ... ],
//!   "ignore_rules": [ ... ],
//!   "transfer_patterns": [ ... ]
//! }
//! ```
//!
//! Credentials are never stored here; they come from the environment.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::result::{Error, Result};
use crate::domain::{CategoryRule, IgnoreRule};

pub const SETTINGS_FILE: &str = "settings.json";

pub const AKAHU_APP_TOKEN_ENV: &str = "AKAHU_APP_TOKEN";
pub const AKAHU_USER_TOKEN_ENV: &str = "AKAHU_USER_TOKEN";
pub const GOOGLE_SHEETS_TOKEN_ENV: &str = "GOOGLE_SHEETS_ACCESS_TOKEN";

/// Label and source tag for one provider account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountLink {
    /// Written to the `account` column
    pub name: String,
    /// Written to the `source` column, e.g. "akahu_bnz"
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    pub lookback_buffer_days: u16,
    /// Reach of the first sync, when no state is recorded
    pub initial_sync_days: u16,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            lookback_buffer_days: 3,
            initial_sync_days: 90,
        }
    }
}

fn default_csv_path() -> PathBuf {
    PathBuf::from("transactions.csv")
}

fn default_tab() -> String {
    "Transactions".to_string()
}

/// Where persisted rows live
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoreSettings {
    Csv {
        /// Relative paths resolve against the config directory
        #[serde(default = "default_csv_path")]
        path: PathBuf,
    },
    GoogleSheets {
        spreadsheet_id: String,
        #[serde(default = "default_tab")]
        tab: String,
    },
}

impl Default for StoreSettings {
    fn default() -> Self {
        StoreSettings::Csv {
            path: default_csv_path(),
        }
    }
}

impl StoreSettings {
    pub fn kind(&self) -> &'static str {
        match self {
            StoreSettings::Csv { .. } => "csv",
            StoreSettings::GoogleSheets { .. } => "google_sheets",
        }
    }

    /// Human-readable location, e.g. for `status`
    pub fn describe(&self, dir: &Path) -> String {
        match self {
            StoreSettings::Csv { path } => dir.join(path).display().to_string(),
            StoreSettings::GoogleSheets {
                spreadsheet_id,
                tab,
            } => format!("{} / {}", spreadsheet_id, tab),
        }
    }
}

/// banksync configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Provider account id -> label
    pub accounts: BTreeMap<String, AccountLink>,
    pub sync: SyncSettings,
    pub store: StoreSettings,
    pub rules: Vec<CategoryRule>,
    pub ignore_rules: Vec<IgnoreRule>,
    /// Extra transfer indicators on top of the built-in set
    pub transfer_patterns: Vec<String>,
}

impl Config {
    /// Load config from the banksync directory. A missing file yields defaults;
    /// a malformed one is fatal.
    pub fn load(dir: &Path) -> Result<Self> {
        let settings_path = dir.join(SETTINGS_FILE);

        if !settings_path.exists() {
            debug!(path = %settings_path.display(), "No settings file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&settings_path)?;
        let config: Config = serde_json::from_str(&content).map_err(|e| {
            Error::config(format!("{}: {}", settings_path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to the banksync directory
    pub fn save(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(dir.join(SETTINGS_FILE), content)?;
        Ok(())
    }

    /// Shape checks that serde cannot express
    pub fn validate(&self) -> Result<()> {
        for (id, link) in &self.accounts {
            if link.name.trim().is_empty() {
                return Err(Error::config(format!("account '{}' has an empty name", id)));
            }
        }
        for (i, rule) in self.rules.iter().enumerate() {
            if rule.pattern.trim().is_empty() {
                return Err(Error::config(format!("rule #{} has an empty pattern", i + 1)));
            }
        }
        for rule in &self.ignore_rules {
            rule.validate()?;
        }
        if let StoreSettings::GoogleSheets { spreadsheet_id, .. } = &self.store {
            if spreadsheet_id.trim().is_empty() {
                return Err(Error::config("google_sheets store needs a spreadsheet_id"));
            }
        }
        Ok(())
    }

    pub fn account(&self, provider_account_id: &str) -> Option<&AccountLink> {
        self.accounts.get(provider_account_id)
    }
}

/// Secrets read from the environment
#[derive(Clone, Default)]
pub struct Credentials {
    pub akahu_app_token: Option<String>,
    pub akahu_user_token: Option<String>,
    pub google_access_token: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mask = |v: &Option<String>| if v.is_some() { "<set>" } else { "<unset>" };
        f.debug_struct("Credentials")
            .field("akahu_app_token", &mask(&self.akahu_app_token))
            .field("akahu_user_token", &mask(&self.akahu_user_token))
            .field("google_access_token", &mask(&self.google_access_token))
            .finish()
    }
}

impl Credentials {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; blank values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            akahu_app_token: get(AKAHU_APP_TOKEN_ENV),
            akahu_user_token: get(AKAHU_USER_TOKEN_ENV),
            google_access_token: get(GOOGLE_SHEETS_TOKEN_ENV),
        }
    }

    /// (app token, user token)
    pub fn akahu(&self) -> Result<(&str, &str)> {
        let app = self
            .akahu_app_token
            .as_deref()
            .ok_or_else(|| Error::config(format!("{} is not set", AKAHU_APP_TOKEN_ENV)))?;
        let user = self
            .akahu_user_token
            .as_deref()
            .ok_or_else(|| Error::config(format!("{} is not set", AKAHU_USER_TOKEN_ENV)))?;
        Ok((app, user))
    }

    pub fn google(&self) -> Result<&str> {
        self.google_access_token
            .as_deref()
            .ok_or_else(|| Error::config(format!("{} is not set", GOOGLE_SHEETS_TOKEN_ENV)))
    }
}
