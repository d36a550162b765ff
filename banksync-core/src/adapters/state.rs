//! Sync state persistence (`state.json`)

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::result::Result;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncState {
    /// Start instant of the last successful, non-dry-run sync
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync: Option<DateTime<Utc>>,
}

/// Reads and writes `<dir>/state.json`
#[derive(Debug, Clone)]
pub struct SyncStateStore {
    path: PathBuf,
}

impl SyncStateStore {
    pub const FILE_NAME: &'static str = "state.json";

    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join(Self::FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing file means "never synced"
    pub fn load(&self) -> Result<SyncState> {
        if !self.path.exists() {
            return Ok(SyncState::default());
        }
        let content = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, state: &SyncState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(state)?;
        fs::write(&self.path, content)?;
        Ok(())
    }

    pub fn last_sync(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self.load()?.last_sync)
    }

    pub fn record_sync(&self, at: DateTime<Utc>) -> Result<()> {
        let mut state = self.load()?;
        state.last_sync = Some(at);
        self.save(&state)
    }
}
