//! CLI command implementations

pub mod rules;
pub mod status;
pub mod sync;

use std::path::PathBuf;

use anyhow::{Context, Result};
use banksync_core::BankSyncContext;

pub const DIR_ENV: &str = "BANKSYNC_DIR";

/// Get the banksync directory from environment or default
pub fn get_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }
    let home = dirs::home_dir().context("Could not find home directory; set BANKSYNC_DIR")?;
    Ok(home.join(".banksync"))
}

/// Load settings and credentials
pub fn get_context() -> Result<BankSyncContext> {
    let dir = get_dir()?;

    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create banksync directory: {}", dir.display()))?;

    BankSyncContext::new(&dir).context("Failed to initialize banksync context")
}
