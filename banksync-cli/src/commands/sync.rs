//! Sync command - fetch and reconcile one window of transactions

use anyhow::Result;
use colored::Colorize;

use banksync_core::services::{ChangeKind, SyncKind};

use super::get_context;
use crate::output::{self, format_local};

pub fn run(dry_run: bool, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let mut service = ctx.sync_service()?;
    let result = service.sync(dry_run)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    if dry_run {
        println!("{}", "DRY RUN - No changes applied".yellow());
        println!();
    }

    println!("{} {} -> {}", "Synced:".green(), result.provider, result.store);
    match result.sync_type {
        SyncKind::Incremental => println!(
            "  Syncing transactions since {} (with {}-day lookback)",
            format_local(result.start),
            ctx.config.sync.lookback_buffer_days
        ),
        SyncKind::Initial => println!(
            "  Initial sync: {} to {}",
            format_local(result.start),
            format_local(result.end)
        ),
    }

    let stats = &result.stats;
    println!("  Transaction breakdown:");
    println!("    Discovered: {}", stats.discovered);
    println!("    New: {}", stats.inserted);
    println!("    Updated: {}", stats.updated);
    println!("    Unchanged: {}", stats.unchanged);
    println!("    Ignored: {}", stats.ignored);
    if stats.skipped > 0 {
        println!("    Skipped: {} (unconfigured account)", stats.skipped);
    }
    if stats.malformed > 0 {
        println!("    Malformed: {}", stats.malformed.to_string().yellow());
    }
    if stats.failed > 0 {
        println!("    Failed: {}", stats.failed.to_string().red());
    }

    let overwrites: Vec<_> = result
        .changes
        .iter()
        .filter(|c| c.kind == ChangeKind::Overwrite)
        .collect();
    if !overwrites.is_empty() {
        println!();
        println!("{}", "Updated rows".bold());
        for change in overwrites {
            println!("  {} ({})", change.id, change.changed_columns.join(", "));
        }
    }

    if !result.warnings.is_empty() {
        println!();
        for warning in &result.warnings {
            output::warning(&format!("Warning: {}", warning));
        }
    }

    Ok(())
}
