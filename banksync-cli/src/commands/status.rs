//! Status command - sync state and configuration summary

use anyhow::Result;
use colored::Colorize;

use super::get_context;
use crate::output::{create_table, format_local};

pub fn run(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let status = ctx.status_service.get_status()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("{}", "Sync Status".bold());
    println!();

    let last_sync = status
        .last_sync
        .map(format_local)
        .unwrap_or_else(|| "never".to_string());
    let window = format!(
        "{} ({} to {})",
        status.next_window.kind,
        format_local(status.next_window.start),
        format_local(status.next_window.end)
    );

    let mut table = create_table();
    table.add_row(vec!["Last sync", &last_sync]);
    table.add_row(vec!["Next window", &window]);
    table.add_row(vec!["Store", &format!("{} ({})", status.store_location, status.store_kind)]);
    table.add_row(vec!["Rules", &status.total_rules.to_string()]);
    table.add_row(vec!["Ignore rules", &status.total_ignore_rules.to_string()]);
    println!("{}", table);
    println!();

    if status.invalid_rules > 0 {
        println!(
            "{}",
            format!(
                "{} rule(s) have an invalid amount condition and never match. See 'banksync rules list'.",
                status.invalid_rules
            )
            .yellow()
        );
        println!();
    }

    if status.accounts.is_empty() {
        println!(
            "{}",
            "No accounts configured. Add them under \"accounts\" in settings.json.".yellow()
        );
    } else {
        println!("{}", "Accounts".bold());
        for account in &status.accounts {
            println!("  • {} [{}] ({})", account.name, account.source, account.id);
        }
    }

    Ok(())
}
