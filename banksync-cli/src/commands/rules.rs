//! Rules command - list rules and dry-run categorisation

use anyhow::{bail, Result};
use clap::Subcommand;
use colored::Colorize;
use rust_decimal::Decimal;
use serde::Serialize;

use banksync_core::domain::{parse_amount, TransactionFields};

use super::get_context;
use crate::output::{create_table, or_dash};

#[derive(Subcommand)]
pub enum RulesCommands {
    /// List rules in the order they are evaluated
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show which rule would categorise a transaction
    Test {
        /// Merchant name
        #[arg(long)]
        merchant: Option<String>,
        /// Raw bank description
        #[arg(long)]
        description: Option<String>,
        /// Account label, for rules on the `account` field
        #[arg(long)]
        account: Option<String>,
        /// Source tag, for rules on the `source` field
        #[arg(long)]
        source: Option<String>,
        /// Signed amount, e.g. -25.50
        #[arg(long, allow_hyphen_values = true)]
        amount: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(command: RulesCommands) -> Result<()> {
    match command {
        RulesCommands::List { json } => list(json),
        RulesCommands::Test {
            merchant,
            description,
            account,
            source,
            amount,
            json,
        } => test(
            TestInput {
                merchant,
                description,
                account,
                source,
                amount,
            },
            json,
        ),
    }
}

fn list(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let categoriser = ctx.categoriser();
    let rules = categoriser.rules_by_precedence();

    if json {
        println!("{}", serde_json::to_string_pretty(&rules)?);
        return Ok(());
    }

    if rules.is_empty() {
        println!("{}", "No rules configured. Add them under \"rules\" in settings.json.".yellow());
        return Ok(());
    }

    let mut table = create_table();
    table.set_header(vec!["Priority", "Field", "Pattern", "Amount", "Category", "Type"]);
    for rule in &rules {
        let condition = rule.amount_condition.as_deref().unwrap_or("");
        let condition = match rule.condition() {
            Ok(_) => or_dash(condition).to_string(),
            Err(_) => format!("{} (invalid)", condition),
        };
        table.add_row(vec![
            rule.priority.to_string(),
            rule.field.as_str().to_string(),
            rule.pattern.clone(),
            condition,
            rule.category.clone(),
            or_dash(&rule.category_type).to_string(),
        ]);
    }
    println!("{}", table);

    let invalid = categoriser.invalid_rules().len();
    if invalid > 0 {
        println!();
        println!(
            "{}",
            format!("{} rule(s) have an invalid amount condition and never match.", invalid).yellow()
        );
    }

    Ok(())
}

#[derive(Serialize)]
struct TestOutcome {
    category: String,
    category_type: String,
    matched_pattern: Option<String>,
    matched_priority: Option<i64>,
    is_transfer: bool,
}

struct TestInput {
    merchant: Option<String>,
    description: Option<String>,
    account: Option<String>,
    source: Option<String>,
    amount: Option<String>,
}

fn test(input: TestInput, json: bool) -> Result<()> {
    let TestInput {
        merchant,
        description,
        account,
        source,
        amount,
    } = input;
    if merchant.is_none() && description.is_none() && account.is_none() && source.is_none() {
        bail!("Provide at least one of --merchant, --description, --account, --source");
    }
    let amount: Option<Decimal> = match amount.as_deref() {
        Some(raw) => match parse_amount(raw) {
            Some(value) => Some(value),
            None => bail!("'{}' is not a valid amount", raw),
        },
        None => None,
    };

    let ctx = get_context()?;
    let categoriser = ctx.categoriser();

    let mut fields = TransactionFields::new()
        .with_merchant(merchant.as_deref().unwrap_or(""))
        .with_description(description.as_deref().unwrap_or(""))
        .with_account(account.as_deref().unwrap_or(""))
        .with_source(source.as_deref().unwrap_or(""));
    if let Some(value) = amount {
        fields = fields.with_amount(value);
    }

    let matched = categoriser.matched_rule(&fields);
    let categorisation = categoriser.categorise(&fields);
    let outcome = TestOutcome {
        category: categorisation.category,
        category_type: categorisation.category_type,
        matched_pattern: matched.map(|r| r.pattern.clone()),
        matched_priority: matched.map(|r| r.priority),
        is_transfer: categoriser.detect_transfer(&fields),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    match (&outcome.matched_pattern, outcome.matched_priority) {
        (Some(pattern), Some(priority)) => {
            println!("{} {}", "Category:".green(), outcome.category);
            println!("  Type: {}", or_dash(&outcome.category_type));
            println!("  Rule: '{}' (priority {})", pattern, priority);
        }
        _ => println!("{}", "No rule matched; the transaction stays uncategorised".yellow()),
    }
    println!("  Transfer: {}", if outcome.is_transfer { "yes" } else { "no" });

    Ok(())
}
