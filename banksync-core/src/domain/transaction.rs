//! Transaction domain model

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::domain::result::{Error, Result};
use crate::domain::row::{Column, SheetRow, FALSE_LITERAL, TRUE_LITERAL};
use crate::domain::rule::RuleField;

/// A bank transaction normalized from a provider payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Provider-unique id; the identity key for reconciliation
    pub id: String,
    /// Booking date
    pub date: NaiveDate,
    /// Human-readable account label supplied by the caller
    pub account: String,
    /// Negative = debit, positive = credit
    pub amount: Decimal,
    /// Running balance as reported by the provider; may be revised later
    pub balance: Decimal,
    pub description_raw: String,
    /// Provider merchant name, empty when absent
    pub merchant_normalised: String,
    /// Which provider / account link produced this record
    pub source: String,
}

impl Transaction {
    /// Normalize one raw provider payload.
    ///
    /// `_id`, `date` and `amount` are required; anything else missing falls
    /// back to an empty value (or zero for `balance`).
    pub fn from_payload(raw: &JsonValue, source: &str, account_name: &str) -> Result<Self> {
        let obj = raw
            .as_object()
            .ok_or_else(|| Error::malformed(None, "payload is not a JSON object"))?;

        let id = match obj.get("_id") {
            Some(JsonValue::String(s)) if !s.trim().is_empty() => s.clone(),
            Some(JsonValue::String(_)) => return Err(Error::malformed(None, "'_id' is empty")),
            Some(_) => return Err(Error::malformed(None, "'_id' is not a string")),
            None => return Err(Error::malformed(None, "missing field '_id'")),
        };

        let date = match obj.get("date") {
            Some(JsonValue::String(s)) => parse_date(s).ok_or_else(|| {
                Error::malformed(Some(&id), format!("unparseable date '{}'", s))
            })?,
            Some(_) => return Err(Error::malformed(Some(&id), "'date' is not a string")),
            None => return Err(Error::malformed(Some(&id), "missing field 'date'")),
        };

        let amount = match obj.get("amount") {
            Some(value) => json_decimal(value).ok_or_else(|| {
                Error::malformed(Some(&id), format!("'amount' is not numeric: {}", value))
            })?,
            None => return Err(Error::malformed(Some(&id), "missing field 'amount'")),
        };

        let balance = obj.get("balance").and_then(json_decimal).unwrap_or_default();

        let description_raw = obj
            .get("description")
            .and_then(JsonValue::as_str)
            .unwrap_or_default()
            .to_string();

        let merchant_normalised = obj
            .get("merchant")
            .and_then(|m| m.get("name"))
            .and_then(JsonValue::as_str)
            .unwrap_or_default()
            .to_string();

        Ok(Self {
            id,
            date,
            account: account_name.to_string(),
            amount,
            balance,
            description_raw,
            merchant_normalised,
            source: source.to_string(),
        })
    }

    /// Serialize into the persisted row schema
    pub fn to_row(
        &self,
        category: &str,
        category_type: &str,
        is_transfer: bool,
        imported_at: DateTime<Utc>,
    ) -> SheetRow {
        let mut row = SheetRow::default();
        row.set(Column::Id, self.id.as_str());
        row.set(Column::Date, self.date.format("%Y-%m-%d").to_string());
        row.set(Column::Account, self.account.as_str());
        row.set(Column::Amount, format_money(self.amount));
        row.set(Column::Balance, format_money(self.balance));
        row.set(Column::DescriptionRaw, self.description_raw.as_str());
        row.set(Column::MerchantNormalised, self.merchant_normalised.as_str());
        row.set(Column::Category, category);
        row.set(Column::CategoryType, category_type);
        row.set(
            Column::IsTransfer,
            if is_transfer { TRUE_LITERAL } else { FALSE_LITERAL },
        );
        row.set(Column::Source, self.source.as_str());
        row.set(Column::ImportedAt, format_timestamp(imported_at));
        row
    }

    /// Borrowed view used by the categoriser
    pub fn fields(&self) -> TransactionFields<'_> {
        TransactionFields {
            description_raw: &self.description_raw,
            merchant_normalised: &self.merchant_normalised,
            account: &self.account,
            source: &self.source,
            amount: Some(self.amount),
        }
    }
}

/// The text fields and amount a rule can look at.
///
/// Built from a `Transaction`, or by hand when previewing rules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransactionFields<'a> {
    pub description_raw: &'a str,
    pub merchant_normalised: &'a str,
    pub account: &'a str,
    pub source: &'a str,
    /// `None` when no amount was supplied or it could not be parsed
    pub amount: Option<Decimal>,
}

impl<'a> TransactionFields<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_merchant(mut self, merchant: &'a str) -> Self {
        self.merchant_normalised = merchant;
        self
    }

    pub fn with_description(mut self, description: &'a str) -> Self {
        self.description_raw = description;
        self
    }

    pub fn with_account(mut self, account: &'a str) -> Self {
        self.account = account;
        self
    }

    pub fn with_source(mut self, source: &'a str) -> Self {
        self.source = source;
        self
    }

    pub fn with_amount(mut self, amount: Decimal) -> Self {
        self.amount = Some(amount);
        self
    }

    /// Set the amount from its string form, e.g. `"-25.50"`
    pub fn with_amount_str(mut self, amount: &str) -> Self {
        self.amount = parse_amount(amount);
        self
    }

    /// Exact value of a field
    pub fn raw(&self, field: RuleField) -> &'a str {
        match field {
            RuleField::MerchantNormalised => self.merchant_normalised,
            RuleField::DescriptionRaw => self.description_raw,
            RuleField::Account => self.account,
            RuleField::Source => self.source,
        }
    }

    /// Value a categorisation rule matches against. An empty merchant falls
    /// back to the raw description.
    pub fn get(&self, field: RuleField) -> &'a str {
        match field {
            RuleField::MerchantNormalised if self.merchant_normalised.trim().is_empty() => {
                self.description_raw
            }
            other => self.raw(other),
        }
    }
}

/// Fixed two-decimal formatting used for amount and balance cells
pub fn format_money(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    // Avoid "-0.00"
    let rounded = if rounded.is_zero() { Decimal::ZERO } else { rounded };
    format!("{:.2}", rounded)
}

/// ISO-8601 with explicit UTC offset, e.g. `2025-11-15T10:00:00+00:00`
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, false)
}

/// Lenient amount parsing for user- or sheet-supplied strings.
///
/// Tolerates surrounding whitespace, a leading `+`, `$` and thousands commas.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| *c != ',' && *c != '$')
        .collect();
    let cleaned = cleaned.strip_prefix('+').unwrap_or(&cleaned);
    if cleaned.is_empty() {
        return None;
    }
    cleaned
        .parse::<Decimal>()
        .ok()
        .or_else(|| Decimal::from_scientific(cleaned).ok())
}

/// Accept `YYYY-MM-DD` or a full RFC 3339 timestamp (date taken in its own offset)
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

/// JSON number or numeric string to Decimal
fn json_decimal(value: &JsonValue) -> Option<Decimal> {
    match value {
        JsonValue::Number(n) => parse_amount(&n.to_string()),
        JsonValue::String(s) => parse_amount(s),
        _ => None,
    }
}
