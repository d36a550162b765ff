//! Categorisation rule domain entities

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::result::{Error, Result};

/// Transaction field a rule pattern is matched against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleField {
    /// Provider merchant name; falls back to the raw description when empty
    #[default]
    #[serde(alias = "merchant")]
    MerchantNormalised,
    #[serde(alias = "description")]
    DescriptionRaw,
    Account,
    Source,
}

impl RuleField {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleField::MerchantNormalised => "merchant_normalised",
            RuleField::DescriptionRaw => "description_raw",
            RuleField::Account => "account",
            RuleField::Source => "source",
        }
    }
}

impl fmt::Display for RuleField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A categorisation directive loaded from configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRule {
    /// Case-insensitive substring to look for
    pub pattern: String,
    #[serde(default)]
    pub field: RuleField,
    pub category: String,
    pub category_type: String,
    /// Lower value wins among matching rules
    pub priority: i64,
    /// Comparator on the absolute amount, e.g. ">20" or "<=5"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_condition: Option<String>,
}

impl CategoryRule {
    pub fn new(
        pattern: impl Into<String>,
        category: impl Into<String>,
        category_type: impl Into<String>,
        priority: i64,
    ) -> Self {
        Self {
            pattern: pattern.into(),
            field: RuleField::default(),
            category: category.into(),
            category_type: category_type.into(),
            priority,
            amount_condition: None,
        }
    }

    pub fn with_field(mut self, field: RuleField) -> Self {
        self.field = field;
        self
    }

    pub fn with_amount_condition(mut self, condition: impl Into<String>) -> Self {
        self.amount_condition = Some(condition.into());
        self
    }

    /// Parse the amount condition. `Ok(None)` means the rule is unconditional.
    pub fn condition(&self) -> Result<Option<AmountCondition>> {
        match self.amount_condition.as_deref() {
            Some(raw) => AmountCondition::parse(raw),
            None => Ok(None),
        }
    }
}

/// Comparison operator of an amount condition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Gt,
    Lt,
    Ge,
    Le,
    Eq,
}

impl Comparator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Comparator::Gt => ">",
            Comparator::Lt => "<",
            Comparator::Ge => ">=",
            Comparator::Le => "<=",
            Comparator::Eq => "==",
        }
    }

    fn from_symbol(s: &str) -> Option<Self> {
        match s {
            ">" => Some(Comparator::Gt),
            "<" => Some(Comparator::Lt),
            ">=" => Some(Comparator::Ge),
            "<=" => Some(Comparator::Le),
            "==" => Some(Comparator::Eq),
            _ => None,
        }
    }
}

/// Parsed `amount_condition`, always evaluated against the absolute amount
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmountCondition {
    pub comparator: Comparator,
    pub threshold: Decimal,
}

fn condition_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(>=|<=|==|>|<)\s*([+-]?\d+(?:\.\d+)?)\s*$")
            .expect("amount condition pattern is valid")
    })
}

impl AmountCondition {
    /// Parse a condition string. Blank input means "no condition".
    pub fn parse(raw: &str) -> Result<Option<Self>> {
        if raw.trim().is_empty() {
            return Ok(None);
        }

        let caps = condition_regex()
            .captures(raw)
            .ok_or_else(|| {
                Error::invalid_condition(raw, "expected one of >, <, >=, <=, == followed by a number")
            })?;

        let comparator = Comparator::from_symbol(&caps[1])
            .ok_or_else(|| Error::invalid_condition(raw, "unknown operator"))?;
        let threshold = caps[2]
            .parse::<Decimal>()
            .map_err(|e| Error::invalid_condition(raw, e.to_string()))?;

        Ok(Some(Self {
            comparator,
            threshold,
        }))
    }

    /// Evaluate against the absolute value of `amount`
    pub fn matches(&self, amount: Decimal) -> bool {
        let value = amount.abs();
        match self.comparator {
            Comparator::Gt => value > self.threshold,
            Comparator::Lt => value < self.threshold,
            Comparator::Ge => value >= self.threshold,
            Comparator::Le => value <= self.threshold,
            Comparator::Eq => value == self.threshold,
        }
    }
}

impl fmt::Display for AmountCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.comparator.symbol(), self.threshold)
    }
}
