//! Categoriser - rule-based category assignment and transfer detection
//!
//! Rule precedence is decided by `priority` alone (lowest wins, ties go to the
//! rule listed first). Every rule is evaluated; the winner is the minimum over
//! the matches, so input order only matters for exact priority ties.

use serde::Serialize;
use tracing::warn;

use crate::domain::{AmountCondition, CategoryRule, TransactionFields};

/// Substrings (lowercase) that mark a movement between the user's own accounts
pub const TRANSFER_INDICATORS: &[&str] = &[
    "xfr",
    "tfr",
    "internal",
    "self transfer",
    "own account",
    "between accounts",
];

/// Category assignment for one transaction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Categorisation {
    pub category: String,
    pub category_type: String,
}

impl Categorisation {
    /// Sentinel for "no rule matched" - not an error
    pub fn uncategorised() -> Self {
        Self::default()
    }

    pub fn is_uncategorised(&self) -> bool {
        self.category.is_empty() && self.category_type.is_empty()
    }
}

#[derive(Debug, Clone)]
enum RuleCondition {
    Always,
    Amount(AmountCondition),
    /// Unparseable condition; the rule never matches
    Invalid,
}

#[derive(Debug, Clone)]
struct CompiledRule {
    rule: CategoryRule,
    pattern: String,
    condition: RuleCondition,
    /// Position in the configured list, for priority ties
    position: usize,
}

impl CompiledRule {
    fn matches(&self, fields: &TransactionFields<'_>) -> bool {
        if !fields.get(self.rule.field).to_lowercase().contains(&self.pattern) {
            return false;
        }
        match &self.condition {
            RuleCondition::Always => true,
            RuleCondition::Amount(cond) => fields.amount.is_some_and(|a| cond.matches(a)),
            RuleCondition::Invalid => false,
        }
    }
}

/// Evaluates categorisation rules and transfer heuristics
#[derive(Debug, Clone)]
pub struct Categoriser {
    rules: Vec<CompiledRule>,
    transfer_indicators: Vec<String>,
}

impl Categoriser {
    pub fn new(rules: Vec<CategoryRule>) -> Self {
        let rules = rules
            .into_iter()
            .enumerate()
            .map(|(position, rule)| {
                let condition = match rule.condition() {
                    Ok(Some(cond)) => RuleCondition::Amount(cond),
                    Ok(None) => RuleCondition::Always,
                    Err(e) => {
                        warn!(
                            pattern = %rule.pattern,
                            category = %rule.category,
                            error = %e,
                            "Rule has an invalid amount condition and will never match"
                        );
                        RuleCondition::Invalid
                    }
                };
                CompiledRule {
                    pattern: rule.pattern.to_lowercase(),
                    rule,
                    condition,
                    position,
                }
            })
            .collect();

        Self {
            rules,
            transfer_indicators: TRANSFER_INDICATORS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Add user-configured transfer indicators to the built-in set
    pub fn with_transfer_patterns<S: AsRef<str>>(mut self, patterns: &[S]) -> Self {
        for pattern in patterns {
            let pattern = pattern.as_ref().trim().to_lowercase();
            if !pattern.is_empty() && !self.transfer_indicators.contains(&pattern) {
                self.transfer_indicators.push(pattern);
            }
        }
        self
    }

    /// The winning rule for these fields, if any
    pub fn matched_rule(&self, fields: &TransactionFields<'_>) -> Option<&CategoryRule> {
        self.rules
            .iter()
            .filter(|r| r.matches(fields))
            .min_by_key(|r| (r.rule.priority, r.position))
            .map(|r| &r.rule)
    }

    pub fn categorise(&self, fields: &TransactionFields<'_>) -> Categorisation {
        match self.matched_rule(fields) {
            Some(rule) => Categorisation {
                category: rule.category.clone(),
                category_type: rule.category_type.clone(),
            },
            None => Categorisation::uncategorised(),
        }
    }

    /// True when any transfer indicator appears in the description or merchant.
    /// Independent of `categorise`.
    pub fn detect_transfer(&self, fields: &TransactionFields<'_>) -> bool {
        let description = fields.description_raw.to_lowercase();
        let merchant = fields.merchant_normalised.to_lowercase();
        self.transfer_indicators
            .iter()
            .any(|ind| description.contains(ind.as_str()) || merchant.contains(ind.as_str()))
    }

    /// Rules in evaluation precedence
    pub fn rules_by_precedence(&self) -> Vec<&CategoryRule> {
        let mut ordered: Vec<&CompiledRule> = self.rules.iter().collect();
        ordered.sort_by_key(|r| (r.rule.priority, r.position));
        ordered.into_iter().map(|r| &r.rule).collect()
    }

    /// Rules whose amount condition could not be parsed
    pub fn invalid_rules(&self) -> Vec<&CategoryRule> {
        self.rules
            .iter()
            .filter(|r| matches!(r.condition, RuleCondition::Invalid))
            .map(|r| &r.rule)
            .collect()
    }

    pub fn transfer_indicators(&self) -> &[String] {
        &self.transfer_indicators
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
