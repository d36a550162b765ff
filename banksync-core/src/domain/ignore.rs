//! Ignore rules - suppress noise transactions before categorisation

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::result::{Error, Result};
use crate::domain::rule::RuleField;
use crate::domain::Transaction;

/// Drops small transactions whose field contains `pattern`, e.g. monthly
/// interest adjustments of a few cents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IgnoreRule {
    /// Case-insensitive substring
    pub pattern: String,
    pub field_name: RuleField,
    /// Ceiling on the absolute amount (inclusive)
    pub max_amount: Decimal,
}

impl IgnoreRule {
    pub fn new(pattern: impl Into<String>, field_name: RuleField, max_amount: Decimal) -> Self {
        Self {
            pattern: pattern.into(),
            field_name,
            max_amount,
        }
    }

    /// Reject shapes that would silently ignore everything or nothing
    pub fn validate(&self) -> Result<()> {
        if self.pattern.trim().is_empty() {
            return Err(Error::config("ignore rule pattern cannot be empty"));
        }
        if self.max_amount.is_sign_negative() {
            return Err(Error::config(format!(
                "ignore rule '{}' has a negative max_amount",
                self.pattern
            )));
        }
        Ok(())
    }

    /// True when the named field contains the pattern and |amount| <= max_amount
    pub fn matches(&self, tx: &Transaction) -> bool {
        let haystack = tx.fields().raw(self.field_name).to_lowercase();
        haystack.contains(&self.pattern.to_lowercase()) && tx.amount.abs() <= self.max_amount
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_tx(id: &str, amount: Decimal, description: &str, merchant: &str) -> Transaction {
        Transaction {
            id: id.to_string(),
            date: NaiveDate::from_ymd_opt(2025, 11, 15).unwrap(),
            account: "Cheque".to_string(),
            amount,
            balance: Decimal::new(10000, 2),
            description_raw: description.to_string(),
            merchant_normalised: merchant.to_string(),
            source: "akahu_bnz".to_string(),
        }
    }

    fn interest_rule() -> IgnoreRule {
        IgnoreRule::new(
            "INTEREST ADJUSTMENT",
            RuleField::DescriptionRaw,
            Decimal::new(100, 2),
        )
    }

    #[test]
    fn test_small_matching_transaction_ignored() {
        let tx = make_tx("txn_1", Decimal::new(15, 2), "INTEREST ADJUSTMENT MONTHLY", "");
        assert!(interest_rule().matches(&tx));
    }

    #[test]
    fn test_amount_above_ceiling_kept() {
        let tx = make_tx("txn_2", Decimal::new(500, 2), "INTEREST ADJUSTMENT MONTHLY", "");
        assert!(!interest_rule().matches(&tx));
    }

    #[test]
    fn test_non_matching_pattern_kept() {
        let tx = make_tx("txn_3", Decimal::new(50, 2), "Coffee purchase", "Mojo Coffee");
        assert!(!interest_rule().matches(&tx));
    }

    #[test]
    fn test_boundary_and_negative_amounts() {
        let rule = interest_rule();
        let at_ceiling = make_tx("a", Decimal::new(100, 2), "interest adjustment", "");
        let debit = make_tx("b", Decimal::new(-40, 2), "Interest Adjustment", "");
        assert!(rule.matches(&at_ceiling));
        assert!(rule.matches(&debit));
    }

    #[test]
    fn test_field_is_matched_exactly() {
        // The pattern is in the description, but the rule targets the merchant
        let rule = IgnoreRule::new("interest", RuleField::MerchantNormalised, Decimal::ONE);
        let tx = make_tx("c", Decimal::new(10, 2), "INTEREST", "");
        assert!(!rule.matches(&tx));
    }

    #[test]
    fn test_validate() {
        assert!(interest_rule().validate().is_ok());
        assert!(IgnoreRule::new(" ", RuleField::DescriptionRaw, Decimal::ONE)
            .validate()
            .is_err());
        assert!(IgnoreRule::new("x", RuleField::DescriptionRaw, Decimal::NEGATIVE_ONE)
            .validate()
            .is_err());
    }

    #[test]
    fn test_deserialize_numeric_max_amount() {
        let rule: IgnoreRule = serde_json::from_str(
            r#"{"pattern": "INTEREST ADJUSTMENT", "field_name": "description_raw", "max_amount": 1.00}"#,
        )
        .unwrap();
        assert_eq!(rule, interest_rule());
    }
}
