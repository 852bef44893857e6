//! Referral commission arithmetic
//!
//! Standard commission is 2.5% of the final project value: 2.0% to the
//! referring member and 0.5% to the platform. Custom terms replace only the
//! referrer's portion. Commission is owed only once a referral completes.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Referrer share under standard terms (2.0%)
pub const STANDARD_REFERRER_RATE: Decimal = Decimal::from_parts(20, 0, 0, false, 3);

/// Platform share, fixed regardless of terms (0.5%)
pub const PLATFORM_RATE: Decimal = Decimal::from_parts(5, 0, 0, false, 3);

/// Commission agreement recorded on a referral
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommissionTerms {
    #[default]
    Standard,
    /// Negotiated referrer rate as a fraction, e.g. `0.03` for 3%
    Custom { referrer_rate: Decimal },
}

impl CommissionTerms {
    pub fn custom(referrer_rate: Decimal) -> Result<Self, String> {
        if referrer_rate.is_sign_negative() || referrer_rate > Decimal::ONE {
            return Err(format!(
                "referrer rate must be between 0 and 1, got {referrer_rate}"
            ));
        }
        Ok(CommissionTerms::Custom { referrer_rate })
    }

    pub fn referrer_rate(&self) -> Decimal {
        match self {
            CommissionTerms::Standard => STANDARD_REFERRER_RATE,
            CommissionTerms::Custom { referrer_rate } => *referrer_rate,
        }
    }

    /// Split a project value into referrer and platform amounts, rounded to cents
    pub fn breakdown(&self, project_value: Decimal) -> CommissionBreakdown {
        let referrer_amount = (project_value * self.referrer_rate()).round_dp(2);
        let platform_amount = (project_value * PLATFORM_RATE).round_dp(2);
        CommissionBreakdown {
            project_value,
            referrer_rate: self.referrer_rate(),
            platform_rate: PLATFORM_RATE,
            referrer_amount,
            platform_amount,
            total: referrer_amount + platform_amount,
        }
    }
}

/// Computed commission amounts for one referral
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionBreakdown {
    pub project_value: Decimal,
    pub referrer_rate: Decimal,
    pub platform_rate: Decimal,
    pub referrer_amount: Decimal,
    pub platform_amount: Decimal,
    pub total: Decimal,
}

/// Parse a currency amount as typed by an admin, e.g. `"$125,000"` or `"98500.50"`.
pub fn parse_currency(input: &str) -> Result<Decimal, String> {
    let trimmed = input.trim();
    let digits: String = trimmed
        .strip_prefix('$')
        .unwrap_or(trimmed)
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();

    if digits.is_empty() {
        return Err("amount is empty".to_string());
    }

    let amount = Decimal::from_str(&digits).map_err(|_| format!("not a currency amount: {input}"))?;
    if amount.is_sign_negative() {
        return Err(format!("amount must not be negative: {input}"));
    }
    Ok(amount)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rates() {
        assert_eq!(STANDARD_REFERRER_RATE, Decimal::new(2, 2));
        assert_eq!(PLATFORM_RATE, Decimal::new(5, 3));
        assert_eq!(STANDARD_REFERRER_RATE + PLATFORM_RATE, Decimal::new(25, 3));
    }

    #[test]
    fn test_standard_breakdown() {
        let value = parse_currency("$125,000").unwrap();
        let breakdown = CommissionTerms::Standard.breakdown(value);
        assert_eq!(breakdown.referrer_amount, Decimal::new(2_500, 0));
        assert_eq!(breakdown.platform_amount, Decimal::new(625, 0));
        assert_eq!(breakdown.total, Decimal::new(3_125, 0));
    }

    #[test]
    fn test_custom_terms_replace_referrer_share_only() {
        let terms = CommissionTerms::custom(Decimal::new(3, 2)).unwrap();
        let breakdown = terms.breakdown(Decimal::new(10_000, 0));
        assert_eq!(breakdown.referrer_amount, Decimal::new(300, 0));
        assert_eq!(breakdown.platform_amount, Decimal::new(50, 0));
    }

    #[test]
    fn test_custom_rate_bounds() {
        assert!(CommissionTerms::custom(Decimal::new(-1, 2)).is_err());
        assert!(CommissionTerms::custom(Decimal::new(2, 0)).is_err());
        assert!(CommissionTerms::custom(Decimal::ZERO).is_ok());
    }

    #[test]
    fn test_parse_currency() {
        assert_eq!(parse_currency(" 98500.50 ").unwrap(), Decimal::new(9_850_050, 2));
        assert_eq!(parse_currency("$1,200").unwrap(), Decimal::new(1_200, 0));
        assert!(parse_currency("").is_err());
        assert!(parse_currency("$").is_err());
        assert!(parse_currency("about 50k").is_err());
        assert!(parse_currency("$50,000 - $100,000").is_err());
        assert!(parse_currency("-500").is_err());
    }

    #[test]
    fn test_terms_serde() {
        let json = serde_json::to_value(CommissionTerms::Standard).unwrap();
        assert_eq!(json, serde_json::json!({"type": "standard"}));
        let custom: CommissionTerms =
            serde_json::from_value(serde_json::json!({"type": "custom", "referrer_rate": "0.03"}))
                .unwrap();
        assert_eq!(custom.referrer_rate(), Decimal::new(3, 2));
    }
}
