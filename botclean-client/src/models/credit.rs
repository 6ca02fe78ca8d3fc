//! Credit balance as reported by the billing collaborator

use serde::{Deserialize, Serialize};

/// Credit balance and plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditInfo {
    pub credits_balance: u64,
    pub monthly_email_limit: u64,
    pub plan_type: String,
}

/// Coarse balance level for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageLevel {
    /// Under 20% of the monthly limit left
    Low,
    /// Under 50% left
    Medium,
    Healthy,
}

impl CreditInfo {
    /// Remaining balance as a percentage of the monthly limit
    pub fn remaining_percentage(&self) -> f64 {
        if self.monthly_email_limit == 0 {
            return 0.0;
        }
        self.credits_balance as f64 / self.monthly_email_limit as f64 * 100.0
    }

    pub fn usage_level(&self) -> UsageLevel {
        let pct = self.remaining_percentage();
        if pct < 20.0 {
            UsageLevel::Low
        } else if pct < 50.0 {
            UsageLevel::Medium
        } else {
            UsageLevel::Healthy
        }
    }

    /// Whether the balance pays for `rows` emails (one credit per row)
    pub fn covers(&self, rows: u64) -> bool {
        self.credits_balance >= rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credits(balance: u64, limit: u64) -> CreditInfo {
        CreditInfo {
            credits_balance: balance,
            monthly_email_limit: limit,
            plan_type: "starter".to_string(),
        }
    }

    #[test]
    fn test_usage_levels() {
        assert_eq!(credits(10, 100).usage_level(), UsageLevel::Low);
        assert_eq!(credits(20, 100).usage_level(), UsageLevel::Medium);
        assert_eq!(credits(50, 100).usage_level(), UsageLevel::Healthy);
        assert_eq!(credits(5, 0).usage_level(), UsageLevel::Low);
    }

    #[test]
    fn test_covers() {
        assert!(credits(5, 100).covers(5));
        assert!(!credits(4, 100).covers(5));
    }
}
