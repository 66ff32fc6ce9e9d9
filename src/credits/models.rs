//! Credit account data models

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Subscription tiers a credit account can be on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionTier {
    Free,
    Pro,
    ProLifetime,
}

impl SubscriptionTier {
    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "free" => Some(SubscriptionTier::Free),
            "pro" => Some(SubscriptionTier::Pro),
            "pro_lifetime" => Some(SubscriptionTier::ProLifetime),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionTier::Free => "free",
            SubscriptionTier::Pro => "pro",
            SubscriptionTier::ProLifetime => "pro_lifetime",
        }
    }

    /// Credits granted when the tier is activated.
    pub fn granted_credits(&self) -> i64 {
        match self {
            SubscriptionTier::Free => 3,
            SubscriptionTier::Pro => 100,
            SubscriptionTier::ProLifetime => 500,
        }
    }
}

/// Credit account database row
#[derive(FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct UserCredits {
    pub user_id: String,
    pub balance: i64,
    pub subscription_tier: String,
    pub updated_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_round_trips() {
        for tier in [
            SubscriptionTier::Free,
            SubscriptionTier::Pro,
            SubscriptionTier::ProLifetime,
        ] {
            assert_eq!(SubscriptionTier::from_str(tier.as_str()), Some(tier));
        }
        assert_eq!(SubscriptionTier::from_str("platinum"), None);
    }
}
