use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Fixed limits applied when an organization has no active subscription.
pub const FREE_MAX_TEAM_MEMBERS: i64 = 5;
pub const FREE_MAX_PROJECTS: i64 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TierName {
    Free,
    Business,
    Enterprise,
    Other(String),
}

impl TierName {
    pub fn as_str(&self) -> &str {
        match self {
            TierName::Free => "free",
            TierName::Business => "business",
            TierName::Enterprise => "enterprise",
            TierName::Other(name) => name,
        }
    }

    pub fn is_business_plus(&self) -> bool {
        matches!(self, TierName::Business | TierName::Enterprise)
    }
}

impl From<String> for TierName {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "free" => TierName::Free,
            "business" => TierName::Business,
            "enterprise" => TierName::Enterprise,
            _ => TierName::Other(value),
        }
    }
}

impl From<&str> for TierName {
    fn from(value: &str) -> Self {
        TierName::from(value.to_string())
    }
}

impl From<TierName> for String {
    fn from(value: TierName) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for TierName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `None` means unlimited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierLimits {
    pub max_team_members: Option<i64>,
    pub max_projects: Option<i64>,
    pub allows_custom_permissions: bool,
}

impl TierLimits {
    pub fn free_fallback() -> Self {
        Self {
            max_team_members: Some(FREE_MAX_TEAM_MEMBERS),
            max_projects: Some(FREE_MAX_PROJECTS),
            allows_custom_permissions: false,
        }
    }

    /// Limits used when the tier has no row in `subscription_tiers`.
    pub fn builtin(tier: &TierName) -> Self {
        match tier {
            TierName::Business => Self {
                max_team_members: Some(25),
                max_projects: Some(50),
                allows_custom_permissions: true,
            },
            TierName::Enterprise => Self {
                max_team_members: None,
                max_projects: None,
                allows_custom_permissions: true,
            },
            TierName::Free | TierName::Other(_) => Self::free_fallback(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionTier {
    pub name: TierName,
    pub limits: TierLimits,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub org_id: Uuid,
    pub tier_name: TierName,
    pub status: String,
    pub current_period_end: Option<DateTime<Utc>>,
}

impl Subscription {
    pub fn is_active(&self) -> bool {
        matches!(self.status.as_str(), "active" | "trialing")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn business_plus_covers_business_and_enterprise_only() {
        assert!(TierName::from("business").is_business_plus());
        assert!(TierName::from("Enterprise").is_business_plus());
        assert!(!TierName::from("free").is_business_plus());
        assert!(!TierName::from("startup").is_business_plus());
    }

    #[test]
    fn free_fallback_limits_are_fixed_numbers() {
        let limits = TierLimits::free_fallback();
        assert_eq!(limits.max_team_members, Some(FREE_MAX_TEAM_MEMBERS));
        assert_eq!(limits.max_projects, Some(FREE_MAX_PROJECTS));
        assert!(!limits.allows_custom_permissions);
    }
}
