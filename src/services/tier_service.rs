//! Subscription tier lookup and usage limits.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::authz::{AuthzError, AuthzResult};
use crate::database::models::{TierLimits, TierName};
use crate::database::Store;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierInfo {
    pub tier_name: TierName,
    pub limits: TierLimits,
    pub is_business_plus: bool,
    pub subscription_active: bool,
    pub current_period_end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageResource {
    Projects,
    TeamMembers,
}

impl UsageResource {
    pub fn as_str(self) -> &'static str {
        match self {
            UsageResource::Projects => "projects",
            UsageResource::TeamMembers => "team_members",
        }
    }

    fn limit(self, limits: &TierLimits) -> Option<i64> {
        match self {
            UsageResource::Projects => limits.max_projects,
            UsageResource::TeamMembers => limits.max_team_members,
        }
    }
}

impl fmt::Display for UsageResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UsageResource {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "projects" => Ok(UsageResource::Projects),
            "team_members" => Ok(UsageResource::TeamMembers),
            other => Err(AuthzError::validation(format!("Unknown usage resource '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageResult {
    pub resource: UsageResource,
    pub reached: bool,
    pub current: i64,
    /// `None` is unlimited.
    pub limit: Option<i64>,
}

impl UsageResult {
    pub fn new(resource: UsageResource, current: i64, limit: Option<i64>) -> Self {
        Self {
            resource,
            reached: limit.map_or(false, |limit| current >= limit),
            current,
            limit,
        }
    }
}

#[derive(Clone)]
pub struct TierService {
    store: Arc<dyn Store>,
}

impl TierService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Falls back to the free tier's fixed limits when there is no active subscription.
    pub async fn get_tier_info(&self, org_id: Uuid) -> AuthzResult<TierInfo> {
        let Some(subscription) = self.store.active_subscription(org_id).await? else {
            tracing::debug!("No active subscription for org {}, using free fallback", org_id);
            return Ok(TierInfo {
                tier_name: TierName::Free,
                limits: TierLimits::free_fallback(),
                is_business_plus: false,
                subscription_active: false,
                current_period_end: None,
            });
        };

        let limits = match self.store.find_tier(&subscription.tier_name).await? {
            Some(tier) => tier.limits,
            None => TierLimits::builtin(&subscription.tier_name),
        };

        Ok(TierInfo {
            is_business_plus: subscription.tier_name.is_business_plus(),
            subscription_active: subscription.is_active(),
            current_period_end: subscription.current_period_end,
            tier_name: subscription.tier_name,
            limits,
        })
    }

    /// Counts are live, never cached.
    pub async fn check_usage_limit(&self, org_id: Uuid, resource: UsageResource) -> AuthzResult<UsageResult> {
        let info = self.get_tier_info(org_id).await?;
        let current = match resource {
            UsageResource::Projects => self.store.count_active_projects(org_id).await?,
            UsageResource::TeamMembers => self.store.count_profiles(org_id).await?,
        };
        Ok(UsageResult::new(resource, current, resource.limit(&info.limits)))
    }

    pub async fn ensure_within_limit(&self, org_id: Uuid, resource: UsageResource) -> AuthzResult<UsageResult> {
        let usage = self.check_usage_limit(org_id, resource).await?;
        match usage.limit {
            Some(limit) if usage.reached => Err(AuthzError::LimitReached {
                resource: resource.to_string(),
                current: usage.current,
                limit,
            }),
            _ => Ok(usage),
        }
    }
}
