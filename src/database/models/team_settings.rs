use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::authz::Role;

pub const DEFAULT_GUEST_LINK_EXPIRY_DAYS: i32 = 7;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamSettings {
    pub org_id: Uuid,
    pub allow_member_invites: bool,
    pub require_admin_approval: bool,
    pub auto_assign_default_role: Role,
    /// Derived from the subscription tier on every read.
    pub max_team_size: Option<i64>,
    /// Reserved, not enforced anywhere yet.
    pub allow_guest_access: bool,
    pub guest_link_expiry_days: i32,
    pub updated_at: DateTime<Utc>,
}

impl TeamSettings {
    pub fn defaults(org_id: Uuid) -> Self {
        Self {
            org_id,
            allow_member_invites: false,
            require_admin_approval: true,
            auto_assign_default_role: Role::Member,
            max_team_size: None,
            allow_guest_access: false,
            guest_link_expiry_days: DEFAULT_GUEST_LINK_EXPIRY_DAYS,
            updated_at: Utc::now(),
        }
    }

    pub fn apply(&mut self, patch: &TeamSettingsPatch) {
        if let Some(v) = patch.allow_member_invites {
            self.allow_member_invites = v;
        }
        if let Some(v) = patch.require_admin_approval {
            self.require_admin_approval = v;
        }
        if let Some(v) = patch.auto_assign_default_role {
            self.auto_assign_default_role = v;
        }
        if let Some(v) = patch.allow_guest_access {
            self.allow_guest_access = v;
        }
        if let Some(v) = patch.guest_link_expiry_days {
            self.guest_link_expiry_days = v;
        }
        self.updated_at = Utc::now();
    }
}

/// Settable fields. `max_team_size` follows the tier and cannot be set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TeamSettingsPatch {
    pub allow_member_invites: Option<bool>,
    pub require_admin_approval: Option<bool>,
    pub auto_assign_default_role: Option<Role>,
    pub allow_guest_access: Option<bool>,
    pub guest_link_expiry_days: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_cannot_carry_max_team_size() {
        let parsed: Result<TeamSettingsPatch, _> = serde_json::from_str(r#"{"max_team_size": 100}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn apply_only_touches_present_fields() {
        let mut settings = TeamSettings::defaults(Uuid::new_v4());
        settings.apply(&TeamSettingsPatch {
            allow_member_invites: Some(true),
            ..Default::default()
        });
        assert!(settings.allow_member_invites);
        assert!(settings.require_admin_approval);
        assert_eq!(settings.auto_assign_default_role, Role::Member);
    }
}
