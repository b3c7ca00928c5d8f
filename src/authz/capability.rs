//! Capability keys, the built-in role defaults, and the override merge.
//!
//! A user's effective set for an organization starts from the default set of
//! their role; every override row for that role then replaces the default's
//! presence with its `granted` flag.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use super::role::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityCategory {
    Projects,
    Team,
    Billing,
    Organization,
    Analytics,
    Security,
    Profile,
    Notifications,
}

impl CapabilityCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            CapabilityCategory::Projects => "projects",
            CapabilityCategory::Team => "team",
            CapabilityCategory::Billing => "billing",
            CapabilityCategory::Organization => "organization",
            CapabilityCategory::Analytics => "analytics",
            CapabilityCategory::Security => "security",
            CapabilityCategory::Profile => "profile",
            CapabilityCategory::Notifications => "notifications",
        }
    }
}

impl FromStr for CapabilityCategory {
    type Err = CapabilityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "projects" => Ok(CapabilityCategory::Projects),
            "team" => Ok(CapabilityCategory::Team),
            "billing" => Ok(CapabilityCategory::Billing),
            "organization" => Ok(CapabilityCategory::Organization),
            "analytics" => Ok(CapabilityCategory::Analytics),
            "security" => Ok(CapabilityCategory::Security),
            "profile" => Ok(CapabilityCategory::Profile),
            "notifications" => Ok(CapabilityCategory::Notifications),
            other => Err(CapabilityError::UnknownCategory(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CapabilityError {
    #[error("capability key must look like 'category.action': {0}")]
    Malformed(String),

    #[error("unknown capability category: {0}")]
    UnknownCategory(String),

    #[error("invalid capability file: {0}")]
    InvalidFile(String),
}

/// A `category.action` capability key whose category is one of the closed set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CapabilityKey(Cow<'static, str>);

impl CapabilityKey {
    const fn from_static(key: &'static str) -> Self {
        CapabilityKey(Cow::Borrowed(key))
    }

    pub fn parse(raw: &str) -> Result<Self, CapabilityError> {
        let (category, action) = raw
            .split_once('.')
            .ok_or_else(|| CapabilityError::Malformed(raw.to_string()))?;
        category.parse::<CapabilityCategory>()?;
        if action.is_empty() || !action.chars().all(|c| c.is_ascii_lowercase() || c == '_') {
            return Err(CapabilityError::Malformed(raw.to_string()));
        }
        Ok(CapabilityKey(Cow::Owned(raw.to_string())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn category(&self) -> CapabilityCategory {
        // Keys are validated on construction, built-ins by the registry test.
        self.0
            .split_once('.')
            .and_then(|(category, _)| category.parse().ok())
            .unwrap_or(CapabilityCategory::Profile)
    }

    pub fn action(&self) -> &str {
        self.0.split_once('.').map(|(_, action)| action).unwrap_or("")
    }
}

impl fmt::Display for CapabilityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CapabilityKey {
    type Error = CapabilityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        CapabilityKey::parse(&value)
    }
}

impl From<CapabilityKey> for String {
    fn from(key: CapabilityKey) -> Self {
        key.0.into_owned()
    }
}

impl FromStr for CapabilityKey {
    type Err = CapabilityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CapabilityKey::parse(s)
    }
}

/// Built-in capability keys.
pub mod keys {
    use super::CapabilityKey;

    pub const PROJECTS_VIEW: CapabilityKey = CapabilityKey::from_static("projects.view");
    pub const PROJECTS_CREATE: CapabilityKey = CapabilityKey::from_static("projects.create");
    pub const PROJECTS_EDIT: CapabilityKey = CapabilityKey::from_static("projects.edit");
    pub const PROJECTS_DELETE: CapabilityKey = CapabilityKey::from_static("projects.delete");

    pub const TEAM_VIEW: CapabilityKey = CapabilityKey::from_static("team.view");
    pub const TEAM_INVITE: CapabilityKey = CapabilityKey::from_static("team.invite");
    pub const TEAM_REMOVE: CapabilityKey = CapabilityKey::from_static("team.remove");
    pub const TEAM_MANAGE_ROLES: CapabilityKey = CapabilityKey::from_static("team.manage_roles");

    pub const BILLING_VIEW: CapabilityKey = CapabilityKey::from_static("billing.view");
    pub const BILLING_MANAGE: CapabilityKey = CapabilityKey::from_static("billing.manage");

    pub const ORGANIZATION_VIEW: CapabilityKey = CapabilityKey::from_static("organization.view");
    pub const ORGANIZATION_EDIT: CapabilityKey = CapabilityKey::from_static("organization.edit");
    pub const ORGANIZATION_DELETE: CapabilityKey = CapabilityKey::from_static("organization.delete");

    pub const ANALYTICS_VIEW: CapabilityKey = CapabilityKey::from_static("analytics.view");
    pub const ANALYTICS_EXPORT: CapabilityKey = CapabilityKey::from_static("analytics.export");

    pub const SECURITY_VIEW: CapabilityKey = CapabilityKey::from_static("security.view");
    pub const SECURITY_MANAGE: CapabilityKey = CapabilityKey::from_static("security.manage");

    pub const PROFILE_VIEW: CapabilityKey = CapabilityKey::from_static("profile.view");
    pub const PROFILE_EDIT: CapabilityKey = CapabilityKey::from_static("profile.edit");

    pub const NOTIFICATIONS_VIEW: CapabilityKey = CapabilityKey::from_static("notifications.view");
    pub const NOTIFICATIONS_MANAGE: CapabilityKey = CapabilityKey::from_static("notifications.manage");

    pub const ALL: [CapabilityKey; 21] = [
        PROJECTS_VIEW,
        PROJECTS_CREATE,
        PROJECTS_EDIT,
        PROJECTS_DELETE,
        TEAM_VIEW,
        TEAM_INVITE,
        TEAM_REMOVE,
        TEAM_MANAGE_ROLES,
        BILLING_VIEW,
        BILLING_MANAGE,
        ORGANIZATION_VIEW,
        ORGANIZATION_EDIT,
        ORGANIZATION_DELETE,
        ANALYTICS_VIEW,
        ANALYTICS_EXPORT,
        SECURITY_VIEW,
        SECURITY_MANAGE,
        PROFILE_VIEW,
        PROFILE_EDIT,
        NOTIFICATIONS_VIEW,
        NOTIFICATIONS_MANAGE,
    ];
}

/// Per-organization override row, already filtered to one organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityOverride {
    pub role: Role,
    pub capability: CapabilityKey,
    pub granted: bool,
}

/// Static role -> capability mapping, the "default granted" set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultCapabilities {
    by_role: HashMap<Role, BTreeSet<CapabilityKey>>,
}

impl DefaultCapabilities {
    pub fn builtin() -> Self {
        use keys::*;

        let owner: BTreeSet<CapabilityKey> = ALL.into_iter().collect();

        let superadmin: BTreeSet<CapabilityKey> = ALL
            .into_iter()
            .filter(|k| *k != ORGANIZATION_DELETE && *k != BILLING_MANAGE)
            .collect();

        let admin: BTreeSet<CapabilityKey> = [
            PROJECTS_VIEW,
            PROJECTS_CREATE,
            PROJECTS_EDIT,
            PROJECTS_DELETE,
            TEAM_VIEW,
            TEAM_INVITE,
            TEAM_REMOVE,
            TEAM_MANAGE_ROLES,
            ANALYTICS_VIEW,
            ANALYTICS_EXPORT,
            ORGANIZATION_VIEW,
            ORGANIZATION_EDIT,
            PROFILE_VIEW,
            PROFILE_EDIT,
            NOTIFICATIONS_VIEW,
            NOTIFICATIONS_MANAGE,
        ]
        .into_iter()
        .collect();

        let member: BTreeSet<CapabilityKey> = [
            PROJECTS_VIEW,
            PROJECTS_CREATE,
            PROJECTS_EDIT,
            TEAM_VIEW,
            ANALYTICS_VIEW,
            PROFILE_VIEW,
            PROFILE_EDIT,
            NOTIFICATIONS_VIEW,
            NOTIFICATIONS_MANAGE,
        ]
        .into_iter()
        .collect();

        let view_only: BTreeSet<CapabilityKey> =
            [PROJECTS_VIEW, TEAM_VIEW, PROFILE_VIEW, NOTIFICATIONS_VIEW]
                .into_iter()
                .collect();

        let mut by_role = HashMap::new();
        by_role.insert(Role::Owner, owner);
        by_role.insert(Role::Superadmin, superadmin);
        by_role.insert(Role::Admin, admin);
        by_role.insert(Role::Member, member);
        by_role.insert(Role::ViewOnly, view_only);
        Self { by_role }
    }

    pub fn from_map(by_role: HashMap<Role, BTreeSet<CapabilityKey>>) -> Self {
        Self { by_role }
    }

    /// Parse a YAML document mapping role names to lists of capability keys.
    /// Roles missing from the document get no default capabilities.
    pub fn from_yaml_str(raw: &str) -> Result<Self, CapabilityError> {
        let parsed: HashMap<Role, Vec<CapabilityKey>> =
            serde_yaml::from_str(raw).map_err(|e| CapabilityError::InvalidFile(e.to_string()))?;
        Ok(Self {
            by_role: parsed
                .into_iter()
                .map(|(role, keys)| (role, keys.into_iter().collect()))
                .collect(),
        })
    }

    pub fn load(path: &str) -> Result<Self, CapabilityError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| CapabilityError::InvalidFile(format!("{}: {}", path, e)))?;
        Self::from_yaml_str(&raw)
    }

    pub fn for_role(&self, role: Role) -> Option<&BTreeSet<CapabilityKey>> {
        self.by_role.get(&role)
    }

    pub fn is_default(&self, role: Role, key: &CapabilityKey) -> bool {
        self.for_role(role).map(|set| set.contains(key)).unwrap_or(false)
    }
}

impl Default for DefaultCapabilities {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Merge the role's defaults with the organization's overrides.
///
/// Overrides are folded into one decision per key before being applied, so the
/// result does not depend on the order of `overrides`. Conflicting rows for the
/// same key (which the store's uniqueness constraint should rule out) resolve
/// to revoked.
pub fn resolve_capabilities(
    role: Role,
    defaults: &DefaultCapabilities,
    overrides: &[CapabilityOverride],
) -> BTreeSet<CapabilityKey> {
    let mut decisions: BTreeMap<&CapabilityKey, bool> = BTreeMap::new();
    for row in overrides.iter().filter(|o| o.role == role) {
        decisions
            .entry(&row.capability)
            .and_modify(|granted| *granted = *granted && row.granted)
            .or_insert(row.granted);
    }

    let mut result = defaults.for_role(role).cloned().unwrap_or_default();
    for (key, granted) in decisions {
        if granted {
            result.insert(key.clone());
        } else {
            result.remove(key);
        }
    }
    result
}

/// Resolved capability set; `None` means the user could not be resolved and
/// every check fails closed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct EffectiveCapabilities {
    capabilities: Option<BTreeSet<CapabilityKey>>,
}

impl EffectiveCapabilities {
    pub fn resolved(capabilities: BTreeSet<CapabilityKey>) -> Self {
        Self {
            capabilities: Some(capabilities),
        }
    }

    pub fn unresolved() -> Self {
        Self { capabilities: None }
    }

    pub fn is_resolved(&self) -> bool {
        self.capabilities.is_some()
    }

    pub fn has(&self, key: &CapabilityKey) -> bool {
        self.capabilities
            .as_ref()
            .map(|set| set.contains(key))
            .unwrap_or(false)
    }

    pub fn has_any(&self, keys: &[CapabilityKey]) -> bool {
        keys.iter().any(|k| self.has(k))
    }

    /// An empty query is never satisfied.
    pub fn has_all(&self, keys: &[CapabilityKey]) -> bool {
        !keys.is_empty() && keys.iter().all(|k| self.has(k))
    }

    pub fn iter(&self) -> impl Iterator<Item = &CapabilityKey> {
        self.capabilities.iter().flat_map(|set| set.iter())
    }

    pub fn into_set(self) -> BTreeSet<CapabilityKey> {
        self.capabilities.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::keys::*;
    use super::*;

    fn member_defaults() -> DefaultCapabilities {
        let mut map = HashMap::new();
        map.insert(Role::Member, [TEAM_VIEW].into_iter().collect());
        DefaultCapabilities::from_map(map)
    }

    #[test]
    fn builtin_keys_are_well_formed() {
        for key in ALL.iter() {
            assert_eq!(&CapabilityKey::parse(key.as_str()).unwrap(), key);
        }
        assert_eq!(TEAM_MANAGE_ROLES.category(), CapabilityCategory::Team);
        assert_eq!(TEAM_MANAGE_ROLES.action(), "manage_roles");
    }

    #[test]
    fn parse_rejects_unknown_category_and_bad_shape() {
        assert!(matches!(
            CapabilityKey::parse("widgets.view"),
            Err(CapabilityError::UnknownCategory(_))
        ));
        assert!(CapabilityKey::parse("team").is_err());
        assert!(CapabilityKey::parse("team.").is_err());
        assert!(CapabilityKey::parse("team.Invite").is_err());
    }

    #[test]
    fn grant_override_adds_non_default_capability() {
        let overrides = vec![CapabilityOverride {
            role: Role::Member,
            capability: TEAM_INVITE,
            granted: true,
        }];
        let resolved = resolve_capabilities(Role::Member, &member_defaults(), &overrides);
        let expected: BTreeSet<_> = [TEAM_VIEW, TEAM_INVITE].into_iter().collect();
        assert_eq!(resolved, expected);
    }

    #[test]
    fn revoke_override_removes_default_capability() {
        let overrides = vec![CapabilityOverride {
            role: Role::Member,
            capability: TEAM_VIEW,
            granted: false,
        }];
        let resolved = resolve_capabilities(Role::Member, &member_defaults(), &overrides);
        assert!(resolved.is_empty());
    }

    #[test]
    fn overrides_for_other_roles_are_ignored() {
        let overrides = vec![CapabilityOverride {
            role: Role::Admin,
            capability: TEAM_VIEW,
            granted: false,
        }];
        let resolved = resolve_capabilities(Role::Member, &member_defaults(), &overrides);
        assert!(resolved.contains(&TEAM_VIEW));
    }

    #[test]
    fn merge_is_order_independent_and_idempotent() {
        let grant = CapabilityOverride {
            role: Role::Member,
            capability: BILLING_VIEW,
            granted: true,
        };
        let revoke = CapabilityOverride {
            role: Role::Member,
            capability: TEAM_VIEW,
            granted: false,
        };
        let defaults = member_defaults();
        let a = resolve_capabilities(Role::Member, &defaults, &[grant.clone(), revoke.clone()]);
        let b = resolve_capabilities(Role::Member, &defaults, &[revoke.clone(), grant.clone()]);
        let c = resolve_capabilities(Role::Member, &defaults, &[grant.clone(), grant, revoke.clone(), revoke]);
        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn unknown_role_defaults_to_empty_set() {
        let resolved = resolve_capabilities(Role::Owner, &member_defaults(), &[]);
        assert!(resolved.is_empty());
    }

    #[test]
    fn unresolved_set_fails_closed() {
        let caps = EffectiveCapabilities::unresolved();
        assert!(!caps.has(&TEAM_VIEW));
        assert!(!caps.has_any(&[TEAM_VIEW]));
        assert!(!caps.has_all(&[TEAM_VIEW]));
    }

    #[test]
    fn derived_checks_follow_set_semantics() {
        let caps = EffectiveCapabilities::resolved([TEAM_VIEW, TEAM_INVITE].into_iter().collect());
        assert!(caps.has_any(&[BILLING_MANAGE, TEAM_INVITE]));
        assert!(caps.has_all(&[TEAM_VIEW, TEAM_INVITE]));
        assert!(!caps.has_all(&[TEAM_VIEW, BILLING_MANAGE]));
        assert!(!caps.has_all(&[]));
        assert!(!caps.has_any(&[]));
    }

    #[test]
    fn builtin_map_respects_role_order() {
        let defaults = DefaultCapabilities::builtin();
        let owner = defaults.for_role(Role::Owner).unwrap();
        let superadmin = defaults.for_role(Role::Superadmin).unwrap();
        let view_only = defaults.for_role(Role::ViewOnly).unwrap();
        assert!(superadmin.is_subset(owner));
        assert!(!superadmin.contains(&ORGANIZATION_DELETE));
        assert!(view_only.iter().all(|k| k.action() == "view"));
    }

    #[test]
    fn defaults_load_from_yaml() {
        let yaml = "member:\n  - team.view\n  - projects.view\nview-only: []\n";
        let defaults = DefaultCapabilities::from_yaml_str(yaml).unwrap();
        assert!(defaults.is_default(Role::Member, &TEAM_VIEW));
        assert!(defaults.for_role(Role::ViewOnly).unwrap().is_empty());
        assert!(defaults.for_role(Role::Owner).is_none());

        assert!(DefaultCapabilities::from_yaml_str("member: [widgets.view]").is_err());
    }
}
