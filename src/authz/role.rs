use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Organization roles, ordered `owner > superadmin > admin > member > view-only`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Owner,
    Superadmin,
    Admin,
    Member,
    ViewOnly,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Owner,
        Role::Superadmin,
        Role::Admin,
        Role::Member,
        Role::ViewOnly,
    ];

    /// Position in the total order, higher is more privileged.
    pub fn rank(self) -> u8 {
        match self {
            Role::Owner => 4,
            Role::Superadmin => 3,
            Role::Admin => 2,
            Role::Member => 1,
            Role::ViewOnly => 0,
        }
    }

    /// Strictly above `other` in the order.
    pub fn outranks(self, other: Role) -> bool {
        self.rank() > other.rank()
    }

    /// A role may only be handed out by someone strictly above it.
    pub fn can_assign(self, target: Role) -> bool {
        self.outranks(target)
    }

    pub fn is_admin_or_above(self) -> bool {
        self.rank() >= Role::Admin.rank()
    }

    pub fn is_org_manager(self) -> bool {
        matches!(self, Role::Owner | Role::Superadmin)
    }

    pub fn assignable_roles(self) -> Vec<Role> {
        Role::ALL.into_iter().filter(|r| self.can_assign(*r)).collect()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Superadmin => "superadmin",
            Role::Admin => "admin",
            Role::Member => "member",
            Role::ViewOnly => "view-only",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(Role::Owner),
            "superadmin" => Ok(Role::Superadmin),
            "admin" => Ok(Role::Admin),
            "member" => Ok(Role::Member),
            "view-only" => Ok(Role::ViewOnly),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}
