// handlers/protected/mod.rs - tenant-protected endpoints
//
// Every route here runs behind tenant_guard_middleware, so handlers can take
// `Extension<SessionClaims>` and `Extension<ActingContext>` for granted. Role
// requirements beyond "belongs to this tenant" are enforced in the services.
pub mod capabilities;
pub mod invitations;
pub mod organization;
pub mod session;
pub mod team;
pub mod tier;

pub use capabilities::{capabilities_get, capability_override_delete, capability_override_put};
pub use invitations::{invitation_approve, invitation_create, invitation_reject, invitations_list};
pub use organization::force_logout;
pub use session::session_get;
pub use team::{team_settings_get, team_settings_put};
pub use tier::{tier_get, usage_get};
