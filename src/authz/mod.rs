pub mod capability;
pub mod error;
pub mod guard;
pub mod role;

pub use capability::{
    keys, resolve_capabilities, CapabilityCategory, CapabilityKey, CapabilityOverride, DefaultCapabilities,
    EffectiveCapabilities,
};
pub use error::{AuthzError, AuthzResult};
pub use guard::{guard_claims_lookup, guard_tenant_access, log_denial, Denial, GuardResult};
pub use role::Role;
