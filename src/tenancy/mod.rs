pub mod host;
pub mod subdomain;

pub use host::{HostResolver, TenantContext};
pub use subdomain::{normalize_subdomain, validate_subdomain};
