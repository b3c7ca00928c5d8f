pub mod auth;
pub mod host;
pub mod response;
pub mod tenant_guard;

pub use auth::lookup_claims;
pub use host::resolve_host_middleware;
pub use response::{ApiResponse, ApiResult};
pub use tenant_guard::tenant_guard_middleware;
