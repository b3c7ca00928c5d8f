// handlers/public/mod.rs - endpoints that need no session
//
// Health, host context, and the signup-time subdomain reservation flow.
pub mod health;
pub mod subdomains;

pub use health::{context, health};
pub use subdomains::{subdomain_availability, subdomain_extend, subdomain_reserve};
