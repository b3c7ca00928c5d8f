// handlers/mod.rs - two security tiers
//
// Public (no session) -> Protected (bearer session bound to the request's tenant)
pub mod protected;
pub mod public;
