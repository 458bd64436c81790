// handlers/public/mod.rs - Public handlers (no authentication)
//
// Token acquisition plus the read-only catalog of published content.

pub mod auth;
pub mod catalog;
