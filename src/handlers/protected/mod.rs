// handlers/protected/mod.rs - Protected handlers (JWT authentication required)
//
// Every route here runs behind the authentication gate, so handlers take an
// `AuthContext` and perform their own role and ownership checks.

pub mod account;
pub mod classes;
pub mod community;
pub mod events;
pub mod media;
pub mod notifications;
pub mod pregnancy;
pub mod reports;
