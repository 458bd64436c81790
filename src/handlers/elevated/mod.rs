// handlers/elevated/mod.rs - Administrator handlers
//
// Mounted behind the authentication gate and `require_roles(&[Role::Admin])`.

pub mod admin;
