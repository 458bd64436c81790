// handlers/public/auth/mod.rs - Public authentication handlers
//
// Token acquisition endpoints that do not require authentication.

use serde::Serialize;

use crate::app::AppState;
use crate::auth::password::hash_password;
use crate::database::models::{Account, AccountWithProfile, Profile};
use crate::error::ApiError;

pub mod login; // POST /auth/login - authenticate and get JWT
pub mod register; // POST /auth/register - create new account

pub use login::login_post;
pub use register::register_post;

/// Body returned by register and login
#[derive(Debug, Serialize)]
pub struct Session {
    pub token: String,
    pub expires_in: i64,
    pub account: Account,
    pub profile: Profile,
}

impl Session {
    pub fn issue(state: &AppState, found: AccountWithProfile) -> Result<Self, ApiError> {
        let (token, expires_in) = state.tokens.issue(&found.account)?;
        Ok(Self {
            token,
            expires_in,
            account: found.account,
            profile: found.profile,
        })
    }
}

/// bcrypt runs on the blocking pool so slow hashes do not stall the runtime
pub(crate) async fn hash_on_blocking_pool(plain: String, cost: u32) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || hash_password(&plain, cost))
        .await
        .map_err(ApiError::internal)?
        .map_err(ApiError::from)
}
