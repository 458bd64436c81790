// handlers/public/auth/login.rs - POST /auth/login handler

use axum::extract::State;
use serde::Deserialize;
use tracing::{info, warn};

use super::Session;
use crate::app::AppState;
use crate::auth::password::{verify_against_dummy, verify_password};
use crate::database::models::account::normalize_email;
use crate::error::ApiError;
use crate::handlers::extract::Json;
use crate::handlers::validate::{filled, require_fields};
use crate::middleware::{ApiResponse, ApiResult};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

const BAD_CREDENTIALS: &str = "Incorrect email or password";

/// POST /auth/login - exchange email and password for a token.
///
/// Unknown email and wrong password are indistinguishable to the client.
pub async fn login_post(State(state): State<AppState>, Json(body): Json<LoginRequest>) -> ApiResult<Session> {
    require_fields(&[
        ("email", filled(&body.email)),
        ("password", body.password.as_deref().map(|p| !p.is_empty()).unwrap_or(false)),
    ])?;

    let email = normalize_email(body.email.as_deref().unwrap_or_default());
    let password = body.password.unwrap_or_default();

    let found = match state.store.find_account_by_email(&email).await? {
        Some(found) => found,
        None => {
            let cost = state.config.security.password_cost;
            tokio::task::spawn_blocking(move || verify_against_dummy(&password, cost))
                .await
                .map_err(ApiError::internal)?;
            warn!("Login attempt for unknown email");
            return Err(ApiError::unauthorized(BAD_CREDENTIALS));
        }
    };

    let stored_hash = found.account.password_hash.clone();
    let matches = tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
        .await
        .map_err(ApiError::internal)?;
    if !matches {
        warn!(account_id = %found.account.id, "Login attempt with wrong password");
        return Err(ApiError::unauthorized(BAD_CREDENTIALS));
    }

    info!(account_id = %found.account.id, "Login succeeded");
    Ok(ApiResponse::success(Session::issue(&state, found)?).with_message("Login successful"))
}
