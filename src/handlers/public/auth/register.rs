// handlers/public/auth/register.rs - POST /auth/register handler

use axum::extract::State;
use serde::Deserialize;
use tracing::info;

use super::{hash_on_blocking_pool, Session};
use crate::app::AppState;
use crate::database::models::{Account, AccountWithProfile, Profile};
use crate::error::ApiError;
use crate::handlers::extract::Json;
use crate::handlers::validate::{self, filled, optional_text, require_fields, text};
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::mailer::{deliver, Email};
use crate::types::Role;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<String>,
    pub phone: Option<String>,
}

/// POST /auth/register - self-service sign-up for mothers and collaborators.
///
/// Creates the account and its empty role profile together, sends a welcome
/// email (best effort) and returns a session so the client is signed in.
pub async fn register_post(State(state): State<AppState>, Json(body): Json<RegisterRequest>) -> ApiResult<Session> {
    require_fields(&[
        ("email", filled(&body.email)),
        ("password", body.password.as_deref().map(|p| !p.is_empty()).unwrap_or(false)),
        ("first_name", filled(&body.first_name)),
        ("last_name", filled(&body.last_name)),
        ("role", filled(&body.role)),
    ])?;

    let email = text(body.email);
    let password = body.password.unwrap_or_default();
    validate::email(&email)?;
    validate::password(&password)?;

    let role = match text(body.role).parse::<Role>() {
        Ok(Role::Admin) | Err(_) => {
            return Err(ApiError::bad_request("Role must be either mother or collaborator"));
        }
        Ok(role) => role,
    };

    let password_hash = hash_on_blocking_pool(password, state.config.security.password_cost).await?;
    let account = Account::new(
        &email,
        password_hash,
        text(body.first_name),
        text(body.last_name),
        optional_text(body.phone),
        role,
    );
    let profile = Profile::empty_for(role);
    state.store.create_account(&account, &profile).await?;

    info!(account_id = %account.id, role = %role, "Account registered");
    deliver(state.mailer.as_ref(), Email::welcome(&account)).await;

    let session = Session::issue(&state, AccountWithProfile { account, profile })?;
    Ok(ApiResponse::created(session).with_message("Account created successfully"))
}
