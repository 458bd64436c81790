// handlers/protected/account.rs - The signed-in account and its profile
//
// GET  /auth/me
// GET  /users/profile
// PUT  /users/profile
// PUT  /users/password
// POST /users/onboarding

use axum::extract::State;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::pregnancy::check_due_date;
use crate::app::AppState;
use crate::auth::password::verify_password;
use crate::database::models::{Account, AccountWithProfile, Pregnancy, Profile};
use crate::error::ApiError;
use crate::handlers::extract::Json;
use crate::handlers::public::auth::hash_on_blocking_pool;
use crate::handlers::validate::{self, optional_text, require_fields};
use crate::middleware::{ApiResponse, ApiResult, AuthContext};
use crate::types::Role;

/// Editable account and profile fields; absent keys are left untouched,
/// blank strings clear optional values. Fields for another role are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub location: Option<String>,
    pub first_pregnancy: Option<bool>,
    pub profession: Option<String>,
    pub credentials: Option<String>,
    pub department: Option<String>,
}

impl ProfileUpdate {
    fn apply(self, account: &mut Account, profile: &mut Profile) -> Result<(), ApiError> {
        for (field, value) in [("first_name", &self.first_name), ("last_name", &self.last_name)] {
            if matches!(value, Some(v) if v.trim().is_empty()) {
                return Err(ApiError::bad_request(format!("{} cannot be empty", field)));
            }
        }
        if let Some(first_name) = optional_text(self.first_name) {
            account.first_name = first_name;
        }
        if let Some(last_name) = optional_text(self.last_name) {
            account.last_name = last_name;
        }
        if let Some(phone) = self.phone {
            account.phone = optional_text(Some(phone));
        }

        match profile {
            Profile::Mother(mother) => {
                if let Some(bio) = self.bio {
                    mother.bio = optional_text(Some(bio));
                }
                if let Some(avatar_url) = self.avatar_url {
                    mother.avatar_url = optional_text(Some(avatar_url));
                }
                if let Some(location) = self.location {
                    mother.location = optional_text(Some(location));
                }
                if self.date_of_birth.is_some() {
                    mother.date_of_birth = self.date_of_birth;
                }
                if self.first_pregnancy.is_some() {
                    mother.first_pregnancy = self.first_pregnancy;
                }
            }
            Profile::Collaborator(collaborator) => {
                if let Some(bio) = self.bio {
                    collaborator.bio = optional_text(Some(bio));
                }
                if let Some(avatar_url) = self.avatar_url {
                    collaborator.avatar_url = optional_text(Some(avatar_url));
                }
                if let Some(profession) = self.profession {
                    collaborator.profession = optional_text(Some(profession));
                }
                if let Some(credentials) = self.credentials {
                    collaborator.credentials = optional_text(Some(credentials));
                }
            }
            Profile::Admin(admin) => {
                if let Some(department) = self.department {
                    admin.department = optional_text(Some(department));
                }
            }
        }

        account.updated_at = Utc::now();
        Ok(())
    }
}

/// GET /auth/me
pub async fn me_get(auth: AuthContext) -> ApiResult<AccountWithProfile> {
    Ok(ApiResponse::success(AccountWithProfile {
        account: auth.account,
        profile: auth.profile,
    }))
}

/// GET /users/profile
pub async fn profile_get(auth: AuthContext) -> ApiResult<AccountWithProfile> {
    me_get(auth).await
}

/// PUT /users/profile
pub async fn profile_put(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(body): Json<ProfileUpdate>,
) -> ApiResult<AccountWithProfile> {
    let AuthContext {
        mut account,
        mut profile,
        ..
    } = auth;
    body.apply(&mut account, &mut profile)?;

    state.store.save_account(&account).await?;
    state.store.save_profile(account.id, &profile).await?;

    Ok(ApiResponse::success(AccountWithProfile { account, profile }).with_message("Profile updated successfully"))
}

#[derive(Debug, Deserialize)]
pub struct PasswordChange {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

/// PUT /users/password
pub async fn password_put(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(body): Json<PasswordChange>,
) -> ApiResult<()> {
    let current = body.current_password.unwrap_or_default();
    let new_password = body.new_password.unwrap_or_default();
    require_fields(&[
        ("current_password", !current.is_empty()),
        ("new_password", !new_password.is_empty()),
    ])?;
    validate::password(&new_password)?;

    let stored_hash = auth.account.password_hash.clone();
    let matches = tokio::task::spawn_blocking(move || verify_password(&current, &stored_hash))
        .await
        .map_err(ApiError::internal)?;
    if !matches {
        return Err(ApiError::unauthorized("Current password is incorrect"));
    }

    let password_hash = hash_on_blocking_pool(new_password, state.config.security.password_cost).await?;
    state.store.set_password(auth.id, &password_hash).await?;

    info!(account_id = %auth.id, "Password changed");
    Ok(ApiResponse::message("Password updated successfully"))
}

#[derive(Debug, Deserialize)]
pub struct OnboardingRequest {
    #[serde(flatten)]
    pub profile: ProfileUpdate,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct OnboardingResult {
    pub account: Account,
    pub profile: Profile,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pregnancy: Option<Pregnancy>,
}

/// POST /users/onboarding - fill in the profile and, for mothers, start tracking a pregnancy
pub async fn onboarding_post(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(body): Json<OnboardingRequest>,
) -> ApiResult<OnboardingResult> {
    let today = state.today();
    let pregnancy = match body.due_date {
        Some(due_date) if auth.role == Role::Mother => {
            check_due_date(due_date, today)?;
            Some(Pregnancy::new(auth.id, due_date, today))
        }
        Some(_) => return Err(ApiError::bad_request("Only mothers can track a pregnancy")),
        None => None,
    };

    let AuthContext {
        mut account,
        mut profile,
        ..
    } = auth;
    body.profile.apply(&mut account, &mut profile)?;
    account.onboarding_completed = true;

    state
        .store
        .complete_onboarding(&account, &profile, pregnancy.as_ref())
        .await?;

    info!(account_id = %account.id, with_pregnancy = pregnancy.is_some(), "Onboarding completed");
    Ok(ApiResponse::success(OnboardingResult {
        account,
        profile,
        pregnancy,
    })
    .with_message("Onboarding completed"))
}
