use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::debug;
use uuid::Uuid;

use crate::app::AppState;
use crate::database::models::{Account, Profile};
use crate::error::ApiError;
use crate::types::Role;

/// Authenticated account, inserted into request extensions by `authenticate`
#[derive(Clone, Debug)]
pub struct AuthContext {
    pub id: Uuid,
    pub role: Role,
    pub account: Account,
    pub profile: Profile,
}

impl AuthContext {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_role(&self, allowed: &[Role]) -> Result<(), ApiError> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(ApiError::no_permission())
        }
    }

    pub fn require_owner(&self, owner_id: Uuid) -> Result<(), ApiError> {
        if self.id == owner_id {
            Ok(())
        } else {
            Err(ApiError::no_permission())
        }
    }

    /// Owners may always act; administrators bypass ownership
    pub fn require_owner_or_admin(&self, owner_id: Uuid) -> Result<(), ApiError> {
        if self.id == owner_id || self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::no_permission())
        }
    }

    /// Collaborators must be verified before authoring; admins always may
    pub fn require_verified_author(&self) -> Result<(), ApiError> {
        match self.role {
            Role::Admin => Ok(()),
            Role::Collaborator if self.account.is_verified => Ok(()),
            Role::Collaborator => Err(ApiError::forbidden(
                "Your collaborator account must be verified before publishing content",
            )),
            Role::Mother => Err(ApiError::no_permission()),
        }
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for AuthContext {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

/// Bearer authentication: verifies the token and loads the account with its profile
pub async fn authenticate(State(state): State<AppState>, mut request: Request, next: Next) -> Result<Response, ApiError> {
    let token = extract_bearer(request.headers()).ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    let claims = state
        .tokens
        .verify(&token)
        .map_err(|_| ApiError::unauthorized("Invalid or expired token"))?;

    let found = state
        .store
        .find_account(claims.sub)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired token"))?;

    debug!(account_id = %found.account.id, role = %found.account.role, "Authenticated request");

    request.extensions_mut().insert(AuthContext {
        id: found.account.id,
        role: found.account.role,
        account: found.account,
        profile: found.profile,
    });

    Ok(next.run(request).await)
}

/// Route layer admitting only the listed roles; must run after `authenticate`
pub async fn require_roles(
    State(allowed): State<&'static [Role]>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth = request
        .extensions()
        .get::<AuthContext>()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;
    auth.require_role(allowed)?;
    Ok(next.run(request).await)
}

/// Extract the token from `Authorization: Bearer <token>`
fn extract_bearer(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn extracts_bearer_tokens_only() {
        assert_eq!(extract_bearer(&headers("Bearer abc.def")), Some("abc.def".to_string()));
        assert_eq!(extract_bearer(&headers("Bearer   ")), None);
        assert_eq!(extract_bearer(&headers("Basic dXNlcjpwYXNz")), None);
        assert_eq!(extract_bearer(&HeaderMap::new()), None);
    }

    fn context(role: Role, verified: bool) -> AuthContext {
        let mut account = Account::new("x@example.com", String::new(), "X".into(), "Y".into(), None, role);
        account.is_verified = verified;
        AuthContext {
            id: account.id,
            role,
            profile: Profile::empty_for(role),
            account,
        }
    }

    #[test]
    fn ownership_and_role_checks() {
        let mother = context(Role::Mother, false);
        let admin = context(Role::Admin, true);
        let someone = Uuid::new_v4();

        assert!(mother.require_owner_or_admin(mother.id).is_ok());
        assert_eq!(mother.require_owner_or_admin(someone).unwrap_err().status_code(), 403);
        assert!(admin.require_owner_or_admin(someone).is_ok());
        assert!(admin.require_owner(someone).is_err());
        assert!(mother.require_role(&[Role::Mother]).is_ok());
        assert!(mother.require_role(&[Role::Admin]).is_err());
    }

    #[test]
    fn only_verified_collaborators_author() {
        assert!(context(Role::Collaborator, true).require_verified_author().is_ok());
        assert!(context(Role::Collaborator, false).require_verified_author().is_err());
        assert!(context(Role::Mother, true).require_verified_author().is_err());
        assert!(context(Role::Admin, true).require_verified_author().is_ok());
    }
}
