use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::types::Role;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub role: Role,
    pub is_verified: bool,
    pub onboarding_completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn new(
        email: &str,
        password_hash: String,
        first_name: String,
        last_name: String,
        phone: Option<String>,
        role: Role,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email: normalize_email(email),
            password_hash,
            first_name,
            last_name,
            phone,
            role,
            // administrators are provisioned by operators and start verified
            is_verified: role == Role::Admin,
            onboarding_completed: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

/// Emails are compared and stored lower-case
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromRow)]
pub struct MotherProfile {
    pub date_of_birth: Option<NaiveDate>,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub first_pregnancy: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromRow)]
pub struct CollaboratorProfile {
    pub profession: Option<String>,
    pub credentials: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub verified_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromRow)]
pub struct AdminProfile {
    pub department: Option<String>,
}

/// Role-specific profile; exactly one exists per account and its variant always matches `Account::role`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Profile {
    Mother(MotherProfile),
    Collaborator(CollaboratorProfile),
    Admin(AdminProfile),
}

impl Profile {
    pub fn empty_for(role: Role) -> Self {
        match role {
            Role::Mother => Profile::Mother(MotherProfile::default()),
            Role::Collaborator => Profile::Collaborator(CollaboratorProfile::default()),
            Role::Admin => Profile::Admin(AdminProfile::default()),
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Profile::Mother(_) => Role::Mother,
            Profile::Collaborator(_) => Role::Collaborator,
            Profile::Admin(_) => Role::Admin,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountWithProfile {
    pub account: Account,
    pub profile: Profile,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_is_never_serialized() {
        let account = Account::new(
            "Jane@Example.com ",
            "$2b$hash".to_string(),
            "Jane".to_string(),
            "Doe".to_string(),
            None,
            Role::Mother,
        );
        let value = serde_json::to_value(&account).unwrap();
        assert!(value.get("password_hash").is_none());
        assert_eq!(value["email"], "jane@example.com");
        assert_eq!(value["role"], "mother");
    }

    #[test]
    fn profile_is_tagged_by_role() {
        let profile = Profile::empty_for(Role::Collaborator);
        assert_eq!(profile.role(), Role::Collaborator);
        let value = serde_json::to_value(&profile).unwrap();
        assert_eq!(value["role"], "collaborator");
        assert!(value.get("profession").is_some());
    }

    #[test]
    fn only_admins_start_verified() {
        let admin = Account::new("a@b.co", String::new(), "A".into(), "B".into(), None, Role::Admin);
        let mother = Account::new("m@b.co", String::new(), "M".into(), "B".into(), None, Role::Mother);
        assert!(admin.is_verified);
        assert!(!mother.is_verified);
    }
}
