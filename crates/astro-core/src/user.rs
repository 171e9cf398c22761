use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::patch::{self, double_option};
use crate::validation::{Checker, Validate, ValidationErrors, check_password, is_valid_email};

/// A stored user account. Deliberately not `Serialize`: the password hash
/// must never reach a response body.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub hashed_password: String,
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub is_active: bool,
    pub is_superuser: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Registration payload.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct NewUser {
    /// 3-50 characters
    pub username: String,
    pub email: String,
    /// At least 8 characters with one uppercase letter and one digit
    pub password: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

impl Validate for NewUser {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut c = Checker::new();
        c.length("username", &self.username, 3, 50)
            .ensure(
                is_valid_email(&self.email),
                "email",
                "value is not a valid email address",
            )
            .max_length("email", Some(&self.email), 255)
            .max_length("full_name", self.full_name.as_deref(), 100);
        check_password(&mut c, "password", &self.password);
        c.finish()
    }
}

/// Account data ready for insertion (password already hashed).
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub username: String,
    pub email: String,
    pub hashed_password: String,
    pub full_name: Option<String>,
    pub is_superuser: bool,
}

impl UserRecord {
    pub fn from_registration(user: NewUser, hashed_password: String) -> Self {
        Self {
            username: user.username,
            email: normalize_email(&user.email),
            hashed_password,
            full_name: user.full_name,
            is_superuser: false,
        }
    }
}

/// Self-service profile update (`PUT /auth/me`).
#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
pub struct UserPatch {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub full_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub bio: Option<Option<String>>,
}

impl UserPatch {
    pub fn apply_to(&self, user: &mut User) {
        patch::apply(&mut user.email, self.email.as_deref().map(normalize_email));
        patch::apply(&mut user.full_name, self.full_name.clone());
        patch::apply(&mut user.bio, self.bio.clone());
    }
}

impl Validate for UserPatch {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut c = Checker::new();
        if let Some(email) = &self.email {
            c.ensure(
                is_valid_email(email),
                "email",
                "value is not a valid email address",
            )
            .max_length("email", Some(email), 255);
        }
        c.max_length(
            "full_name",
            self.full_name.as_ref().and_then(|n| n.as_deref()),
            100,
        );
        c.finish()
    }
}

/// Body of `POST /auth/me/change-password`.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct PasswordChange {
    pub old_password: String,
    pub new_password: String,
}

impl Validate for PasswordChange {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut c = Checker::new();
        check_password(&mut c, "new_password", &self.new_password);
        c.finish()
    }
}

/// Login form. `username` may also hold the account email.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Validate for Credentials {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut c = Checker::new();
        c.ensure(!self.username.is_empty(), "username", "field required")
            .ensure(!self.password.is_empty(), "password", "field required");
        c.finish()
    }
}

/// Emails are compared case-insensitively, so they are stored lower-cased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
