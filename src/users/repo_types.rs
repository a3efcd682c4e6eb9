use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Access tier of a user. Stored as the `user_role` Postgres enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Anonymous,
    Authenticated,
    Manager,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Anonymous => "ANONYMOUS",
            UserRole::Authenticated => "AUTHENTICATED",
            UserRole::Manager => "MANAGER",
            UserRole::Admin => "ADMIN",
        }
    }

    /// Roles allowed to use the user-management endpoints.
    pub fn is_staff(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::Manager)
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub nickname: String,
    pub hashed_password: String, // Argon2 PHC string
    pub role: UserRole,
    pub email_verified: bool,
    pub verification_token: Option<String>,
    pub is_locked: bool,
    pub failed_login_attempts: i32,
    pub is_professional: bool,
    pub professional_status_updated_at: Option<OffsetDateTime>,
    pub last_login_at: Option<OffsetDateTime>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub profile_picture_url: Option<String>,
    pub linkedin_profile_url: Option<String>,
    pub github_profile_url: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl User {
    /// A fresh, unsaved user with default account state.
    pub fn new(email: String, nickname: String, hashed_password: String, role: UserRole) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: Uuid::new_v4(),
            email,
            nickname,
            hashed_password,
            role,
            email_verified: false,
            verification_token: None,
            is_locked: false,
            failed_login_attempts: 0,
            is_professional: false,
            professional_status_updated_at: None,
            last_login_at: None,
            first_name: None,
            last_name: None,
            bio: None,
            profile_picture_url: None,
            linkedin_profile_url: None,
            github_profile_url: None,
            created_at: now,
            updated_at: now,
        }
    }
}
