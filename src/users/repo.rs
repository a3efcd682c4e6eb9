use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::users::repo_types::User;

/// Which unique column a write collided with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Email,
    Nickname,
}

pub const EMAIL_CONSTRAINT: &str = "users_email_key";
pub const NICKNAME_CONSTRAINT: &str = "users_nickname_key";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unique constraint `{0}` violated")]
    UniqueViolation(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StoreError {
    pub fn conflicting_field(&self) -> Option<UniqueField> {
        match self {
            StoreError::UniqueViolation(c) if c == EMAIL_CONSTRAINT => Some(UniqueField::Email),
            StoreError::UniqueViolation(c) if c == NICKNAME_CONSTRAINT => {
                Some(UniqueField::Nickname)
            }
            _ => None,
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let Some(db) = e.as_database_error() {
            if db.is_unique_violation() {
                return StoreError::UniqueViolation(db.constraint().unwrap_or_default().to_string());
            }
        }
        StoreError::Other(anyhow::Error::new(e).context("database query"))
    }
}

/// Profile columns an update may touch. `None` leaves the column as is.
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub email: Option<String>,
    pub nickname: Option<String>,
    pub hashed_password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub profile_picture_url: Option<String>,
    pub linkedin_profile_url: Option<String>,
    pub github_profile_url: Option<String>,
}

/// Persistence for user records. Every call is a single statement.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_nickname(&self, nickname: &str) -> Result<Option<User>, StoreError>;
    async fn count(&self) -> Result<i64, StoreError>;
    async fn list(&self, skip: i64, limit: i64) -> Result<Vec<User>, StoreError>;
    async fn insert(&self, user: &User) -> Result<User, StoreError>;
    async fn update_profile(
        &self,
        id: Uuid,
        changes: &ProfileChanges,
    ) -> Result<Option<User>, StoreError>;
    /// Write back the account state columns (role, verification, lockout,
    /// professional status, password, last login).
    async fn save(&self, user: &User) -> Result<Option<User>, StoreError>;
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;
}

macro_rules! user_columns {
    () => {
        r#"id, email, nickname, hashed_password, role, email_verified, verification_token,
           is_locked, failed_login_attempts, is_professional, professional_status_updated_at,
           last_login_at, first_name, last_name, bio, profile_picture_url,
           linkedin_profile_url, github_profile_url, created_at, updated_at"#
    };
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(concat!(
            "SELECT ",
            user_columns!(),
            " FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(concat!(
            "SELECT ",
            user_columns!(),
            " FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_nickname(&self, nickname: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(concat!(
            "SELECT ",
            user_columns!(),
            " FROM users WHERE nickname = $1"
        ))
        .bind(nickname)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn count(&self) -> Result<i64, StoreError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.db)
            .await?;
        Ok(count)
    }

    async fn list(&self, skip: i64, limit: i64) -> Result<Vec<User>, StoreError> {
        let rows = sqlx::query_as::<_, User>(concat!(
            "SELECT ",
            user_columns!(),
            " FROM users ORDER BY created_at ASC, id ASC LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(skip)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn insert(&self, user: &User) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(concat!(
            r#"
            INSERT INTO users (id, email, nickname, hashed_password, role, email_verified,
                               verification_token, first_name, last_name, bio,
                               profile_picture_url, linkedin_profile_url, github_profile_url,
                               created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING "#,
            user_columns!()
        ))
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.nickname)
        .bind(&user.hashed_password)
        .bind(user.role)
        .bind(user.email_verified)
        .bind(&user.verification_token)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.bio)
        .bind(&user.profile_picture_url)
        .bind(&user.linkedin_profile_url)
        .bind(&user.github_profile_url)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        changes: &ProfileChanges,
    ) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(concat!(
            r#"
            UPDATE users SET
                email = COALESCE($2, email),
                nickname = COALESCE($3, nickname),
                hashed_password = COALESCE($4, hashed_password),
                first_name = COALESCE($5, first_name),
                last_name = COALESCE($6, last_name),
                bio = COALESCE($7, bio),
                profile_picture_url = COALESCE($8, profile_picture_url),
                linkedin_profile_url = COALESCE($9, linkedin_profile_url),
                github_profile_url = COALESCE($10, github_profile_url),
                updated_at = now()
            WHERE id = $1
            RETURNING "#,
            user_columns!()
        ))
        .bind(id)
        .bind(&changes.email)
        .bind(&changes.nickname)
        .bind(&changes.hashed_password)
        .bind(&changes.first_name)
        .bind(&changes.last_name)
        .bind(&changes.bio)
        .bind(&changes.profile_picture_url)
        .bind(&changes.linkedin_profile_url)
        .bind(&changes.github_profile_url)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn save(&self, user: &User) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(concat!(
            r#"
            UPDATE users SET
                hashed_password = $2,
                role = $3,
                email_verified = $4,
                verification_token = $5,
                is_locked = $6,
                failed_login_attempts = $7,
                is_professional = $8,
                professional_status_updated_at = $9,
                last_login_at = $10,
                updated_at = now()
            WHERE id = $1
            RETURNING "#,
            user_columns!()
        ))
        .bind(user.id)
        .bind(&user.hashed_password)
        .bind(user.role)
        .bind(user.email_verified)
        .bind(&user.verification_token)
        .bind(user.is_locked)
        .bind(user.failed_login_attempts)
        .bind(user.is_professional)
        .bind(user.professional_status_updated_at)
        .bind(user.last_login_at)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflicting_field_maps_constraint_names() {
        let email = StoreError::UniqueViolation(EMAIL_CONSTRAINT.into());
        let nickname = StoreError::UniqueViolation(NICKNAME_CONSTRAINT.into());
        let other = StoreError::Other(anyhow::anyhow!("boom"));
        assert_eq!(email.conflicting_field(), Some(UniqueField::Email));
        assert_eq!(nickname.conflicting_field(), Some(UniqueField::Nickname));
        assert_eq!(other.conflicting_field(), None);
    }
}
