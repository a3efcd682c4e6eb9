use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::users::{
    repo_types::{User, UserRole},
    validation::{normalize_email, trim_opt, validate_nickname, validate_password, Normalize},
};

pub const DEFAULT_PAGE_LIMIT: i64 = 10;

/// Registration / creation payload. Unknown keys are ignored.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UserCreate {
    #[validate(email(message = "value is not a valid email address"))]
    pub email: String,
    #[validate(custom(function = "validate_password"))]
    pub password: String,
    #[validate(custom(function = "validate_nickname"))]
    pub nickname: Option<String>,
    #[validate(length(max = 100, message = "Name must be at most 100 characters long"))]
    pub first_name: Option<String>,
    #[validate(length(max = 100, message = "Name must be at most 100 characters long"))]
    pub last_name: Option<String>,
    #[validate(length(max = 500, message = "Bio must be at most 500 characters long"))]
    pub bio: Option<String>,
    #[validate(url(message = "Invalid URL format"))]
    pub profile_picture_url: Option<String>,
    #[validate(url(message = "Invalid URL format"))]
    pub linkedin_profile_url: Option<String>,
    #[validate(url(message = "Invalid URL format"))]
    pub github_profile_url: Option<String>,
}

impl Normalize for UserCreate {
    fn normalize(&mut self) {
        self.email = normalize_email(&self.email);
        trim_opt(&mut self.nickname);
        trim_opt(&mut self.first_name);
        trim_opt(&mut self.last_name);
        trim_opt(&mut self.bio);
        trim_opt(&mut self.profile_picture_url);
        trim_opt(&mut self.linkedin_profile_url);
        trim_opt(&mut self.github_profile_url);
    }
}

/// Body of `POST /users/`: a registration payload plus an optional role that
/// only an admin may grant.
#[derive(Debug, Clone, Deserialize)]
pub struct AdminUserCreate {
    #[serde(flatten)]
    pub user: UserCreate,
    pub role: Option<UserRole>,
}

impl Normalize for AdminUserCreate {
    fn normalize(&mut self) {
        self.user.normalize();
    }
}

impl Validate for AdminUserCreate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        self.user.validate()
    }
}

/// Fields a management client may change. Privileged flags (`role`,
/// `email_verified`, `is_professional`, `is_locked`, ...) have no slot here and
/// are dropped during deserialisation.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[validate(schema(function = "require_any_field"))]
pub struct UserUpdate {
    #[validate(email(message = "value is not a valid email address"))]
    pub email: Option<String>,
    #[validate(custom(function = "validate_nickname"))]
    pub nickname: Option<String>,
    #[validate(custom(function = "validate_password"))]
    pub password: Option<String>,
    #[validate(length(max = 100, message = "Name must be at most 100 characters long"))]
    pub first_name: Option<String>,
    #[validate(length(max = 100, message = "Name must be at most 100 characters long"))]
    pub last_name: Option<String>,
    #[validate(length(max = 500, message = "Bio must be at most 500 characters long"))]
    pub bio: Option<String>,
    #[validate(url(message = "Invalid URL format"))]
    pub profile_picture_url: Option<String>,
    #[validate(url(message = "Invalid URL format"))]
    pub linkedin_profile_url: Option<String>,
    #[validate(url(message = "Invalid URL format"))]
    pub github_profile_url: Option<String>,
}

impl UserUpdate {
    fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.nickname.is_none()
            && self.password.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.bio.is_none()
            && self.profile_picture_url.is_none()
            && self.linkedin_profile_url.is_none()
            && self.github_profile_url.is_none()
    }
}

fn require_any_field(update: &UserUpdate) -> Result<(), ValidationError> {
    if update.is_empty() {
        let mut err = ValidationError::new("empty_update");
        err.message = Some("At least one field must be provided for update".into());
        return Err(err);
    }
    Ok(())
}

impl Normalize for UserUpdate {
    fn normalize(&mut self) {
        if let Some(email) = self.email.as_mut() {
            *email = normalize_email(email);
        }
        trim_opt(&mut self.nickname);
        trim_opt(&mut self.first_name);
        trim_opt(&mut self.last_name);
        trim_opt(&mut self.bio);
        trim_opt(&mut self.profile_picture_url);
        trim_opt(&mut self.linkedin_profile_url);
        trim_opt(&mut self.github_profile_url);
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(custom(function = "validate_password"))]
    pub new_password: String,
}

impl Normalize for ResetPasswordRequest {}

/// `skip` is capped so link arithmetic stays far from `i64::MAX`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ListParams {
    #[serde(default)]
    #[validate(range(
        min = 0,
        max = 1_000_000_000,
        message = "skip must be between 0 and 1000000000"
    ))]
    pub skip: i64,
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 100, message = "limit must be between 1 and 100"))]
    pub limit: i64,
}

fn default_limit() -> i64 {
    DEFAULT_PAGE_LIMIT
}

/// HATEOAS link attached to responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    pub rel: String,
    pub href: String,
    pub method: String,
}

impl Link {
    pub fn new(rel: &str, href: String, method: &str) -> Self {
        Self {
            rel: rel.to_string(),
            href,
            method: method.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub nickname: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub profile_picture_url: Option<String>,
    pub linkedin_profile_url: Option<String>,
    pub github_profile_url: Option<String>,
    pub role: UserRole,
    pub email_verified: bool,
    pub is_professional: bool,
    pub is_locked: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub professional_status_updated_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_login_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            nickname: u.nickname,
            first_name: u.first_name,
            last_name: u.last_name,
            bio: u.bio,
            profile_picture_url: u.profile_picture_url,
            linkedin_profile_url: u.linkedin_profile_url,
            github_profile_url: u.github_profile_url,
            role: u.role,
            email_verified: u.email_verified,
            is_professional: u.is_professional,
            is_locked: u.is_locked,
            professional_status_updated_at: u.professional_status_updated_at,
            last_login_at: u.last_login_at,
            created_at: u.created_at,
            updated_at: u.updated_at,
            links: Vec::new(),
        }
    }
}

impl UserResponse {
    pub fn with_links(mut self, links: Vec<Link>) -> Self {
        self.links = links;
        self
    }
}

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub items: Vec<UserResponse>,
    pub total: i64,
    pub page: i64,
    pub size: usize,
    pub links: Vec<Link>,
}
