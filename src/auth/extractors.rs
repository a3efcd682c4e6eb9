use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use tracing::warn;

use crate::{auth::jwt::JwtKeys, error::AppError, users::repo_types::UserRole};

/// Caller identified by a valid bearer token.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub email: String,
    pub role: UserRole,
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("Not authenticated"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .or_else(|| auth_header.strip_prefix("bearer "))
            .ok_or_else(|| AppError::unauthorized("Not authenticated"))?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify(token).map_err(|e| {
            warn!(error = %e, "invalid or expired token");
            AppError::unauthorized("Could not validate credentials")
        })?;

        Ok(CurrentUser {
            email: claims.sub,
            role: claims.role,
        })
    }
}

/// Caller holding `ADMIN` or `MANAGER`.
#[derive(Debug, Clone)]
pub struct StaffUser(pub CurrentUser);

#[async_trait]
impl<S> FromRequestParts<S> for StaffUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        if !user.role.is_staff() {
            warn!(email = %user.email, role = %user.role, "role not permitted");
            return Err(AppError::forbidden("Operation not permitted"));
        }
        Ok(StaffUser(user))
    }
}
