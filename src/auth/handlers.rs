use axum::{
    extract::{rejection::FormRejection, rejection::PathRejection, FromRef, Path, State},
    routing::{get, post},
    Form, Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{LoginForm, MessageResponse, TokenResponse},
        jwt::JwtKeys,
    },
    error::{AppError, AppResult},
    extract::ValidJson,
    state::AppState,
    users::{
        dto::{UserCreate, UserResponse},
        services::{self, CreateOutcome},
    },
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register/", post(register))
        .route("/login/", post(login))
        .route("/verify-email/:user_id/:token", get(verify_email))
}

#[instrument(skip(state, payload), fields(email = %payload.email))]
pub async fn register(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<UserCreate>,
) -> AppResult<Json<UserResponse>> {
    match services::register_user(state.users.as_ref(), &state.notifier, payload).await? {
        CreateOutcome::Created(user) => {
            info!(user_id = %user.id, "user registered");
            Ok(Json(UserResponse::from(user)))
        }
        CreateOutcome::DuplicateEmail => Err(AppError::bad_request("Email already exists")),
        CreateOutcome::DuplicateNickname => Err(AppError::bad_request("Nickname already exists")),
        CreateOutcome::Invalid(errors) => Err(errors.into()),
    }
}

#[instrument(skip(state, form))]
pub async fn login(
    State(state): State<AppState>,
    form: Result<Form<LoginForm>, FormRejection>,
) -> AppResult<Json<TokenResponse>> {
    let Form(form) = form?;
    let store = state.users.as_ref();

    if services::is_account_locked(store, &form.username).await? {
        warn!(email = %form.username, "login attempt on locked account");
        return Err(AppError::bad_request(
            "Account locked due to too many failed login attempts.",
        ));
    }

    let Some(user) =
        services::login(store, &state.config.accounts, &form.username, &form.password).await?
    else {
        return Err(AppError::unauthorized("Incorrect email or password"));
    };

    let keys = JwtKeys::from_ref(&state);
    let access_token = keys.sign_access(&user.email, user.role)?;
    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer",
    }))
}

#[instrument(skip(state, path))]
pub async fn verify_email(
    State(state): State<AppState>,
    path: Result<Path<(Uuid, String)>, PathRejection>,
) -> AppResult<Json<MessageResponse>> {
    let Path((user_id, token)) = path?;
    if services::verify_email_with_token(state.users.as_ref(), user_id, &token).await? {
        Ok(Json(MessageResponse {
            message: "Email verified successfully".into(),
        }))
    } else {
        Err(AppError::bad_request("Invalid or expired verification token"))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::{
        app::{build_app, testing::*},
        notifier::testing::RecordingTransport,
        state::AppState,
    };

    fn register_body(email: &str, password: &str) -> serde_json::Value {
        json!({
            "email": email,
            "nickname": "shorty",
            "first_name": "Test",
            "last_name": "User",
            "role": "ANONYMOUS",
            "password": password
        })
    }

    #[tokio::test]
    async fn register_fails_with_short_password() {
        let app = build_app(AppState::fake());
        let req = json_request(
            Method::POST,
            "/register/",
            None,
            register_body("shortpass@example.com", "Short1!"),
        );
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body.to_string().contains("Password must be at least 8 characters long"));
    }

    #[tokio::test]
    async fn register_fails_missing_special_char() {
        let app = build_app(AppState::fake());
        let req = json_request(
            Method::POST,
            "/register/",
            None,
            register_body("nospecial@example.com", "ValidPass123"),
        );
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body
            .to_string()
            .contains("Password must include at least one special character"));
    }

    #[tokio::test]
    async fn register_success_with_strong_password() {
        let app = build_app(AppState::fake());
        let req = json_request(
            Method::POST,
            "/register/",
            None,
            register_body("strong@example.com", "StrongPass#123"),
        );
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["email"], "strong@example.com");
        assert!(body.get("hashed_password").is_none());
    }

    #[tokio::test]
    async fn register_rejects_malformed_json_as_unprocessable() {
        let app = build_app(AppState::fake());
        let req = json_request(Method::POST, "/register/", None, json!({ "email": "x@example.com" }));
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["detail"][0]["loc"], json!(["body"]));
    }

    #[tokio::test]
    async fn first_user_admin_second_anonymous() {
        let app = build_app(AppState::fake());
        let (_, first) = register(&app, "first@example.com").await;
        assert_eq!(first["role"], "ADMIN");
        assert_eq!(first["email_verified"], true);

        let (status, second) = register(&app, "second@example.com").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(second["role"], "ANONYMOUS");
        assert_eq!(second["email_verified"], false);
    }

    #[tokio::test]
    async fn duplicate_registration_is_bad_request() {
        let app = build_app(AppState::fake());
        register(&app, "dup@example.com").await;
        let (status, body) = register(&app, "dup@example.com").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "Email already exists");
    }

    #[tokio::test]
    async fn login_issues_bearer_token_with_role() {
        let state = AppState::fake();
        let app = build_app(state.clone());
        register(&app, "admin@example.com").await;

        let (status, body) = login(&app, "admin@example.com", STRONG_PASSWORD).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["token_type"], "bearer");

        let keys = crate::auth::jwt::JwtKeys::from(&state.config.jwt);
        let claims = keys.verify(body["access_token"].as_str().unwrap()).unwrap();
        assert_eq!(claims.sub, "admin@example.com");
        assert_eq!(claims.role, crate::users::repo_types::UserRole::Admin);
    }

    #[tokio::test]
    async fn bad_password_is_unauthorized_then_locked() {
        let app = build_app(AppState::fake());
        register(&app, "admin@example.com").await;

        for _ in 0..3 {
            let (status, body) = login(&app, "admin@example.com", "Wrong#Pass1").await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(body["detail"], "Incorrect email or password");
        }

        let (status, body) = login(&app, "admin@example.com", STRONG_PASSWORD).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["detail"],
            "Account locked due to too many failed login attempts."
        );
    }

    #[tokio::test]
    async fn verify_email_link_from_mail_works_once() {
        let transport = Arc::new(RecordingTransport::default());
        let app = build_app(AppState::fake_with_transport(transport.clone()));
        register(&app, "admin@example.com").await;
        register(&app, "second@example.com").await;

        let (status, _) = login(&app, "second@example.com", STRONG_PASSWORD).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let sent = transport.sent();
        let link = sent[0]
            .body
            .lines()
            .find(|l| l.starts_with("http://api.test/verify-email/"))
            .unwrap();
        let path = link.trim_start_matches("http://api.test");

        let (status, body) = send(&app, empty_request(Method::GET, path, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Email verified successfully");

        let (status, body) = send(&app, empty_request(Method::GET, path, None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "Invalid or expired verification token");

        let (status, _) = login(&app, "second@example.com", STRONG_PASSWORD).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn verify_email_rejects_malformed_id() {
        let app = build_app(AppState::fake());
        let (status, _) = send(&app, empty_request(Method::GET, "/verify-email/not-a-uuid/tok", None)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }
}
