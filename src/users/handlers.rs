use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::extractors::StaffUser,
    error::{AppError, AppResult},
    extract::ValidJson,
    state::AppState,
    users::{
        dto::{AdminUserCreate, ListParams, ResetPasswordRequest, UserListResponse, UserResponse, UserUpdate},
        links::{create_user_links, generate_pagination_links},
        repo_types::{User, UserRole},
        services::{self, CreateOutcome, UpdateOutcome},
    },
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users/", get(list_users).post(create_user))
        .route(
            "/users/:user_id",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/users/:user_id/upgrade", post(upgrade_user))
        .route("/users/:user_id/reset-password", post(reset_password))
}

fn user_response(state: &AppState, user: User) -> UserResponse {
    let links = create_user_links(&state.config.server_base_url, user.id);
    UserResponse::from(user).with_links(links)
}

fn user_not_found() -> AppError {
    AppError::not_found("User not found")
}

#[instrument(skip(state, path))]
pub async fn get_user(
    State(state): State<AppState>,
    StaffUser(actor): StaffUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> AppResult<Json<UserResponse>> {
    let Path(user_id) = path?;
    let user = services::get_by_id(state.users.as_ref(), user_id)
        .await?
        .ok_or_else(user_not_found)?;
    Ok(Json(user_response(&state, user)))
}

#[instrument(skip(state, path, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    StaffUser(actor): StaffUser,
    path: Result<Path<Uuid>, PathRejection>,
    ValidJson(payload): ValidJson<UserUpdate>,
) -> AppResult<Json<UserResponse>> {
    let Path(user_id) = path?;
    match services::update(state.users.as_ref(), user_id, payload).await? {
        UpdateOutcome::Updated(user) => Ok(Json(user_response(&state, user))),
        UpdateOutcome::NotFound => Err(user_not_found()),
        UpdateOutcome::DuplicateEmail => Err(AppError::bad_request("Email already exists")),
        UpdateOutcome::DuplicateNickname => Err(AppError::bad_request("Nickname already exists")),
        UpdateOutcome::Invalid(errors) => Err(errors.into()),
    }
}

#[instrument(skip(state, path))]
pub async fn delete_user(
    State(state): State<AppState>,
    StaffUser(actor): StaffUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> AppResult<StatusCode> {
    let Path(user_id) = path?;
    if services::delete(state.users.as_ref(), user_id).await? {
        info!(user_id = %user_id, by = %actor.email, "user deleted by staff");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(user_not_found())
    }
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    StaffUser(actor): StaffUser,
    ValidJson(payload): ValidJson<AdminUserCreate>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    if payload.role.is_some() && actor.role != UserRole::Admin {
        warn!(by = %actor.email, "non-admin tried to assign a role");
        return Err(AppError::forbidden("Only administrators may assign roles"));
    }

    let AdminUserCreate { user, role } = payload;
    let outcome =
        services::create_with_role(state.users.as_ref(), &state.notifier, user, role).await?;
    match outcome {
        CreateOutcome::Created(user) => {
            info!(user_id = %user.id, by = %actor.email, "user created by staff");
            Ok((StatusCode::CREATED, Json(user_response(&state, user))))
        }
        CreateOutcome::DuplicateEmail => Err(AppError::bad_request("Email already exists")),
        CreateOutcome::DuplicateNickname => Err(AppError::bad_request("Nickname already exists")),
        CreateOutcome::Invalid(errors) => Err(errors.into()),
    }
}

#[instrument(skip(state, query))]
pub async fn list_users(
    State(state): State<AppState>,
    StaffUser(actor): StaffUser,
    query: Result<Query<ListParams>, QueryRejection>,
) -> AppResult<Json<UserListResponse>> {
    let Query(params) = query?;
    params
        .validate()
        .map_err(|e| AppError::invalid_query(&e))?;

    let store = state.users.as_ref();
    let total = services::count(store).await?;
    let users = services::list_users(store, params.skip, params.limit).await?;
    let items: Vec<UserResponse> = users.into_iter().map(UserResponse::from).collect();

    Ok(Json(UserListResponse {
        total,
        page: params.skip / params.limit + 1,
        size: items.len(),
        items,
        links: generate_pagination_links(
            &state.config.server_base_url,
            params.skip,
            params.limit,
            total,
        ),
    }))
}

#[instrument(skip(state, path))]
pub async fn upgrade_user(
    State(state): State<AppState>,
    StaffUser(actor): StaffUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> AppResult<Json<UserResponse>> {
    let Path(user_id) = path?;
    let user = services::upgrade_to_professional(state.users.as_ref(), &state.notifier, user_id)
        .await?
        .ok_or_else(user_not_found)?;
    Ok(Json(user_response(&state, user)))
}

#[instrument(skip(state, path, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    StaffUser(actor): StaffUser,
    path: Result<Path<Uuid>, PathRejection>,
    ValidJson(payload): ValidJson<ResetPasswordRequest>,
) -> AppResult<Json<UserResponse>> {
    let Path(user_id) = path?;
    let user = services::reset_password(state.users.as_ref(), user_id, &payload.new_password)
        .await?
        .ok_or_else(user_not_found)?;
    info!(user_id = %user_id, by = %actor.email, "password reset by staff");
    Ok(Json(user_response(&state, user)))
}
