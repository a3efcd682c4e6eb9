use axum::{
    extract::rejection::{FormRejection, JsonRejection, PathRejection, QueryRejection},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use tracing::error;
use validator::ValidationErrors;

use crate::users::repo::StoreError;

/// Struct-level rule failures are keyed under this name by `validator`.
const SCHEMA_KEY: &str = "__all__";

pub type AppResult<T> = Result<T, AppError>;

/// One failed rule, shaped like `{"loc": [...], "msg": ..., "type": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub loc: Vec<String>,
    pub msg: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl FieldError {
    pub fn new(loc: &[&str], msg: impl Into<String>, kind: &str) -> Self {
        Self {
            loc: loc.iter().map(|s| s.to_string()).collect(),
            msg: msg.into(),
            kind: kind.to_string(),
        }
    }

    /// Flatten `validator` output into detail entries under `root`
    /// (`body`, `query`), ordered by field name.
    pub fn collect(root: &str, errors: &ValidationErrors) -> Vec<FieldError> {
        let mut fields: Vec<(String, Vec<validator::ValidationError>)> = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| (field.to_string(), errs.clone()))
            .collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));

        let mut out = Vec::new();
        for (field, errs) in fields {
            for err in errs {
                let msg = err
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| err.code.to_string());
                let loc = if field == SCHEMA_KEY {
                    vec![root]
                } else {
                    vec![root, field.as_str()]
                };
                out.push(FieldError::new(&loc, msg, "value_error"));
            }
        }
        out
    }
}

/// Errors surfaced by handlers. Expected faults render as `{"detail": ...}`,
/// anything else as a generic `{"message": ...}` 500.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("validation failed: {0:?}")]
    Validation(Vec<FieldError>),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn invalid(loc: &[&str], msg: impl Into<String>, kind: &str) -> Self {
        Self::Validation(vec![FieldError::new(loc, msg, kind)])
    }

    /// Rule failures from a query string rather than a body.
    pub fn invalid_query(errors: &ValidationErrors) -> Self {
        Self::Validation(FieldError::collect("query", errors))
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            AppError::Validation(errors) => (status, Json(json!({ "detail": errors }))).into_response(),
            AppError::Unauthorized(detail) => (
                status,
                [(header::WWW_AUTHENTICATE, "Bearer")],
                Json(json!({ "detail": detail })),
            )
                .into_response(),
            AppError::BadRequest(detail) | AppError::Forbidden(detail) | AppError::NotFound(detail) => {
                (status, Json(json!({ "detail": detail }))).into_response()
            }
            AppError::Internal(e) => {
                error!(error = ?e, "unhandled error");
                (
                    status,
                    Json(json!({ "message": "An unexpected error occurred." })),
                )
                    .into_response()
            }
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(FieldError::collect("body", &errors))
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        Self::Internal(anyhow::Error::new(err))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rej: JsonRejection) -> Self {
        Self::invalid(&["body"], rej.body_text(), "json_invalid")
    }
}

impl From<FormRejection> for AppError {
    fn from(rej: FormRejection) -> Self {
        Self::invalid(&["body"], rej.body_text(), "form_invalid")
    }
}

impl From<PathRejection> for AppError {
    fn from(rej: PathRejection) -> Self {
        Self::invalid(&["path"], rej.body_text(), "path_invalid")
    }
}

impl From<QueryRejection> for AppError {
    fn from(rej: QueryRejection) -> Self {
        Self::invalid(&["query"], rej.body_text(), "query_invalid")
    }
}
