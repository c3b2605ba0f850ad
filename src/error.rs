use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::{auth::repo_types::Role, budget::BudgetError, storage::DuplicateEmail};

pub const DUPLICATE_EMAIL_MESSAGE: &str = "User already exists with this email";

/// Errors surfaced at the HTTP boundary.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("Access denied. Insufficient permissions.")]
    Forbidden { required: Vec<Role>, current: Role },

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("storage error: {0}")]
    Storage(anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden { .. } => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        if e.is::<DuplicateEmail>() {
            return AppError::Conflict(DUPLICATE_EMAIL_MESSAGE.into());
        }
        AppError::Storage(e)
    }
}

impl From<BudgetError> for AppError {
    fn from(e: BudgetError) -> Self {
        AppError::Validation(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            AppError::Forbidden { required, current } => json!({
                "success": false,
                "message": self.to_string(),
                "required": required,
                "current": current,
            }),
            AppError::Storage(e) => {
                error!(error = %e, "storage failure");
                json!({
                    "success": false,
                    "message": "Internal server error",
                    "error": e.to_string(),
                })
            }
            _ => json!({ "success": false, "message": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}
