//! Centralized error type for the HTTP surface
//!
//! Every fallible handler returns `Result<_, ApiError>`; `ApiError`
//! implements `IntoResponse` so axum can turn it directly into a JSON body
//! with the right status code.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("concept '{code}' not found")]
    NotFound { code: String },

    #[error("bad request: {message}")]
    BadRequest { message: String },

    #[error("upstream database error: {0}")]
    Upstream(#[from] sqlx::Error),
}

impl ApiError {
    pub fn not_found(code: impl Into<String>) -> Self {
        Self::NotFound { code: code.into() }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            // Deliberately empty body: a missing concept isn't a
            // processing error, nothing to explain beyond the status code.
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND.into_response(),
            ApiError::BadRequest { message } => {
                (StatusCode::BAD_REQUEST, Json(ErrorBody { error: message })).into_response()
            }
            ApiError::Upstream(e) => {
                tracing::error!(error = %e, "upstream database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorBody {
                        error: e.to_string(),
                    }),
                )
                    .into_response()
            }
        }
    }
}
