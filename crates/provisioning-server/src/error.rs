//! HTTP error taxonomy of the provisioning API.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use provisioning_core::{errcode, ErrorBody};
use thiserror::Error;

/// A request failure, rendered as `{success:false, error, errcode}`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Bad or missing shared secret.
    #[error("Invalid auth token")]
    Authorization,

    #[error("missing {0} parameter")]
    MissingParam(&'static str),

    /// Precondition on the caller's session not met.
    #[error("{error}")]
    StateConflict { error: String, errcode: String },

    #[error("{error}")]
    NotFound { error: String, errcode: String },

    /// A collaborator call failed.
    #[error("{error}")]
    Upstream { error: String, errcode: String },
}

impl ApiError {
    pub fn conflict(error: impl Into<String>, errcode: impl Into<String>) -> Self {
        ApiError::StateConflict {
            error: error.into(),
            errcode: errcode.into(),
        }
    }

    pub fn not_found(error: impl Into<String>, errcode: impl Into<String>) -> Self {
        ApiError::NotFound {
            error: error.into(),
            errcode: errcode.into(),
        }
    }

    pub fn upstream(error: impl Into<String>, errcode: impl Into<String>) -> Self {
        ApiError::Upstream {
            error: error.into(),
            errcode: errcode.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Authorization => StatusCode::FORBIDDEN,
            ApiError::MissingParam(_) => StatusCode::BAD_REQUEST,
            ApiError::StateConflict { .. } => StatusCode::CONFLICT,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Upstream { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn body(&self) -> ErrorBody {
        match self {
            ApiError::Authorization => ErrorBody::new(self.to_string(), errcode::FORBIDDEN),
            ApiError::MissingParam(_) => ErrorBody::new(self.to_string(), errcode::MISSING_PARAM),
            ApiError::StateConflict { error, errcode }
            | ApiError::NotFound { error, errcode }
            | ApiError::Upstream { error, errcode } => ErrorBody::new(error, errcode),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}
