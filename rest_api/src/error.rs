// rest_api/src/error.rs

use axum::{
    extract::rejection::{BytesRejection, JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use models::errors::{ClinicError, ValidationError};

#[derive(Debug, Error)]
pub enum RestApiError {
    #[error(transparent)]
    Clinic(#[from] ClinicError),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Missing or malformed bearer token")]
    MissingToken,
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },
}

impl From<ValidationError> for RestApiError {
    fn from(err: ValidationError) -> Self {
        RestApiError::Clinic(err.into())
    }
}

impl From<security::AuthError> for RestApiError {
    fn from(err: security::AuthError) -> Self {
        RestApiError::Clinic(err.into())
    }
}

macro_rules! from_rejection {
    ($($rejection:ty),+) => {
        $(impl From<$rejection> for RestApiError {
            fn from(rejection: $rejection) -> Self {
                RestApiError::Rejected {
                    status: rejection.status(),
                    message: rejection.body_text(),
                }
            }
        })+
    };
}

from_rejection!(JsonRejection, QueryRejection, PathRejection, BytesRejection);

fn clinic_status(err: &ClinicError) -> StatusCode {
    match err {
        ClinicError::NotFound { .. } => StatusCode::NOT_FOUND,
        ClinicError::AlreadyExists(_) | ClinicError::Conflict { .. } => StatusCode::CONFLICT,
        ClinicError::InvalidData(_) | ClinicError::Validation(_) | ClinicError::Uuid(_) => {
            StatusCode::BAD_REQUEST
        }
        ClinicError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        ClinicError::Forbidden(_) => StatusCode::FORBIDDEN,
        ClinicError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl RestApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            RestApiError::Clinic(e) => clinic_status(e),
            RestApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            RestApiError::MissingToken => StatusCode::UNAUTHORIZED,
            RestApiError::Rejected { status, .. } => *status,
        }
    }
}

impl IntoResponse for RestApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            error!("request failed: {}", self);
            "Internal server error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
