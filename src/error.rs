use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Application-wide error taxonomy. Every handler returns `Result<_, AppError>`
/// and the `IntoResponse` impl is the single place HTTP status codes are chosen.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Email already registered.")]
    DuplicateEmail,

    /// Covers both unknown username and wrong password; the two cases are
    /// deliberately indistinguishable to the client.
    #[error("Invalid credentials.")]
    InvalidCredentials,

    /// Covers never-issued, expired and mismatched reset codes alike.
    #[error("Invalid or expired code.")]
    InvalidResetCode,

    #[error("Resource not found.")]
    NotFound,

    #[error("{0}")]
    Forbidden(String),

    #[error("database error")]
    Database(#[from] sqlx::Error),

    #[error("mail dispatch failed")]
    Mail(#[source] anyhow::Error),

    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::InvalidResetCode => StatusCode::BAD_REQUEST,
            AppError::DuplicateEmail => StatusCode::CONFLICT,
            AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Database(_) | AppError::Mail(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Client-facing message. Internal causes are logged here and never echoed.
    fn message(&self) -> String {
        match self {
            AppError::Database(e) => {
                error!(error = %e, "database error");
                "Server error.".to_string()
            }
            AppError::Mail(e) => {
                error!(error = %e, "mail dispatch failed");
                "Server error.".to_string()
            }
            AppError::Internal(e) => {
                error!(error = %e, "internal error");
                "Server error.".to_string()
            }
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = json!({ "message": self.message() });
        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_matches_taxonomy() {
        assert_eq!(
            AppError::validation("missing field").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::DuplicateEmail.status(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::InvalidCredentials.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AppError::InvalidResetCode.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::Forbidden("nope".into()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::Internal(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_causes_are_not_echoed() {
        let err = AppError::Internal(anyhow::anyhow!("secret connection string"));
        assert_eq!(err.message(), "Server error.");
    }

    #[test]
    fn credential_and_reset_failures_stay_generic() {
        assert_eq!(AppError::InvalidCredentials.message(), "Invalid credentials.");
        assert_eq!(AppError::InvalidResetCode.message(), "Invalid or expired code.");
    }
}
