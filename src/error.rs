use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Domain errors surfaced at the handler boundary.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),

    #[error("Email already registered")]
    DuplicateEmail,

    #[error("User not found")]
    NotFound,

    #[error("User already verified")]
    AlreadyVerified,

    #[error("OTP not found, please request a new one")]
    OtpMissing,

    #[error("OTP expired")]
    OtpExpired,

    #[error("Incorrect OTP")]
    OtpMismatch,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Email not verified")]
    NotVerified,

    #[error("{0}")]
    TokenInvalid(String),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

/// Canonical error body: `{"success": false, "message": "..."}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_)
            | Self::DuplicateEmail
            | Self::AlreadyVerified
            | Self::OtpMissing
            | Self::OtpExpired
            | Self::OtpMismatch => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::InvalidCredentials | Self::NotVerified | Self::TokenInvalid(_) => {
                StatusCode::UNAUTHORIZED
            }
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if let Self::Internal(cause) = &self {
            error!(error = %format!("{cause:#}"), "internal error");
        }
        let body = ErrorBody {
            success: false,
            message: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        // The unique index on users.email is the authority on concurrent
        // registrations; the loser of the race lands here.
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() {
                return Self::DuplicateEmail;
            }
        }
        Self::Internal(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_failures_are_unauthorized() {
        assert_eq!(AuthError::InvalidCredentials.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::NotVerified.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AuthError::TokenInvalid("bad".into()).status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn otp_and_validation_failures_are_bad_request() {
        assert_eq!(AuthError::DuplicateEmail.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AuthError::AlreadyVerified.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AuthError::OtpMissing.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AuthError::OtpExpired.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AuthError::OtpMismatch.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AuthError::Validation("Name is required".into()).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn unknown_user_on_otp_endpoints_is_not_found() {
        assert_eq!(AuthError::NotFound.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn credential_failures_share_one_message() {
        // Absent record and wrong password must be indistinguishable.
        assert_eq!(
            AuthError::InvalidCredentials.to_string(),
            "Invalid email or password"
        );
    }

    #[test]
    fn error_body_shape() {
        let body = ErrorBody {
            success: false,
            message: AuthError::OtpExpired.to_string(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "OTP expired");
    }

    #[test]
    fn internal_error_hides_the_cause() {
        let err = AuthError::Internal(anyhow::anyhow!("connection refused"));
        assert_eq!(err.to_string(), "Internal server error");
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
