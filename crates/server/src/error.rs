//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//! Responses carry a JSON body of the form `{"error": "<message>"}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::{AuthError, BindError, ClaimError, EditError};

/// Message shown for registrations that created an account but no profile.
pub const PARTIAL_REGISTRATION_MESSAGE: &str = "Your account was created but the tag could not be linked. \
     Please sign in and try again, or contact support.";

/// Application-level error type for the server.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Claim operation failed.
    #[error("Claim error: {0}")]
    Claim(#[from] ClaimError),

    /// Registration failed.
    #[error("Registration error: {0}")]
    Bind(#[from] BindError),

    /// Profile update failed.
    #[error("Profile error: {0}")]
    Edit(#[from] EditError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User is authenticated but may not act on the resource.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Auth(err) => auth_status(err),
            Self::Claim(err) => claim_status(err),
            Self::Bind(err) => match err {
                BindError::Validation(_) => StatusCode::BAD_REQUEST,
                BindError::AlreadyClaimed(_) => StatusCode::CONFLICT,
                BindError::Auth(auth) => auth_status(auth),
                BindError::Claim(claim) => claim_status(claim),
                BindError::PartialRegistration { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Edit(err) => match err {
                EditError::Validation(_) => StatusCode::BAD_REQUEST,
                EditError::NotFound => StatusCode::NOT_FOUND,
                EditError::InProgress => StatusCode::CONFLICT,
                EditError::UploadFailed(_) => StatusCode::BAD_GATEWAY,
                EditError::Media(_) | EditError::Repository(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    // Don't expose internal error details to clients
    fn public_message(&self) -> String {
        match self {
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::Auth(err) => auth_message(err),
            Self::Claim(err) => claim_message(err),
            Self::Bind(err) => match err {
                BindError::Validation(msg) => msg.clone(),
                BindError::AlreadyClaimed(_) => "This tag has already been claimed".to_string(),
                BindError::Auth(auth) => auth_message(auth),
                BindError::Claim(claim) => claim_message(claim),
                BindError::PartialRegistration { .. } => PARTIAL_REGISTRATION_MESSAGE.to_string(),
            },
            Self::Edit(err) => match err {
                EditError::Validation(msg) => msg.clone(),
                EditError::NotFound => "Profile not found".to_string(),
                EditError::InProgress => "Another update is already in progress".to_string(),
                EditError::UploadFailed(_) => {
                    "Photo upload failed, your profile was not changed".to_string()
                }
                EditError::Media(_) | EditError::Repository(_) => {
                    "Internal server error".to_string()
                }
            },
            Self::NotFound(msg)
            | Self::Unauthorized(msg)
            | Self::Forbidden(msg)
            | Self::BadRequest(msg) => msg.clone(),
        }
    }
}

const fn auth_status(err: &AuthError) -> StatusCode {
    match err {
        AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        AuthError::AccountAlreadyExists => StatusCode::CONFLICT,
        AuthError::WeakPassword(_) | AuthError::InvalidEmail(_) => StatusCode::BAD_REQUEST,
        AuthError::Unavailable(_) => StatusCode::BAD_GATEWAY,
        AuthError::Repository(_) | AuthError::PasswordHash => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn auth_message(err: &AuthError) -> String {
    match err {
        AuthError::InvalidCredentials => "Invalid credentials".to_string(),
        AuthError::AccountAlreadyExists => "An account with this email already exists".to_string(),
        AuthError::WeakPassword(msg) => msg.clone(),
        AuthError::InvalidEmail(_) => "Invalid email address".to_string(),
        AuthError::Unavailable(_) => "Authentication service unavailable".to_string(),
        AuthError::Repository(_) | AuthError::PasswordHash => "Authentication error".to_string(),
    }
}

const fn claim_status(err: &ClaimError) -> StatusCode {
    match err {
        ClaimError::AlreadyClaimed(_) | ClaimError::AccountAlreadyBound => StatusCode::CONFLICT,
        ClaimError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn claim_message(err: &ClaimError) -> String {
    match err {
        ClaimError::AlreadyClaimed(_) => "This tag has already been claimed".to_string(),
        ClaimError::AccountAlreadyBound => "This account already has a tag".to_string(),
        ClaimError::Repository(_) => "Internal server error".to_string(),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        (status, Json(json!({ "error": self.public_message() }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from an account ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(account_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(account_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}
