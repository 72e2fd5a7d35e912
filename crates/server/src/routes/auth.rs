//! Registration, sign-in, sign-out and password changes.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use qrtag_core::{AccountId, Code, Email};

use super::claims::parse_code;
use crate::services::validate_password;
use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{OptionalAuth, RequireAuth, clear_current_user, set_current_user};
use crate::models::{CurrentUser, Profile};
use crate::state::AppState;

// =============================================================================
// Request / Response Types
// =============================================================================

/// Body for `POST /auth/register`.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    /// Code from a scanned tag; a fresh one is generated when absent.
    #[serde(default)]
    pub code: Option<String>,
}

/// Body for `POST /auth/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Body for `POST /auth/password`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub password: String,
    pub confirm_password: String,
}

/// Response carrying the caller's own profile.
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub profile: Profile,
}

/// Response for `POST /auth/login`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub account_id: AccountId,
    pub email: Email,
    /// Code bound to the account, if registration completed.
    pub code: Option<Code>,
}

fn json_body<T>(body: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    body.map(|Json(value)| value)
        .map_err(|e| AppError::BadRequest(e.body_text()))
}

async fn start_session(session: &Session, user: &CurrentUser) -> Result<()> {
    set_current_user(session, user)
        .await
        .map_err(|e| AppError::Internal(format!("failed to set session: {e}")))?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(())
}

// =============================================================================
// Handlers
// =============================================================================

/// Register an account and bind it to a code.
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    body: std::result::Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let request = json_body(body)?;
    let code = request
        .code
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(parse_code)
        .transpose()?;

    let profile = state
        .binder()
        .register_and_bind(code, &request.email, &request.password)
        .await?;

    let user = CurrentUser {
        id: profile.account_id,
        email: profile
            .email
            .clone()
            .ok_or_else(|| AppError::Internal("registered profile has no email".to_string()))?,
    };
    // The account and binding exist; the client can still sign in.
    if let Err(e) = start_session(&session, &user).await {
        tracing::error!(
            error = %e,
            account = %user.id,
            reconcile = true,
            "Registered without a session"
        );
    }

    Ok((StatusCode::CREATED, Json(ProfileResponse { profile })))
}

/// Sign in with email and password.
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    body: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>> {
    let request = json_body(body)?;

    let user = state
        .auth()
        .sign_in(&request.email, &request.password)
        .await
        .inspect_err(|e| tracing::warn!(error = %e, "Login failed"))?;

    let code = state
        .profiles()
        .find_by_account(user.id)
        .await?
        .map(|profile| profile.code);
    if code.is_none() {
        tracing::warn!(account = %user.id, "Signed-in account has no bound profile");
    }

    start_session(&session, &user).await?;

    Ok(Json(LoginResponse {
        account_id: user.id,
        email: user.email,
        code,
    }))
}

/// Sign out.
pub async fn logout(OptionalAuth(user): OptionalAuth, session: Session) -> StatusCode {
    if let Err(e) = clear_current_user(&session).await {
        tracing::error!(error = %e, "Failed to clear session");
    } else if let Some(user) = user {
        tracing::info!(account = %user.id, "Signed out");
    }
    clear_sentry_user();
    StatusCode::NO_CONTENT
}

/// Replace the signed-in account's password.
pub async fn change_password(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    body: std::result::Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> Result<StatusCode> {
    let request = json_body(body)?;
    if request.password != request.confirm_password {
        return Err(AppError::BadRequest("Passwords do not match".to_string()));
    }
    validate_password(&request.password)?;

    state
        .auth()
        .change_password(user.id, &request.password)
        .await
        .inspect_err(|e| tracing::warn!(error = %e, account = %user.id, "Password change failed"))?;

    Ok(StatusCode::NO_CONTENT)
}
