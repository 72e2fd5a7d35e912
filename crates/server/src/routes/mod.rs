//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Liveness check
//! GET  /health/ready           - Readiness check (data store ping)
//!
//! # Claims
//! GET  /claim-status?code=C    - Claimed / unclaimed
//! POST /claim                  - Claim a code for the signed-in account
//! GET  /profile/{code}         - Public profile for a code
//!
//! # Auth
//! POST /auth/register          - Create account and bind code
//! POST /auth/login             - Sign in
//! POST /auth/logout            - Sign out
//! POST /auth/password          - Change password (requires auth)
//!
//! # Own profile (requires auth)
//! GET  /me/profile             - Load profile
//! POST /me/profile             - Update profile (multipart, optional photo)
//! ```
//!
//! The session layer is not part of [`router`]; callers add it so the same
//! routes run over the `PostgreSQL` store in production and an in-memory
//! store in tests.

pub mod auth;
pub mod claims;
pub mod me;

use axum::{
    Router,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/password", post(auth::change_password))
}

/// Create the own-profile routes router.
///
/// `body_limit` bounds multipart uploads.
pub fn me_routes(body_limit: usize) -> Router<AppState> {
    Router::new().route(
        "/profile",
        get(me::show)
            .post(me::update)
            .layer(DefaultBodyLimit::max(body_limit)),
    )
}

/// Create all API routes.
pub fn routes(body_limit: usize) -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .route("/claim-status", get(claims::claim_status))
        .route("/claim", post(claims::claim))
        .route("/profile/{code}", get(claims::public_profile))
        .nest("/auth", auth_routes())
        .nest("/me", me_routes(body_limit))
}

/// Build the application router with state applied.
pub fn router(state: AppState, body_limit: usize) -> Router {
    routes(body_limit).with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the data store is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.profiles().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
