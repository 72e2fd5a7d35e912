//! Claim status, claiming, and public profile lookup.

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
};
use serde::{Deserialize, Serialize};

use qrtag_core::{AccountId, ClaimStatus, Code};

use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::{ClaimRecord, PublicProfile};
use crate::state::AppState;

/// Query for `GET /claim-status`.
#[derive(Debug, Deserialize)]
pub struct ClaimStatusQuery {
    pub code: Option<String>,
}

/// Response for `GET /claim-status`.
#[derive(Debug, Serialize)]
pub struct ClaimStatusResponse {
    pub claimed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Body for `POST /claim`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRequest {
    pub code: Option<String>,
    pub account_id: Option<String>,
}

/// Response for `POST /claim`.
#[derive(Debug, Serialize)]
pub struct ClaimResponse {
    pub ok: bool,
    pub record: ClaimRecord,
}

/// Response for `GET /profile/{code}`.
#[derive(Debug, Serialize)]
pub struct PublicProfileResponse {
    pub user: PublicProfile,
}

/// Parse a code from request input, mapping failures to `400`.
pub(crate) fn parse_code(raw: &str) -> Result<Code> {
    Code::parse(raw).map_err(|e| AppError::BadRequest(format!("Invalid code: {e}")))
}

/// Report whether a code is claimed.
pub async fn claim_status(
    State(state): State<AppState>,
    Query(query): Query<ClaimStatusQuery>,
) -> Result<Json<ClaimStatusResponse>> {
    let raw = query
        .code
        .ok_or_else(|| AppError::BadRequest("code is required".to_string()))?;
    let code = parse_code(&raw)?;

    let response = match state.ledger().check_status(&code).await? {
        ClaimStatus::Unclaimed => ClaimStatusResponse {
            claimed: false,
            reason: None,
        },
        ClaimStatus::Claimed { .. } => ClaimStatusResponse {
            claimed: true,
            reason: Some("This tag has already been claimed".to_string()),
        },
    };
    Ok(Json(response))
}

/// Claim a code for the signed-in account.
///
/// `accountId` must name the signed-in account.
pub async fn claim(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    body: std::result::Result<Json<ClaimRequest>, JsonRejection>,
) -> Result<Json<ClaimResponse>> {
    let Json(request) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let (Some(raw_code), Some(raw_account)) = (request.code, request.account_id) else {
        return Err(AppError::BadRequest(
            "code and accountId are required".to_string(),
        ));
    };
    let code = parse_code(&raw_code)?;
    let account: AccountId = raw_account
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid accountId".to_string()))?;

    if account != user.id {
        tracing::warn!(account = %account, user = %user.id, "Claim for another account rejected");
        return Err(AppError::Forbidden(
            "accountId does not match the signed-in account".to_string(),
        ));
    }

    let profile = state
        .ledger()
        .claim_with_email(code, account, Some(user.email))
        .await?;

    Ok(Json(ClaimResponse {
        ok: true,
        record: profile.claim_record(),
    }))
}

/// Public profile for a code.
pub async fn public_profile(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<Json<PublicProfileResponse>> {
    let code = parse_code(&raw)?;
    let profile = state
        .profiles()
        .find_by_code(&code)
        .await?
        .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))?;

    Ok(Json(PublicProfileResponse {
        user: profile.to_public(),
    }))
}
