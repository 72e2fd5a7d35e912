//! Claim lifecycle of QR codes.
//!
//! A code is `Unclaimed` until a profile row references it and `Claimed`
//! forever after. The status check is advisory: two callers can both observe
//! `Unclaimed`, and only the store's unique constraint on `code` decides who
//! wins.

use std::sync::Arc;

use thiserror::Error;
use tracing::instrument;

use qrtag_core::{AccountId, ClaimStatus, Code, Email};

use crate::db::{ConflictKind, ProfileStore, RepositoryError};
use crate::models::{ClaimRecord, NewProfile, Profile};

/// Errors that can occur when claiming a code.
#[derive(Debug, Error)]
pub enum ClaimError {
    /// The code is already bound to an account.
    #[error("code {0} is already claimed")]
    AlreadyClaimed(Code),

    /// The account already owns a profile for another code.
    #[error("account already owns a profile")]
    AccountAlreadyBound,

    /// Data store failure.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Authoritative state machine over codes.
#[derive(Clone)]
pub struct ClaimLedger {
    profiles: Arc<dyn ProfileStore>,
}

impl ClaimLedger {
    #[must_use]
    pub fn new(profiles: Arc<dyn ProfileStore>) -> Self {
        Self { profiles }
    }

    /// Report whether a profile currently references `code`.
    ///
    /// Read-only and idempotent.
    ///
    /// # Errors
    ///
    /// Returns `ClaimError::Repository` if the store cannot be read.
    #[instrument(skip(self), fields(code = %code))]
    pub async fn check_status(&self, code: &Code) -> Result<ClaimStatus, ClaimError> {
        let status = self
            .profiles
            .find_by_code(code)
            .await?
            .map_or(ClaimStatus::Unclaimed, |profile| {
                profile.claim_record().status()
            });
        Ok(status)
    }

    /// Bind `code` to `account`.
    ///
    /// # Errors
    ///
    /// Returns `ClaimError::AlreadyClaimed` if another claim holds the code,
    /// even when the pre-check saw it unclaimed.
    #[instrument(skip(self), fields(code = %code, account = %account))]
    pub async fn claim(&self, code: Code, account: AccountId) -> Result<ClaimRecord, ClaimError> {
        self.claim_with_email(code, account, None)
            .await
            .map(|profile| profile.claim_record())
    }

    /// Bind `code` to `account`, creating its profile row with `email`.
    ///
    /// # Errors
    ///
    /// Returns `ClaimError::AlreadyClaimed` if the code is bound and
    /// `ClaimError::AccountAlreadyBound` if the account owns another profile.
    pub async fn claim_with_email(
        &self,
        code: Code,
        account: AccountId,
        email: Option<Email>,
    ) -> Result<Profile, ClaimError> {
        if self.check_status(&code).await?.is_claimed() {
            tracing::warn!(code = %code, account = %account, "Claim rejected: code already claimed");
            return Err(ClaimError::AlreadyClaimed(code));
        }

        let new = NewProfile {
            account_id: account,
            code: code.clone(),
            email,
        };

        match self.profiles.insert(new).await {
            Ok(profile) => {
                tracing::info!(code = %code, account = %account, "Code claimed");
                Ok(profile)
            }
            Err(RepositoryError::Conflict(ConflictKind::Code)) => {
                tracing::warn!(code = %code, account = %account, "Claim lost race for code");
                Err(ClaimError::AlreadyClaimed(code))
            }
            Err(RepositoryError::Conflict(ConflictKind::Account)) => {
                tracing::warn!(account = %account, "Claim rejected: account already bound");
                Err(ClaimError::AccountAlreadyBound)
            }
            Err(e) => Err(e.into()),
        }
    }
}
