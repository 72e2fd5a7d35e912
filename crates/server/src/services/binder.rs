//! Registration: account creation plus code binding.
//!
//! Account creation and the profile insert are separate steps against
//! separate collaborators, so there is no transaction spanning both. If the
//! insert fails after the account exists, the account is left unbound and
//! the failure is reported as [`BindError::PartialRegistration`] for manual
//! reconciliation.

use std::sync::Arc;

use thiserror::Error;
use tracing::instrument;

use qrtag_core::{AccountId, Code, Email};

use super::auth::{AuthError, AuthProvider, validate_password};
use super::claims::{ClaimError, ClaimLedger};
use crate::models::Profile;

/// Total insert attempts for a generated code.
const GENERATED_CODE_ATTEMPTS: u32 = 3;

/// Errors that can occur during registration.
#[derive(Debug, Error)]
pub enum BindError {
    /// Email or password failed validation.
    #[error("{0}")]
    Validation(String),

    /// The supplied code was already claimed before any account was created.
    #[error("code {0} is already claimed")]
    AlreadyClaimed(Code),

    /// Account creation failed; nothing was created.
    #[error("account creation failed: {0}")]
    Auth(#[from] AuthError),

    /// The pre-check could not reach the data store; nothing was created.
    #[error("claim check failed: {0}")]
    Claim(#[source] ClaimError),

    /// The account exists but could not be bound to a code.
    #[error("account {account_id} created but not bound: {source}")]
    PartialRegistration {
        account_id: AccountId,
        #[source]
        source: ClaimError,
    },
}

/// Source of codes for registrations that do not supply one.
pub type CodeGenerator = Arc<dyn Fn() -> Code + Send + Sync>;

/// Creates accounts and binds them to codes.
#[derive(Clone)]
pub struct ProfileBinder {
    auth: Arc<dyn AuthProvider>,
    ledger: ClaimLedger,
    generate_code: CodeGenerator,
}

impl ProfileBinder {
    #[must_use]
    pub fn new(auth: Arc<dyn AuthProvider>, ledger: ClaimLedger) -> Self {
        Self {
            auth,
            ledger,
            generate_code: Arc::new(Code::generate),
        }
    }

    /// Replace the random code source.
    #[must_use]
    pub fn with_code_generator(mut self, generate_code: CodeGenerator) -> Self {
        self.generate_code = generate_code;
        self
    }

    /// Register an account and bind it to `code`, or to a freshly generated
    /// code when none is supplied.
    ///
    /// # Errors
    ///
    /// - `BindError::Validation` / `BindError::AlreadyClaimed` /
    ///   `BindError::Auth` before any account exists.
    /// - `BindError::PartialRegistration` if the account was created but the
    ///   binding failed.
    #[instrument(skip(self, code, email, password), fields(code = code.as_ref().map(Code::as_str)))]
    pub async fn register_and_bind(
        &self,
        code: Option<Code>,
        email: &str,
        password: &str,
    ) -> Result<Profile, BindError> {
        let email = Email::parse(email).map_err(|e| BindError::Validation(e.to_string()))?;
        validate_password(password).map_err(|e| match e {
            AuthError::WeakPassword(msg) => BindError::Validation(msg),
            other => BindError::Auth(other),
        })?;

        if let Some(code) = &code
            && self
                .ledger
                .check_status(code)
                .await
                .map_err(BindError::Claim)?
                .is_claimed()
        {
            tracing::warn!(code = %code, "Registration rejected: code already claimed");
            return Err(BindError::AlreadyClaimed(code.clone()));
        }

        let account = self.auth.create_account(&email, password).await?;

        let generated = code.is_none();
        let mut code = code.unwrap_or_else(|| (self.generate_code)());
        let mut attempt = 1;

        loop {
            match self
                .ledger
                .claim_with_email(code.clone(), account, Some(email.clone()))
                .await
            {
                Ok(profile) => {
                    tracing::info!(
                        account = %account,
                        code = %profile.code,
                        generated,
                        "Registered and bound profile"
                    );
                    return Ok(profile);
                }
                Err(ClaimError::AlreadyClaimed(_))
                    if generated && attempt < GENERATED_CODE_ATTEMPTS =>
                {
                    tracing::warn!(code = %code, attempt, "Generated code collided, regenerating");
                    code = (self.generate_code)();
                    attempt += 1;
                }
                Err(source) => {
                    tracing::error!(
                        account_id = %account,
                        code = %code,
                        reconcile = true,
                        error = %source,
                        "Partial registration: account created but not bound"
                    );
                    return Err(BindError::PartialRegistration {
                        account_id: account,
                        source,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::db::{MemoryProfileStore, ProfileStore};
    use crate::services::auth::MemoryAuthProvider;

    /// Yields `codes` in order, repeating the last one.
    fn scripted(codes: &[&str]) -> CodeGenerator {
        let codes: Vec<Code> = codes.iter().map(|c| Code::parse(c).unwrap()).collect();
        let next = AtomicUsize::new(0);
        Arc::new(move || {
            let i = next.fetch_add(1, Ordering::SeqCst).min(codes.len() - 1);
            codes[i].clone()
        })
    }

    fn binder() -> (ProfileBinder, Arc<MemoryAuthProvider>, ClaimLedger) {
        let auth = Arc::new(MemoryAuthProvider::new());
        let ledger = ClaimLedger::new(Arc::new(MemoryProfileStore::new()));
        (ProfileBinder::new(auth.clone(), ledger.clone()), auth, ledger)
    }

    #[tokio::test]
    async fn test_register_with_supplied_code() {
        let (binder, _, ledger) = binder();
        let code = Code::parse("ab12cd34").unwrap();

        let profile = binder
            .register_and_bind(Some(code.clone()), "Rina@Example.com", "password123")
            .await
            .unwrap();

        assert_eq!(profile.code, code);
        assert_eq!(profile.email.unwrap().as_str(), "rina@example.com");
        assert!(ledger.check_status(&code).await.unwrap().is_claimed());
    }

    #[tokio::test]
    async fn test_register_generates_code() {
        let (binder, _, ledger) = binder();

        let profile = binder
            .register_and_bind(None, "rina@example.com", "password123")
            .await
            .unwrap();

        assert_eq!(profile.code.as_str().len(), Code::GENERATED_LENGTH);
        assert!(ledger.check_status(&profile.code).await.unwrap().is_claimed());
    }

    #[tokio::test]
    async fn test_claimed_code_rejected_before_account_creation() {
        let (binder, auth, ledger) = binder();
        let code = Code::parse("taken").unwrap();
        ledger.claim(code.clone(), AccountId::generate()).await.unwrap();

        let err = binder
            .register_and_bind(Some(code), "rina@example.com", "password123")
            .await
            .unwrap_err();

        assert!(matches!(err, BindError::AlreadyClaimed(_)));
        assert_eq!(auth.account_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_input_creates_nothing() {
        let (binder, auth, _) = binder();

        let err = binder
            .register_and_bind(None, "not-an-email", "password123")
            .await
            .unwrap_err();
        assert!(matches!(err, BindError::Validation(_)));

        let err = binder
            .register_and_bind(None, "rina@example.com", "short")
            .await
            .unwrap_err();
        assert!(matches!(err, BindError::Validation(_)));
        assert_eq!(auth.account_count(), 0);
    }

    #[tokio::test]
    async fn test_auth_failure_aborts_without_profile() {
        let (binder, auth, ledger) = binder();
        auth.set_fail_create(true);
        let code = Code::parse("fresh").unwrap();

        let err = binder
            .register_and_bind(Some(code.clone()), "rina@example.com", "password123")
            .await
            .unwrap_err();

        assert!(matches!(err, BindError::Auth(AuthError::Unavailable(_))));
        assert!(!ledger.check_status(&code).await.unwrap().is_claimed());
    }

    #[tokio::test]
    async fn test_duplicate_email_is_auth_error() {
        let (binder, _, _) = binder();
        binder
            .register_and_bind(None, "rina@example.com", "password123")
            .await
            .unwrap();

        let err = binder
            .register_and_bind(None, "rina@example.com", "password123")
            .await
            .unwrap_err();
        assert!(matches!(err, BindError::Auth(AuthError::AccountAlreadyExists)));
    }

    #[tokio::test]
    async fn test_generated_code_collision_retries() {
        let store = Arc::new(MemoryProfileStore::new());
        let ledger = ClaimLedger::new(store.clone());
        let binder = ProfileBinder::new(Arc::new(MemoryAuthProvider::new()), ledger.clone())
            .with_code_generator(scripted(&["taken01", "fresh02"]));
        ledger
            .claim(Code::parse("taken01").unwrap(), AccountId::generate())
            .await
            .unwrap();

        let profile = binder
            .register_and_bind(None, "rina@example.com", "password123")
            .await
            .unwrap();

        assert_eq!(profile.code.as_str(), "fresh02");
        assert_eq!(
            store.find_by_account(profile.account_id).await.unwrap().unwrap().code,
            profile.code
        );
    }

    #[tokio::test]
    async fn test_generated_code_collisions_exhaust_attempts() {
        let store = Arc::new(MemoryProfileStore::new());
        let ledger = ClaimLedger::new(store.clone());
        let auth = Arc::new(MemoryAuthProvider::new());
        let binder = ProfileBinder::new(auth.clone(), ledger.clone())
            .with_code_generator(scripted(&["taken01"]));
        ledger
            .claim(Code::parse("taken01").unwrap(), AccountId::generate())
            .await
            .unwrap();

        let err = binder
            .register_and_bind(None, "rina@example.com", "password123")
            .await
            .unwrap_err();

        let BindError::PartialRegistration { account_id, source } = err else {
            panic!("expected partial registration, got {err:?}");
        };
        assert!(matches!(source, ClaimError::AlreadyClaimed(_)));
        assert_eq!(auth.account_count(), 1);
        assert!(store.find_by_account(account_id).await.unwrap().is_none());
    }
}
