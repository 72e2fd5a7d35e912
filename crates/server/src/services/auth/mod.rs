//! Authentication service.
//!
//! Accounts are created and verified through an [`AuthProvider`]. The
//! "current identity" of a request lives in the session (see
//! [`crate::middleware::auth`]), not in the provider.

mod error;
pub mod memory;

pub use error::AuthError;
pub use memory::MemoryAuthProvider;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use qrtag_core::{AccountId, Email};

use crate::db::RepositoryError;
use crate::models::CurrentUser;

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum password length (bounds hashing cost).
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Account creation and credential checks.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Create an account for `email`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::WeakPassword` for unacceptable passwords and
    /// `AuthError::AccountAlreadyExists` if the email is taken.
    async fn create_account(&self, email: &Email, password: &str) -> Result<AccountId, AuthError>;

    /// Verify credentials and return the account's identity.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email is unknown or the
    /// password does not match.
    async fn sign_in(&self, email: &str, password: &str) -> Result<CurrentUser, AuthError>;

    /// Replace the password of an existing account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::WeakPassword` for unacceptable passwords and
    /// `AuthError::InvalidCredentials` if the account no longer exists.
    async fn change_password(&self, account: AccountId, password: &str) -> Result<(), AuthError>;
}

/// Password accounts stored in `qrtag.account`.
#[derive(Clone)]
pub struct PgAuthProvider {
    pool: PgPool,
}

impl PgAuthProvider {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct AccountRow {
    id: Uuid,
    email: String,
    password_hash: String,
}

#[async_trait]
impl AuthProvider for PgAuthProvider {
    async fn create_account(&self, email: &Email, password: &str) -> Result<AccountId, AuthError> {
        validate_password(password)?;
        let password_hash = hash_password(password)?;
        let id = AccountId::generate();

        sqlx::query("INSERT INTO qrtag.account (id, email, password_hash) VALUES ($1, $2, $3)")
            .bind(id.as_uuid())
            .bind(email.as_str())
            .bind(&password_hash)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.is_unique_violation()
                {
                    return AuthError::AccountAlreadyExists;
                }
                AuthError::Repository(RepositoryError::Database(e))
            })?;

        tracing::info!(account = %id, "Account created");
        Ok(id)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<CurrentUser, AuthError> {
        let email = Email::parse(email)?;

        let row: Option<AccountRow> = sqlx::query_as(
            "SELECT id, email, password_hash FROM qrtag.account WHERE email = $1",
        )
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        let Some(row) = row else {
            return Err(AuthError::InvalidCredentials);
        };
        verify_password(password, &row.password_hash)?;

        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        Ok(CurrentUser {
            id: AccountId::from_uuid(row.id),
            email,
        })
    }

    async fn change_password(&self, account: AccountId, password: &str) -> Result<(), AuthError> {
        validate_password(password)?;
        let password_hash = hash_password(password)?;

        let result = sqlx::query("UPDATE qrtag.account SET password_hash = $2 WHERE id = $1")
            .bind(account.as_uuid())
            .bind(&password_hash)
            .execute(&self.pool)
            .await
            .map_err(RepositoryError::from)?;
        if result.rows_affected() == 0 {
            return Err(AuthError::InvalidCredentials);
        }

        tracing::info!(account = %account, "Password changed");
        Ok(())
    }
}

/// Validate password requirements.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` if the password is too short or too long.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    let length = password.chars().count();
    if length < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    if length > MAX_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at most {MAX_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_password_length() {
        assert!(matches!(
            validate_password("short"),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(validate_password("long enough").is_ok());
        assert!(validate_password(&"x".repeat(MAX_PASSWORD_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong horse", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }
}
