//! In-memory auth provider.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use qrtag_core::{AccountId, Email};

use super::{AuthError, AuthProvider, validate_password};
use crate::models::CurrentUser;

struct Account {
    id: AccountId,
    password: String,
}

/// Auth provider keeping accounts in process memory.
///
/// Passwords are compared verbatim; this provider is for tests and local
/// experiments only.
#[derive(Default)]
pub struct MemoryAuthProvider {
    accounts: Mutex<HashMap<Email, Account>>,
    fail_create: AtomicBool,
}

impl MemoryAuthProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `create_account` calls fail (or succeed again).
    pub fn set_fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    /// Number of accounts created.
    #[must_use]
    pub fn account_count(&self) -> usize {
        self.accounts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl AuthProvider for MemoryAuthProvider {
    async fn create_account(&self, email: &Email, password: &str) -> Result<AccountId, AuthError> {
        validate_password(password)?;
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(AuthError::Unavailable("injected failure".to_string()));
        }

        let mut accounts = self.accounts.lock().unwrap_or_else(PoisonError::into_inner);
        if accounts.contains_key(email) {
            return Err(AuthError::AccountAlreadyExists);
        }

        let id = AccountId::generate();
        accounts.insert(
            email.clone(),
            Account {
                id,
                password: password.to_string(),
            },
        );
        Ok(id)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<CurrentUser, AuthError> {
        let email = Email::parse(email)?;
        let accounts = self.accounts.lock().unwrap_or_else(PoisonError::into_inner);

        match accounts.get(&email) {
            Some(account) if account.password == password => Ok(CurrentUser {
                id: account.id,
                email,
            }),
            _ => Err(AuthError::InvalidCredentials),
        }
    }

    async fn change_password(&self, account: AccountId, password: &str) -> Result<(), AuthError> {
        validate_password(password)?;
        let mut accounts = self.accounts.lock().unwrap_or_else(PoisonError::into_inner);

        let stored = accounts
            .values_mut()
            .find(|stored| stored.id == account)
            .ok_or(AuthError::InvalidCredentials)?;
        password.clone_into(&mut stored.password);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_sign_in() {
        let auth = MemoryAuthProvider::new();
        let email = Email::parse("dewi@example.com").unwrap();
        let id = auth.create_account(&email, "hunter2hunter2").await.unwrap();

        let user = auth
            .sign_in("DEWI@example.com", "hunter2hunter2")
            .await
            .unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.email, email);

        assert!(matches!(
            auth.sign_in("dewi@example.com", "wrong-password").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_duplicate_email() {
        let auth = MemoryAuthProvider::new();
        let email = Email::parse("dewi@example.com").unwrap();
        auth.create_account(&email, "password123").await.unwrap();

        assert!(matches!(
            auth.create_account(&email, "password456").await,
            Err(AuthError::AccountAlreadyExists)
        ));
        assert_eq!(auth.account_count(), 1);
    }

    #[tokio::test]
    async fn test_change_password() {
        let auth = MemoryAuthProvider::new();
        let email = Email::parse("dewi@example.com").unwrap();
        let id = auth.create_account(&email, "password123").await.unwrap();

        assert!(matches!(
            auth.change_password(id, "short").await,
            Err(AuthError::WeakPassword(_))
        ));
        auth.change_password(id, "password456").await.unwrap();

        assert!(auth.sign_in("dewi@example.com", "password123").await.is_err());
        assert!(auth.sign_in("dewi@example.com", "password456").await.is_ok());
        assert!(matches!(
            auth.change_password(AccountId::generate(), "password789").await,
            Err(AuthError::InvalidCredentials)
        ));
    }
}
