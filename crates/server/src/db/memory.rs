//! In-memory profile store.
//!
//! Enforces the same uniqueness rules as the `PostgreSQL` schema under a
//! single lock, so concurrent claims behave like concurrent inserts against
//! the real table.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;

use qrtag_core::{AccountId, Code, ProfileId};

use super::{ConflictKind, ProfileStore, RepositoryError};
use crate::models::{NewProfile, Profile, ProfilePatch};

#[derive(Default)]
struct Tables {
    next_id: i32,
    by_account: HashMap<AccountId, Profile>,
    code_index: HashMap<Code, AccountId>,
}

/// Profile store held entirely in process memory.
#[derive(Default)]
pub struct MemoryProfileStore {
    tables: Mutex<Tables>,
}

impl MemoryProfileStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored profiles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().by_account.len()
    }

    /// Whether the store holds no profiles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn find_by_code(&self, code: &Code) -> Result<Option<Profile>, RepositoryError> {
        let tables = self.lock();
        Ok(tables
            .code_index
            .get(code)
            .and_then(|account| tables.by_account.get(account))
            .cloned())
    }

    async fn find_by_account(
        &self,
        account: AccountId,
    ) -> Result<Option<Profile>, RepositoryError> {
        Ok(self.lock().by_account.get(&account).cloned())
    }

    async fn insert(&self, new: NewProfile) -> Result<Profile, RepositoryError> {
        let mut tables = self.lock();

        if tables.code_index.contains_key(&new.code) {
            return Err(RepositoryError::Conflict(ConflictKind::Code));
        }
        if tables.by_account.contains_key(&new.account_id) {
            return Err(RepositoryError::Conflict(ConflictKind::Account));
        }

        tables.next_id += 1;
        let now = Utc::now();
        let profile = Profile {
            id: ProfileId::new(tables.next_id),
            account_id: new.account_id,
            code: new.code,
            email: new.email,
            display_name: String::new(),
            age: None,
            bio: None,
            instagram: None,
            tiktok: None,
            twitter: None,
            photo: None,
            created_at: now,
            updated_at: now,
        };

        tables
            .code_index
            .insert(profile.code.clone(), profile.account_id);
        tables.by_account.insert(profile.account_id, profile.clone());
        Ok(profile)
    }

    async fn update(
        &self,
        account: AccountId,
        patch: ProfilePatch,
    ) -> Result<Profile, RepositoryError> {
        let mut tables = self.lock();
        let profile = tables
            .by_account
            .get_mut(&account)
            .ok_or(RepositoryError::NotFound)?;

        patch.apply_to(profile);
        profile.updated_at = Utc::now();
        Ok(profile.clone())
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}
