//! Profile persistence.
//!
//! # Database
//!
//! ## Tables
//!
//! - `qrtag.account` - Accounts owned by the password auth provider
//! - `qrtag.profile` - One row per claimed code (unique `code`, unique `account_id`)
//! - `tower_sessions.session` - Session storage (created by the session store)
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p qrtag-cli -- migrate
//! ```
//!
//! Queries are checked at runtime (`sqlx::query_as`), so building the
//! workspace never needs a live database.

pub mod memory;
pub mod profiles;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use qrtag_core::{AccountId, Code};

use crate::models::{NewProfile, Profile, ProfilePatch};

pub use memory::MemoryProfileStore;
pub use profiles::PgProfileStore;

/// Which uniqueness constraint a conflicting insert hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    /// Another profile already holds the code.
    Code,
    /// The account already owns a profile.
    Account,
    /// Any other unique constraint.
    Other,
}

impl std::fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Code => write!(f, "code already claimed"),
            Self::Account => write!(f, "account already owns a profile"),
            Self::Other => write!(f, "duplicate value"),
        }
    }
}

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Unique constraint violation.
    #[error("constraint violation: {0}")]
    Conflict(ConflictKind),
}

/// Persistent store of profile rows.
///
/// The store is the single synchronization point for claims: `insert` must
/// reject a second row for the same code (or the same account) atomically,
/// whatever the callers observed beforehand.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Look up the profile bound to a code.
    async fn find_by_code(&self, code: &Code) -> Result<Option<Profile>, RepositoryError>;

    /// Look up the profile owned by an account.
    async fn find_by_account(&self, account: AccountId)
    -> Result<Option<Profile>, RepositoryError>;

    /// Create a profile row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the code or account is already bound.
    async fn insert(&self, new: NewProfile) -> Result<Profile, RepositoryError>;

    /// Apply a patch to the account's profile in a single row update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the account has no profile.
    async fn update(
        &self,
        account: AccountId,
        patch: ProfilePatch,
    ) -> Result<Profile, RepositoryError>;

    /// Check that the store is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
