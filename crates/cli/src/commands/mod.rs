//! CLI subcommand implementations.

pub mod codes;
pub mod migrate;

use secrecy::SecretString;
use thiserror::Error;

/// Errors shared by the subcommands.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Session store migration failed.
    #[error("Session store error: {0}")]
    SessionStore(String),

    /// Data store lookup failed.
    #[error("Repository error: {0}")]
    Repository(#[from] qrtag_server::db::RepositoryError),

    /// Invalid argument.
    #[error("{0}")]
    InvalidArgument(String),
}

/// Read the database URL, preferring `QRTAG_DATABASE_URL` over `DATABASE_URL`.
fn database_url() -> Result<SecretString, CommandError> {
    dotenvy::dotenv().ok();

    std::env::var("QRTAG_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| CommandError::MissingEnvVar("QRTAG_DATABASE_URL"))
}
