//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! qrtag-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `QRTAG_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string
//!
//! Runs the schema migrations in `crates/server/migrations/`, then creates the
//! session table used by `tower-sessions-sqlx-store`.

use qrtag_server::db::create_pool;
use tower_sessions_sqlx_store::PostgresStore;

use super::{CommandError, database_url};

/// Run all server migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), CommandError> {
    let database_url = database_url()?;

    tracing::info!("Connecting to database...");
    let pool = create_pool(&database_url).await?;

    tracing::info!("Running schema migrations...");
    sqlx::migrate!("../server/migrations").run(&pool).await?;

    tracing::info!("Creating session table...");
    PostgresStore::new(pool)
        .migrate()
        .await
        .map_err(|e| CommandError::SessionStore(e.to_string()))?;

    tracing::info!("Migrations complete!");
    Ok(())
}
