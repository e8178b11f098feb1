/// Database migration runner
///
/// Runs schema migrations from the `migrations/` directory at this crate's
/// root using sqlx's embedded migration system.
///
/// # Example
///
/// ```no_run
/// use crewtask_shared::db::pool::{create_pool, DatabaseConfig};
/// use crewtask_shared::db::migrations::run_migrations;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = DatabaseConfig {
///         url: std::env::var("DATABASE_URL")?,
///         ..Default::default()
///     };
///
///     let pool = create_pool(config).await?;
///     run_migrations(&pool).await?;
///     Ok(())
/// }
/// ```

use sqlx::postgres::PgPool;
use tracing::info;

/// Runs all pending database migrations
///
/// Migrations that have already been applied are skipped; a checksum
/// mismatch against an applied migration is an error.
///
/// # Errors
///
/// Returns an error if any migration fails to apply.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    info!("Running database migrations");

    sqlx::migrate!("./migrations").run(pool).await?;

    info!("Database migrations complete");
    Ok(())
}
