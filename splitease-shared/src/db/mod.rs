/// Database layer for SplitEase
///
/// - `pool`: PostgreSQL connection pool with health checks
/// - `migrations`: Migration runner over the workspace `migrations/` directory
///
/// Models live in the crate-level `models` module.
///
/// # Example
///
/// ```no_run
/// use splitease_shared::db::pool::{create_pool, DatabaseConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = DatabaseConfig {
///         url: std::env::var("DATABASE_URL")?,
///         ..Default::default()
///     };
///
///     let pool = create_pool(config).await?;
///     splitease_shared::db::migrations::run_migrations(&pool).await?;
///     Ok(())
/// }
/// ```

pub mod migrations;
pub mod pool;
