/*

To establish, manage, maintain connections to supabase db.

$ Connection Pool Management
- Create and maintain db connections.
- Manage connection limits (efficient resource management).
- Health checks.

$ DB Config
- SSL/TLS for supabase.
- Timeouts and connection limits.
- ENV based settings, see `config.rs`.

$ Migration Management
- `migrations/` holds the schema plus the `award_xp` and `get_leaderboard` functions.

$ Security Integration
- RLS Support.
- User-Context.

*/


// Imports
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::{PgPool, Postgres, Transaction};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub require_ssl: bool,
    pub run_migrations: bool,
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("invalid database url: {0}")]
    InvalidUrl(#[source] sqlx::Error),

    #[error("failed to connect to database: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("health check failed: {0}")]
    HealthCheck(#[source] sqlx::Error),

    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("failed to set user context: {0}")]
    UserContext(#[source] sqlx::Error),
}

pub fn connect_options(config: &DbConfig) -> Result<PgConnectOptions, DbError> {
    let options = PgConnectOptions::from_str(&config.url).map_err(DbError::InvalidUrl)?;
    Ok(if config.require_ssl {
        options.ssl_mode(PgSslMode::Require)
    } else {
        options
    })
}

/// Build the pool and verify it with a round trip.
pub async fn connect(config: &DbConfig) -> Result<PgPool, DbError> {
    let options = connect_options(config)?;
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect_with(options)
        .await
        .map_err(|e| {
            error!(error = %e, "database connection failed");
            DbError::Connect(e)
        })?;

    health_check(&pool).await?;
    info!(
        max_connections = config.max_connections,
        require_ssl = config.require_ssl,
        "connected to database"
    );
    Ok(pool)
}

pub async fn health_check(pool: &PgPool) -> Result<(), DbError> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map_err(DbError::HealthCheck)?;
    debug!("database health check ok");
    Ok(())
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), DbError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("database migrations applied");
    Ok(())
}

/// Scope the Supabase RLS subject claim to the given transaction.
pub async fn set_user_context(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
) -> Result<(), DbError> {
    sqlx::query("SELECT set_config('request.jwt.claim.sub', $1, true)")
        .bind(user_id.to_string())
        .execute(&mut **tx)
        .await
        .map_err(DbError::UserContext)?;
    Ok(())
}
