//! codecikgu-server — XP ledger and leaderboard API.
//!
//! Configuration comes from the environment (see `config.rs`); a `.env`
//! file is loaded first when present.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use codecikgu_server::auth::{IdentityProvider, JwtIdentityProvider, RemoteIdentityProvider};
use codecikgu_server::config::{AuthConfig, Config};
use codecikgu_server::db::{self, PgBackend};
use codecikgu_server::{build_router, AppState};
use tokio::net::TcpListener;
use tracing::info;

const LIMITER_PRUNE_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,codecikgu_server=debug,tower_http=info".into()),
        )
        .init();

    let pool = db::connection::connect(&config.database).await?;
    if config.database.run_migrations {
        db::connection::run_migrations(&pool).await?;
    }
    let backend = Arc::new(PgBackend::new(pool));

    let identity: Arc<dyn IdentityProvider> = match &config.auth {
        AuthConfig::Jwt { secret } => {
            info!("verifying session tokens locally");
            Arc::new(JwtIdentityProvider::from_secret(secret.as_bytes()))
        }
        AuthConfig::Remote {
            supabase_url,
            anon_key,
        } => {
            info!(%supabase_url, "resolving session tokens via auth service");
            Arc::new(
                RemoteIdentityProvider::new(supabase_url, anon_key.clone())
                    .context("invalid SUPABASE_URL")?,
            )
        }
    };

    let state = AppState::new(backend, identity, config.rate_limit_per_minute);

    let limiter = Arc::clone(&state.limiter);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(LIMITER_PRUNE_INTERVAL);
        loop {
            interval.tick().await;
            limiter.prune();
        }
    });

    let app = build_router(state);

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.bind_addr))?;
    info!("codecikgu-server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("shutdown signal received");
}
