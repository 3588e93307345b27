//! # odrlab-server
//!
//! REST backend for the ODR Lab platform.
//!
//! This binary provides:
//! - **Authentication** (credential and Google sign-in) issuing short-lived
//!   access and longer-lived refresh tokens as http-only cookies
//! - **Role-polymorphic profiles**: one base user record fanning out to one
//!   of four role-extension tables, with transactional role transitions
//! - **Idea workflow**: user submissions reviewed by admins, published ideas
//!   with comments, likes, collaborators and mentors
//! - **Per-IP rate limiting** with a stricter bucket on idea submission
//! - **Append-only audit log** of auth events and admin mutations

mod api;
mod auth;
mod config;
mod error;
mod rate_limit;
mod routes;

use tracing::info;
use tracing_subscriber::EnvFilter;

use odrlab_store::Database;

use crate::api::AppState;
use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,odrlab_server=debug")),
        )
        .init();

    info!("Starting ODR Lab server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(
        http_addr = %config.http_addr,
        database = %config.database_path.display(),
        production = config.production,
        auth_configured = config.jwt_secret.is_some(),
        "Loaded configuration"
    );

    if config.jwt_secret.is_none() {
        tracing::warn!("JWT_SECRET is not set; authentication endpoints will fail closed");
    }

    // -----------------------------------------------------------------------
    // 3. Open the database (runs migrations)
    // -----------------------------------------------------------------------
    let db = Database::open_at(&config.database_path)?;

    // -----------------------------------------------------------------------
    // 4. Build application state and spawn background tasks
    // -----------------------------------------------------------------------
    let http_addr = config.http_addr;
    let state = AppState::new(db, config);

    // Periodic rate limiter cleanup (every 5 minutes, evict buckets idle >10 min)
    let rl = state.rate_limiter.clone();
    let sl = state.submit_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(300));
        loop {
            interval.tick().await;
            rl.purge_stale(600.0).await;
            sl.purge_stale(600.0).await;
        }
    });

    // -----------------------------------------------------------------------
    // 5. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    // tokio::select! ensures that if either the HTTP server or a shutdown
    // signal arrives, we exit cleanly.
    tokio::select! {
        result = api::serve(state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
