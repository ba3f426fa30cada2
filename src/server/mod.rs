/*!
 * HTTP server for the translation platform.
 *
 * Every route answers JSON. Contributors are tracked with a signed session
 * cookie, the admin panel is guarded by a password login, and `/api/` is
 * rate limited per client.
 */

pub mod error;
pub mod extract;
pub mod handlers;
pub mod routes;
pub mod session;
pub mod state;

pub use error::ServerError;
pub use routes::create_router;
pub use state::{AppState, SharedState};

use anyhow::{Context, Result};
use log::{error, info, warn};
use std::net::SocketAddr;

use crate::app_config::Config;
use crate::database::Repository;

/// Open the database, start background upkeep and serve until Ctrl-C
pub async fn run_server(config: Config) -> Result<()> {
    let start_time = chrono::Utc::now();
    let repo = Repository::open(&config.server.database_path)?;
    let addr: SocketAddr = config
        .bind_address()
        .parse()
        .with_context(|| format!("Invalid bind address: {}", config.bind_address()))?;

    let state = AppState::new(config, repo).shared();

    match state.cache.cleanup(state.cache.settings().max_age_days).await {
        Ok(retired) if retired > 0 => info!("Retired {} stale prompts", retired),
        Ok(_) => {}
        Err(e) => warn!("Prompt cleanup failed: {:#}", e),
    }

    let cache_stats = state.cache.stats().await?;
    info!(
        "Prompt cache: {} available, {} served, {}/{} API calls used today",
        cache_stats.available,
        cache_stats.served,
        cache_stats.api_calls_today,
        cache_stats.daily_limit
    );
    if (cache_stats.available.max(0) as usize) < cache_stats.min_cache_size {
        info!("Prompt cache below {}, starting background refill", cache_stats.min_cache_size);
        state.cache.spawn_background_refill();
    }

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Kikuyu translation server listening on http://{}", addr);

    let shutdown_signal = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
        let uptime = chrono::Utc::now().signed_duration_since(start_time);
        info!(
            "Shutdown signal received after {}s, stopping server gracefully",
            uptime.num_seconds()
        );
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shut down cleanly");
    Ok(())
}
