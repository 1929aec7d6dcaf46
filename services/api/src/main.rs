use std::{net::SocketAddr, sync::Arc};

use anyhow::Result;
use api::{AppState, config::ServerConfig, routes, seed};
use auth::{JwtConfig, RateLimiterConfig, SystemClock};
use common::database::{DatabaseConfig, health_check, init_pool, run_migrations};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    info!("Starting products API");

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    // Check database connectivity
    if health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    run_migrations(&pool).await?;

    let server_config = ServerConfig::from_env()?;
    let state = AppState::new(
        pool,
        JwtConfig::from_env()?,
        RateLimiterConfig::from_env()?,
        Arc::new(SystemClock),
    )?;

    seed::populate_initial_data(state.auth.users(), &state.products).await?;

    // Evict expired sessions and idle rate limiter entries in the background
    let sweeper = state.clone();
    let sweep_interval = server_config.session_sweep_interval;
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_interval);
        loop {
            ticker.tick().await;
            sweeper.sweep().await;
        }
    });

    // Start the web server
    let app = routes::create_router(state);

    let listener = TcpListener::bind(server_config.addr).await?;
    info!("Products API listening on {}", server_config.addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
