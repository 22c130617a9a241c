use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tourbooking_backend::{app, auth, config, db, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Logging ───────────────────────────────────────────────
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // ── Config ────────────────────────────────────────────────
    let config = config::Config::from_env()?;
    tracing::info!(env = %config.app_env, "Starting tour booking backend");

    // ── Database ──────────────────────────────────────────────
    let pool = db::connect(&config).await?;
    db::run_migrations(&pool).await?;

    // ── Seed admin account ────────────────────────────────────
    auth::seed::seed_admin(&pool, &config).await?;

    // Uploads are served straight from disk; make sure the directory exists.
    tokio::fs::create_dir_all(&config.upload_dir).await?;

    let addr: SocketAddr = format!("{}:{}", config.backend_host, config.backend_port).parse()?;
    let app_state = AppState::new(pool, config);

    // ── Router ────────────────────────────────────────────────
    let router = app(app_state);
    tracing::info!(%addr, "Listening");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
