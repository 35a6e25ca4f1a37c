//! Noteful - Notes API server
//! Mission: Keep every user's notes, folders and tags to themselves

use anyhow::{Context, Result};
use clap::Parser;
use noteful_backend::{
    auth::JwtHandler,
    config::{self, Config},
    db::Database,
    router, AppState,
};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize environment and logging
    config::load_env();
    init_tracing();

    let config = Config::parse();

    info!("Noteful API starting");

    if config.uses_dev_secret() {
        warn!("JWT_SECRET is not set, signing tokens with the development secret");
    }

    let db = Database::open(&config.database_path).with_context(|| {
        format!(
            "Failed to open database at {}",
            config.database_path.display()
        )
    })?;
    info!("Database initialized at: {}", config.database_path.display());

    let jwt = JwtHandler::new(&config.jwt_secret, config.jwt_expiry);
    info!(
        expiry_secs = config.jwt_expiry.num_seconds(),
        "Authentication initialized"
    );

    let app = router(AppState::from_database(db, jwt));

    let listener = TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    info!("API server listening on {}", config.bind);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "noteful_backend=debug,noteful=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
