mod config;

use std::sync::Arc;

use tracing::{info, warn};

use greenwatch_api::auth::ensure_manager_pin;
use greenwatch_api::images::ImageStore;
use greenwatch_api::routes::router;
use greenwatch_api::state::{AppState, AppStateInner};
use greenwatch_api::weather::WeatherClient;
use greenwatch_db::Database;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "greenwatch=debug,greenwatch_api=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    // Init database
    let db = Database::open(&config.db_path)?;
    if let Some(pin) = ensure_manager_pin(&db, config.manager_pin.as_deref())? {
        warn!("No manager PIN configured; generated one: {}", pin);
        warn!("Set GREENWATCH_MANAGER_PIN to choose your own.");
    }

    let images = ImageStore::new(config.upload_dir.clone()).await?;
    if config.weather_api_key.is_empty() {
        warn!("GREENWATCH_WEATHER_API_KEY is unset; /weather will answer 502");
    }
    let weather = WeatherClient::new(&config.weather_api_url, &config.weather_api_key)?;

    let state: AppState = Arc::new(AppStateInner {
        db,
        jwt_secret: config.jwt_secret.clone(),
        images,
        weather,
    });

    let app = router(state);

    let addr = config.addr()?;
    info!("Greenwatch server listening on {}", addr);
    info!("Database: {}", config.db_path.display());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Greenwatch server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
