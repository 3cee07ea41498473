use std::sync::Arc;

use tracing::error;

use greenwatch_db::Database;

use crate::error::ApiError;
use crate::images::ImageStore;
use crate::weather::WeatherClient;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub images: ImageStore,
    pub weather: WeatherClient,
}

/// Run CPU-bound or blocking work off the async runtime.
pub async fn blocking<F, T>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow::anyhow!("blocking task failed"))
        })?
        .map_err(ApiError::from)
}

/// Run a store operation off the async runtime.
pub async fn with_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    blocking(move || f(&state.db)).await
}
