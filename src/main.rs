use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use prevalence_predictor::{config::Config, routes, ArtifactStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cfg = Config::from_env().context("bad configuration")?;

    // Loaded once, before the listener exists. A failure leaves the service
    // up in degraded mode: /predict answers 503 until restarted.
    let store = ArtifactStore::open(&cfg.model_path, &cfg.scaler_path);
    if !store.is_available() {
        tracing::warn!("serving without a model; /predict will return 503");
    }

    let app = routes::router(routes::AppState::new(Arc::new(store), cfg.log_predictions));

    tracing::info!("listening on {}", cfg.addr);
    let listener = tokio::net::TcpListener::bind(cfg.addr)
        .await
        .with_context(|| format!("failed to bind {}", cfg.addr))?;
    axum::serve(listener, app).await?;
    Ok(())
}
