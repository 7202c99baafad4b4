use crate::config::ExporterConfig;
use crate::error::{Error, Result};
use crate::metrics::ClientMetrics;
use crate::syncer::StateSyncer;
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use std::net::SocketAddr;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub syncer: Arc<StateSyncer>,
    pub metrics: Arc<ClientMetrics>,
}

pub fn router(state: AppState, metrics_path: &str) -> Router {
    Router::new()
        .route(metrics_path, get(metrics_handler))
        .with_state(state)
}

// Every scrape re-reads the state file before the registry is encoded, so
// the response always reflects the file as it is right now. A read or parse
// failure fails this request only; the collector retries on its own
// schedule.
async fn metrics_handler(
    State(state): State<AppState>,
) -> std::result::Result<String, (StatusCode, String)> {
    if let Err(e) = state.syncer.sync().await {
        log::error!("failed to sync client state: {}", e);
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("failed to sync client state: {}", e),
        ));
    }

    state.metrics.encode().map_err(|e| {
        log::error!("failed to encode metrics: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "failed to encode metrics".to_string(),
        )
    })
}

pub async fn serve(config: &ExporterConfig, state: AppState) -> Result<()> {
    let app = router(state, &config.metrics_path);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Server(format!("failed to bind {}: {}", addr, e)))?;
    log::info!(
        "boinc-exporter listening on {}{}",
        addr,
        config.metrics_path
    );
    axum::serve(listener, app)
        .await
        .map_err(|e| Error::Server(e.to_string()))?;
    Ok(())
}
