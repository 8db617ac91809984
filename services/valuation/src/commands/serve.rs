use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};
use valuation::{
    build_router, AccessLog, ApiKeyStore, AppConfig, AppState, ModelRegistry, SlidingWindowLimiter,
};

pub async fn run(cfg: AppConfig) -> Result<()> {
    // no service without a model
    let registry = ModelRegistry::load(&cfg.models_dir, &cfg.model_prefix)
        .with_context(|| format!("Failed to load a model from {}", cfg.models_dir.display()))?;
    let api_key = ApiKeyStore::load(&cfg.secrets_path, &cfg.api_client)
        .context("Failed to load the API key")?;
    let api_key = Arc::new(api_key);

    let limiter = Arc::new(SlidingWindowLimiter::new(cfg.rate_limit, cfg.rate_window));
    tokio::spawn(limiter.clone().run_eviction());
    tokio::spawn(reload_on_sighup(api_key.clone()));

    let access_log = AccessLog::spawn(cfg.access_log_path.clone());
    let state = Arc::new(AppState::new(
        cfg.clone(),
        Arc::new(registry),
        api_key,
        limiter,
        access_log.clone(),
    ));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", cfg.bind_addr))?;
    info!(
        addr = %cfg.bind_addr,
        blacklisted = cfg.ip_blacklist.len(),
        rate_limit = cfg.rate_limit,
        "valuation listening"
    );
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    access_log.flush().await;
    info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}

/// SIGHUP re-reads the secrets file, so a rotated key needs no restart.
#[cfg(unix)]
async fn reload_on_sighup(store: Arc<ApiKeyStore>) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangups = match signal(SignalKind::hangup()) {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %e, "SIGHUP handler not installed; key reload disabled");
            return;
        }
    };
    while hangups.recv().await.is_some() {
        if let Err(e) = store.reload().await {
            warn!(error = %e, "api key reload failed; keeping the current key");
        }
    }
}

#[cfg(not(unix))]
async fn reload_on_sighup(_store: Arc<ApiKeyStore>) {}
