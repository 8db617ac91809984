use std::sync::Arc;

use crate::{AccessLog, ApiKeyStore, AppConfig, ModelRegistry, RateLimiter};

pub type SharedState = Arc<AppState>;

/// Everything a request handler needs, built once at startup.
pub struct AppState {
    pub config: AppConfig,
    pub registry: Arc<ModelRegistry>,
    pub api_key: Arc<ApiKeyStore>,
    pub limiter: Arc<dyn RateLimiter>,
    pub access_log: AccessLog,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        registry: Arc<ModelRegistry>,
        api_key: Arc<ApiKeyStore>,
        limiter: Arc<dyn RateLimiter>,
        access_log: AccessLog,
    ) -> Self {
        Self {
            config,
            registry,
            api_key,
            limiter,
            access_log,
        }
    }
}
