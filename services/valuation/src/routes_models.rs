use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use estimator::GbdtParams;
use modelops::{load_metrics, MetricsRecord};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::error;

use crate::monitoring::{self, ModelHistoryEntry, MonitoringReport};
use crate::{ApiError, SharedState};

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[derive(Serialize)]
pub struct ModelMetadata {
    pub artifact: String,
    pub version: u32,
    pub format: String,
    pub digest: String,
    pub loaded_at: DateTime<Utc>,
    pub feature_columns: Vec<String>,
    pub categorical_columns: Vec<String>,
    pub params: GbdtParams,
    pub metrics: Option<MetricsRecord>,
}

pub async fn model_metadata(
    State(st): State<SharedState>,
) -> Result<Json<ModelMetadata>, ApiError> {
    let registry = &st.registry;
    let artifact = registry.artifact();
    let key = artifact.file_name();

    let metrics_file = st.config.metrics_file.clone();
    let metrics = blocking(move || load_metrics(&metrics_file)).await?.remove(&key);

    let pipeline = registry.pipeline();
    Ok(Json(ModelMetadata {
        artifact: key,
        version: artifact.version,
        format: artifact.format.to_string(),
        digest: registry.digest().to_string(),
        loaded_at: registry.loaded_at(),
        feature_columns: pipeline.feature_columns().to_vec(),
        categorical_columns: pipeline.categorical_columns().to_vec(),
        params: pipeline.params().clone(),
        metrics,
    }))
}

pub async fn model_history(
    State(st): State<SharedState>,
) -> Result<Json<Vec<ModelHistoryEntry>>, ApiError> {
    let metrics_file = st.config.metrics_file.clone();
    Ok(Json(blocking(move || monitoring::model_history(&metrics_file)).await?))
}

pub async fn get_monitoring(
    State(st): State<SharedState>,
) -> Result<Json<MonitoringReport>, ApiError> {
    st.access_log.flush().await;
    let log_path = st.config.access_log_path.clone();
    let metrics_file = st.config.metrics_file.clone();
    Ok(Json(blocking(move || monitoring::report(&log_path, &metrics_file)).await?))
}

/// Runs file reads off the async workers. Failures are logged and reported
/// without their cause.
async fn blocking<T, E, F>(f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    E: std::fmt::Display + Send + 'static,
    F: FnOnce() -> Result<T, E> + Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(Ok(v)) => Ok(v),
        Ok(Err(e)) => {
            error!(error = %e, "read failed");
            Err(ApiError::Internal("failed to read model data".into()))
        }
        Err(e) => {
            error!(error = %e, "blocking task panicked");
            Err(ApiError::Internal("failed to read model data".into()))
        }
    }
}
