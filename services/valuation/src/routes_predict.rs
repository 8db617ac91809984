use axum::{extract::rejection::JsonRejection, extract::State, Json};
use estimator::PropertyRecord;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::{ApiError, SharedState};

#[derive(Debug, Serialize, Deserialize)]
pub struct PredictionResult {
    pub price: f64,
}

pub async fn predict(
    State(st): State<SharedState>,
    payload: Result<Json<PropertyRecord>, JsonRejection>,
) -> Result<Json<PredictionResult>, ApiError> {
    let Json(record) = payload.map_err(|e| ApiError::InvalidInput(e.body_text()))?;
    record
        .validate()
        .map_err(|e| ApiError::InvalidInput(e.to_string()))?;

    match st.registry.predict(&record) {
        Ok(price) => {
            info!(price, "prediction generated");
            Ok(Json(PredictionResult { price }))
        }
        Err(e) => {
            error!(error = %e, "prediction failed");
            Err(ApiError::PredictionFailed)
        }
    }
}
