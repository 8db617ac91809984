use std::path::Path;

use chrono::{DateTime, Utc};
use estimator::{EstimatorError, PricingPipeline, PropertyRecord};
use modelops::{artifact_digest, latest_artifact, load_artifact, ModelArtifact};
use tracing::info;

/// The one model served for the lifetime of the process.
///
/// Built once at startup from the highest-versioned artifact and never
/// mutated; a newer artifact takes effect on restart.
#[derive(Debug)]
pub struct ModelRegistry {
    artifact: ModelArtifact,
    digest: String,
    loaded_at: DateTime<Utc>,
    pipeline: PricingPipeline,
}

impl ModelRegistry {
    pub fn load(dir: &Path, prefix: &str) -> modelops::Result<Self> {
        let artifact = latest_artifact(dir, prefix)?;
        let pipeline: PricingPipeline = load_artifact(&artifact)?;
        let digest = artifact_digest(&artifact.path)?;
        info!(
            artifact = %artifact.file_name(),
            format = %artifact.format,
            digest = %digest,
            "model loaded"
        );
        Ok(Self {
            artifact,
            digest,
            loaded_at: Utc::now(),
            pipeline,
        })
    }

    pub fn artifact(&self) -> &ModelArtifact {
        &self.artifact
    }

    pub fn digest(&self) -> &str {
        &self.digest
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn pipeline(&self) -> &PricingPipeline {
        &self.pipeline
    }

    pub fn predict(&self, record: &PropertyRecord) -> estimator::Result<f64> {
        let price = self
            .pipeline
            .predict(&record.to_frame())?
            .first()
            .copied()
            .ok_or(EstimatorError::EmptyDataset)?;
        if !price.is_finite() {
            return Err(EstimatorError::NonFinite("price".to_string()));
        }
        Ok(price)
    }
}
