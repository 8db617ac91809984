use std::path::Path;

use chrono::Utc;
use estimator::{score, EstimatorError, Frame, GbdtParams, PricingPipeline};
use modelops::{
    next_version_filename, save_artifact, save_metrics, ArtifactFormat, MetricsRecord,
    ModelArtifact,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{DataSource, Result, TrainingError, NON_FEATURE_COLUMNS, TARGET_COLUMN};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TrainingPhase {
    Idle,
    DataLoaded,
    Fitted,
    Evaluated,
    Saved,
}

/// One retraining run: `Idle → DataLoaded → Fitted → Evaluated → Saved`.
///
/// Every step checks the current phase first and only advances on success,
/// so a failed step can be retried without starting over.
#[derive(Debug)]
pub struct TrainingJob {
    phase: TrainingPhase,
    params: GbdtParams,
    train: Option<Frame>,
    test: Option<Frame>,
    pipeline: Option<PricingPipeline>,
    metrics: Option<MetricsRecord>,
    artifact: Option<ModelArtifact>,
}

impl Default for TrainingJob {
    fn default() -> Self {
        Self::new(GbdtParams::default())
    }
}

impl TrainingJob {
    pub fn new(params: GbdtParams) -> Self {
        Self {
            phase: TrainingPhase::Idle,
            params,
            train: None,
            test: None,
            pipeline: None,
            metrics: None,
            artifact: None,
        }
    }

    pub fn phase(&self) -> TrainingPhase {
        self.phase
    }

    pub fn pipeline(&self) -> Option<&PricingPipeline> {
        self.pipeline.as_ref()
    }

    pub fn metrics(&self) -> Option<&MetricsRecord> {
        self.metrics.as_ref()
    }

    pub fn artifact(&self) -> Option<&ModelArtifact> {
        self.artifact.as_ref()
    }

    fn expect_phase(&self, from: TrainingPhase, to: TrainingPhase) -> Result<()> {
        if self.phase != from {
            return Err(TrainingError::InvalidTransition { from: self.phase, to });
        }
        Ok(())
    }

    pub async fn load(&mut self, source: &DataSource) -> Result<()> {
        self.expect_phase(TrainingPhase::Idle, TrainingPhase::DataLoaded)?;
        info!(source = %source.kind(), "loading training data");
        let (train, test) = source.load().await?;
        self.load_frames(train, test)
    }

    /// Same as [`TrainingJob::load`] for data already in memory.
    pub fn load_frames(&mut self, train: Frame, test: Frame) -> Result<()> {
        self.expect_phase(TrainingPhase::Idle, TrainingPhase::DataLoaded)?;
        if train.n_rows() == 0 || test.n_rows() == 0 {
            return Err(TrainingError::DataSource(
                "train and test sets must both be non-empty".into(),
            ));
        }
        info!(train_rows = train.n_rows(), test_rows = test.n_rows(), "data loaded");
        self.train = Some(train);
        self.test = Some(test);
        self.phase = TrainingPhase::DataLoaded;
        Ok(())
    }

    pub fn fit(&mut self) -> Result<&PricingPipeline> {
        self.expect_phase(TrainingPhase::DataLoaded, TrainingPhase::Fitted)?;
        let train = self.train.as_ref().ok_or(EstimatorError::EmptyDataset)?;
        let (features, target) = split_features(train)?;
        info!(
            features = ?features.column_names(),
            n_estimators = self.params.n_estimators,
            "fitting pipeline"
        );
        let pipeline = PricingPipeline::fit(&features, &target, self.params.clone())?;
        self.phase = TrainingPhase::Fitted;
        Ok(&*self.pipeline.insert(pipeline))
    }

    pub fn evaluate(&mut self) -> Result<&MetricsRecord> {
        self.expect_phase(TrainingPhase::Fitted, TrainingPhase::Evaluated)?;
        let test = self.test.as_ref().ok_or(EstimatorError::EmptyDataset)?;
        let pipeline = self.pipeline.as_ref().ok_or(EstimatorError::EmptyDataset)?;

        let (features, truth) = split_features(test)?;
        let predictions = pipeline.predict(&features)?;
        let scores = score(&truth, &predictions)?;
        info!(rmse = scores.rmse, mape = scores.mape, mae = scores.mae, "evaluated on test set");

        self.phase = TrainingPhase::Evaluated;
        Ok(&*self.metrics.insert(MetricsRecord {
            rmse: scores.rmse,
            mape: scores.mape,
            mae: scores.mae,
            timestamp: Utc::now().to_rfc3339(),
        }))
    }

    /// Writes the next artifact version under `base_path` (e.g.
    /// `models/property_friends`), then records the metrics under the
    /// artifact's file name.
    pub fn persist(
        &mut self,
        base_path: &Path,
        metrics_file: &Path,
        format: ArtifactFormat,
    ) -> Result<&ModelArtifact> {
        self.expect_phase(TrainingPhase::Evaluated, TrainingPhase::Saved)?;
        let pipeline = self.pipeline.as_ref().ok_or(EstimatorError::EmptyDataset)?;
        let metrics = self.metrics.as_ref().ok_or(EstimatorError::EmptyDataset)?;

        let filename = next_version_filename(base_path)?;
        let artifact = save_artifact(pipeline, &filename, format)?;
        save_metrics(metrics_file, &artifact.file_name(), metrics)?;
        info!(artifact = %artifact.path.display(), version = artifact.version, "model saved");

        self.phase = TrainingPhase::Saved;
        Ok(&*self.artifact.insert(artifact))
    }
}

/// Model inputs and the `price` target of a labelled frame.
pub fn split_features(frame: &Frame) -> Result<(Frame, Vec<f64>)> {
    let target = frame.numeric(TARGET_COLUMN)?.to_vec();
    if target.iter().any(|v| !v.is_finite()) {
        return Err(EstimatorError::NonFinite(TARGET_COLUMN.to_string()).into());
    }
    Ok((frame.without_columns(&NON_FEATURE_COLUMNS), target))
}
