use std::path::PathBuf;

use anyhow::Result;
use modelops::ArtifactFormat;
use tracing::info;
use training::{DataSource, DataSourceKind, TrainingJob};
use valuation::AppConfig;

pub async fn run(
    cfg: &AppConfig,
    kind: DataSourceKind,
    train_path: Option<PathBuf>,
    test_path: Option<PathBuf>,
    db_url: Option<String>,
    table_name: Option<String>,
    format: ArtifactFormat,
) -> Result<()> {
    let source = DataSource::from_params(kind, train_path, test_path, db_url, table_name)?;

    let mut job = TrainingJob::default();
    job.load(&source).await?;
    job.fit()?;
    let metrics = job.evaluate()?.clone();
    let artifact = job.persist(&cfg.model_base_path(), &cfg.metrics_file, format)?;

    info!(artifact = %artifact.path.display(), "training finished");
    println!("Model saved to {}", artifact.path.display());
    println!("RMSE: {:.4}  MAPE: {:.4}  MAE: {:.4}", metrics.rmse, metrics.mape, metrics.mae);
    Ok(())
}
