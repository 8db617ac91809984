//! Offline training of the pricing pipeline
//!
//! Loads a labelled table from CSV files or Postgres, fits the
//! `estimator::PricingPipeline`, scores it on the held-out split and
//! publishes a new versioned artifact with its metrics entry.

pub mod source;
pub mod csv_source;
pub mod db_source;
pub mod split;
pub mod job;

pub use source::*;
pub use split::*;
pub use job::*;

use thiserror::Error;

/// Target column of every training table.
pub const TARGET_COLUMN: &str = "price";
/// Columns that are never model inputs.
pub const NON_FEATURE_COLUMNS: [&str; 3] = ["id", TARGET_COLUMN, "is_test"];

#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("Data source error: {0}")]
    DataSource(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Estimator error: {0}")]
    Estimator(#[from] estimator::EstimatorError),

    #[error("Artifact error: {0}")]
    Artifact(#[from] modelops::ModelOpsError),

    #[error("Cannot go from {from:?} to {to:?}")]
    InvalidTransition { from: TrainingPhase, to: TrainingPhase },
}

pub type Result<T> = std::result::Result<T, TrainingError>;
