//! Price estimator
//!
//! Tabular frames, a smoothed target encoder for categorical columns and a
//! least-squares gradient boosted tree regressor, composed into the
//! `PricingPipeline` that gets trained offline and served online.

pub mod frame;
pub mod record;
pub mod encoder;
pub mod gbdt;
pub mod pipeline;
pub mod metrics;

pub use frame::*;
pub use record::*;
pub use encoder::*;
pub use gbdt::*;
pub use pipeline::*;
pub use metrics::*;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EstimatorError {
    #[error("Empty dataset")]
    EmptyDataset,

    #[error("Length mismatch: expected {expected} rows, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Column `{column}` is not {expected}")]
    ColumnType { column: String, expected: &'static str },

    #[error("Duplicate column: {0}")]
    DuplicateColumn(String),

    #[error("Non-finite value in column `{0}`")]
    NonFinite(String),

    #[error("Invalid property record: {0}")]
    InvalidRecord(String),
}

pub type Result<T> = std::result::Result<T, EstimatorError>;
