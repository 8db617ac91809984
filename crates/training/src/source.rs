use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use estimator::Frame;
use tracing::info;

use crate::{csv_source, db_source, split, Result, TrainingError};

/// Held-out fraction when a single table has to be split.
pub const TEST_FRACTION: f64 = 0.2;
/// Seed of the split; the same table always splits the same way.
pub const SPLIT_SEED: u64 = 42;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataSourceKind {
    Csv,
    Db,
    DbWithPreprocessing,
}

impl FromStr for DataSourceKind {
    type Err = TrainingError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "csv" => Ok(DataSourceKind::Csv),
            "db" => Ok(DataSourceKind::Db),
            "db-with-preprocessing" | "db_best_practice" => Ok(DataSourceKind::DbWithPreprocessing),
            other => Err(TrainingError::DataSource(format!(
                "invalid data source `{other}`; choose csv, db or db-with-preprocessing"
            ))),
        }
    }
}

impl fmt::Display for DataSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DataSourceKind::Csv => "csv",
            DataSourceKind::Db => "db",
            DataSourceKind::DbWithPreprocessing => "db-with-preprocessing",
        })
    }
}

/// Where the train/test sets come from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DataSource {
    /// Two files, already split.
    Csv { train_path: PathBuf, test_path: PathBuf },
    /// One table, split here. `preprocess` drops rows with non-positive
    /// price or areas before splitting.
    Db { db_url: String, table_name: String, preprocess: bool },
}

impl DataSource {
    /// Validates that the parameters required by `kind` are present.
    pub fn from_params(
        kind: DataSourceKind,
        train_path: Option<PathBuf>,
        test_path: Option<PathBuf>,
        db_url: Option<String>,
        table_name: Option<String>,
    ) -> Result<Self> {
        match kind {
            DataSourceKind::Csv => match (train_path, test_path) {
                (Some(train_path), Some(test_path)) => {
                    Ok(DataSource::Csv { train_path, test_path })
                }
                _ => Err(TrainingError::DataSource(
                    "for the csv data source, both train_path and test_path must be provided".into(),
                )),
            },
            DataSourceKind::Db | DataSourceKind::DbWithPreprocessing => {
                match (db_url.filter(|s| !s.is_empty()), table_name.filter(|s| !s.is_empty())) {
                    (Some(db_url), Some(table_name)) => Ok(DataSource::Db {
                        db_url,
                        table_name,
                        preprocess: kind == DataSourceKind::DbWithPreprocessing,
                    }),
                    _ => Err(TrainingError::DataSource(format!(
                        "for the {kind} data source, both db_url and table_name must be provided"
                    ))),
                }
            }
        }
    }

    pub fn kind(&self) -> DataSourceKind {
        match self {
            DataSource::Csv { .. } => DataSourceKind::Csv,
            DataSource::Db { preprocess: false, .. } => DataSourceKind::Db,
            DataSource::Db { preprocess: true, .. } => DataSourceKind::DbWithPreprocessing,
        }
    }

    /// Returns `(train, test)`.
    pub async fn load(&self) -> Result<(Frame, Frame)> {
        match self {
            DataSource::Csv { train_path, test_path } => {
                let train = csv_source::read_frame(train_path)?;
                let test = csv_source::read_frame(test_path)?;
                info!(train_rows = train.n_rows(), test_rows = test.n_rows(), "loaded csv pair");
                Ok((train, test))
            }
            DataSource::Db { db_url, table_name, preprocess } => {
                let mut data = db_source::load_table(db_url, table_name).await?;
                info!(rows = data.n_rows(), table = %table_name, "loaded table");
                if *preprocess {
                    let before = data.n_rows();
                    data = split::remove_invalid_rows(&data)?;
                    info!(removed = before - data.n_rows(), "removed invalid rows");
                }
                split::train_test_split(&data, TEST_FRACTION, SPLIT_SEED)
            }
        }
    }
}
