use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ModelOpsError;

/// On-disk encoding of a model artifact.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactFormat {
    /// Compact binary (`.bin`)
    Bincode,
    /// Human-readable (`.json`)
    Json,
}

impl ArtifactFormat {
    /// Lookup order. When two artifacts share a version, the first format wins.
    pub const ALL: [ArtifactFormat; 2] = [ArtifactFormat::Bincode, ArtifactFormat::Json];

    pub fn extension(self) -> &'static str {
        match self {
            ArtifactFormat::Bincode => "bin",
            ArtifactFormat::Json => "json",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.extension() == ext)
    }
}

impl fmt::Display for ArtifactFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactFormat::Bincode => f.write_str("bincode"),
            ArtifactFormat::Json => f.write_str("json"),
        }
    }
}

impl FromStr for ArtifactFormat {
    type Err = ModelOpsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bincode" | "bin" => Ok(ArtifactFormat::Bincode),
            "json" => Ok(ArtifactFormat::Json),
            other => Err(ModelOpsError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// A versioned model file: `{dir}/{prefix}_v{version}.{ext}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub prefix: String,
    pub version: u32,
    pub format: ArtifactFormat,
    pub path: PathBuf,
}

impl ModelArtifact {
    /// Key used in the metrics mapping, e.g. `property_friends_v3.bin`.
    pub fn file_name(&self) -> String {
        artifact_file_name(&self.prefix, self.version, self.format)
    }
}

pub fn artifact_file_name(prefix: &str, version: u32, format: ArtifactFormat) -> String {
    format!("{prefix}_v{version}.{}", format.extension())
}

/// Splits `{prefix}_v{N}.{ext}` into its version and format. Anything else
/// (other prefixes, temp files, non-numeric or zero versions) yields `None`.
pub fn parse_artifact_name(file_name: &str, prefix: &str) -> Option<(u32, ArtifactFormat)> {
    let rest = file_name.strip_prefix(prefix)?.strip_prefix("_v")?;
    let (version, ext) = rest.split_once('.')?;
    if version.is_empty() || !version.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let version: u32 = version.parse().ok()?;
    if version == 0 {
        return None;
    }
    Some((version, ArtifactFormat::from_extension(ext)?))
}

/// Evaluation of one artifact on its held-out split.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetricsRecord {
    #[serde(rename = "RMSE")]
    pub rmse: f64,
    #[serde(rename = "MAPE")]
    pub mape: f64,
    #[serde(rename = "MAE")]
    pub mae: f64,
    /// RFC 3339
    pub timestamp: String,
}
