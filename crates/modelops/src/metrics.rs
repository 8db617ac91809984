use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::store::write_atomic;
use crate::{MetricsRecord, ModelOpsError, Result};

/// Artifact file name → metrics of that artifact.
pub type MetricsMap = BTreeMap<String, MetricsRecord>;

/// Missing or empty file reads as an empty mapping.
pub fn load_metrics(path: &Path) -> Result<MetricsMap> {
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(MetricsMap::new()),
        Err(e) => return Err(e.into()),
    };
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(MetricsMap::new());
    }
    serde_json::from_slice(&bytes).map_err(|e| ModelOpsError::Ser(e.to_string()))
}

/// Read-modify-write of the whole mapping; the entry for `artifact_key` is
/// replaced, all others are kept. Callers must not run concurrently.
pub fn save_metrics(path: &Path, artifact_key: &str, metrics: &MetricsRecord) -> Result<()> {
    let mut all = load_metrics(path)?;
    all.insert(artifact_key.to_string(), metrics.clone());

    let bytes = serde_json::to_vec_pretty(&all).map_err(|e| ModelOpsError::Ser(e.to_string()))?;
    if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    write_atomic(path, &bytes)
}

/// Entries ordered by training timestamp, newest first.
pub fn metrics_history(all: &MetricsMap) -> Vec<(&str, &MetricsRecord)> {
    let mut out: Vec<(&str, &MetricsRecord)> = all.iter().map(|(k, v)| (k.as_str(), v)).collect();
    out.sort_by(|a, b| b.1.timestamp.cmp(&a.1.timestamp).then_with(|| a.0.cmp(b.0)));
    out
}
