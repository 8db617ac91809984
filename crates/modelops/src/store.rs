use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

use crate::{parse_artifact_name, ArtifactFormat, ModelArtifact};

#[derive(Debug, Error)]
pub enum ModelOpsError {
    #[error("No model artifact named {prefix}_v<N>.<ext> in {dir}")]
    NotFound { dir: String, prefix: String },
    #[error("Unsupported artifact format: {0}")]
    UnsupportedFormat(String),
    #[error("Invalid artifact name: {0}")]
    InvalidName(String),
    #[error("No version left after {prefix}_v{max}")]
    VersionOverflow { prefix: String, max: u32 },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Ser(String),
}

pub type Result<T> = std::result::Result<T, ModelOpsError>;

/// Every artifact for `prefix` in `dir`, unordered.
pub fn list_artifacts(dir: &Path, prefix: &str) -> Result<Vec<ModelArtifact>> {
    let mut out = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if let Some((version, format)) = parse_artifact_name(name, prefix) {
            out.push(ModelArtifact {
                prefix: prefix.to_string(),
                version,
                format,
                path: entry.path(),
            });
        }
    }
    Ok(out)
}

/// Highest-versioned artifact. Equal versions resolve by `ArtifactFormat::ALL` order.
pub fn latest_artifact(dir: &Path, prefix: &str) -> Result<ModelArtifact> {
    let not_found = || ModelOpsError::NotFound {
        dir: dir.display().to_string(),
        prefix: prefix.to_string(),
    };
    if !dir.is_dir() {
        return Err(not_found());
    }

    list_artifacts(dir, prefix)?
        .into_iter()
        .max_by(|a, b| {
            a.version
                .cmp(&b.version)
                .then_with(|| format_rank(b.format).cmp(&format_rank(a.format)))
        })
        .ok_or_else(not_found)
}

fn format_rank(format: ArtifactFormat) -> usize {
    ArtifactFormat::ALL
        .iter()
        .position(|f| *f == format)
        .unwrap_or(usize::MAX)
}

/// `{base_path}_v{max + 1}` where `max` is the highest version present in any
/// supported format. Gaps left by deleted artifacts are never refilled.
pub fn next_version_filename(base_path: &Path) -> Result<PathBuf> {
    let (dir, prefix) = split_base_path(base_path)?;
    let max = if dir.is_dir() {
        list_artifacts(&dir, &prefix)?
            .iter()
            .map(|a| a.version)
            .max()
            .unwrap_or(0)
    } else {
        0
    };
    let next = max
        .checked_add(1)
        .ok_or_else(|| ModelOpsError::VersionOverflow { prefix: prefix.clone(), max })?;
    Ok(dir.join(format!("{prefix}_v{next}")))
}

fn split_base_path(base_path: &Path) -> Result<(PathBuf, String)> {
    let prefix = base_path
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ModelOpsError::InvalidName(base_path.display().to_string()))?;
    let dir = match base_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((dir, prefix.to_string()))
}

/// Writes `{filename}.{ext}` atomically (temp file + rename) and returns the
/// artifact. `filename` must look like `.../{prefix}_v{N}` with `N >= 1`.
pub fn save_artifact<T: Serialize>(
    model: &T,
    filename: &Path,
    format: ArtifactFormat,
) -> Result<ModelArtifact> {
    let (dir, stem) = split_base_path(filename)?;
    let (prefix, version) = stem
        .rsplit_once("_v")
        .and_then(|(p, v)| Some((p.to_string(), v.parse::<u32>().ok()?)))
        .filter(|(p, v)| !p.is_empty() && *v > 0)
        .ok_or_else(|| ModelOpsError::InvalidName(stem.clone()))?;

    let bytes = match format {
        ArtifactFormat::Bincode => {
            bincode::serialize(model).map_err(|e| ModelOpsError::Ser(e.to_string()))?
        }
        ArtifactFormat::Json => {
            serde_json::to_vec(model).map_err(|e| ModelOpsError::Ser(e.to_string()))?
        }
    };

    fs::create_dir_all(&dir)?;
    let artifact = ModelArtifact {
        path: dir.join(format!("{stem}.{}", format.extension())),
        prefix,
        version,
        format,
    };
    write_atomic(&artifact.path, &bytes)?;
    Ok(artifact)
}

/// Same as [`save_artifact`] with the format given by name, as taken from
/// user input. Unknown names fail before anything is written.
pub fn save_artifact_as<T: Serialize>(
    model: &T,
    filename: &Path,
    format: &str,
) -> Result<ModelArtifact> {
    save_artifact(model, filename, format.parse()?)
}

pub fn load_artifact<T: DeserializeOwned>(artifact: &ModelArtifact) -> Result<T> {
    let bytes = fs::read(&artifact.path)?;
    match artifact.format {
        ArtifactFormat::Bincode => {
            bincode::deserialize(&bytes).map_err(|e| ModelOpsError::Ser(e.to_string()))
        }
        ArtifactFormat::Json => {
            serde_json::from_slice(&bytes).map_err(|e| ModelOpsError::Ser(e.to_string()))
        }
    }
}

/// Temp file in the destination directory, then rename, so readers never
/// observe a partially written file.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ModelOpsError::InvalidName(path.display().to_string()))?;
    let tmp = dir.join(format!(".{name}.{}.tmp", uuid::Uuid::new_v4()));

    let res = (|| {
        let mut f = fs::File::create(&tmp)?;
        f.write_all(bytes)?;
        f.sync_all()?;
        fs::rename(&tmp, path)
    })();
    if res.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    Ok(res?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_base_path() {
        let (dir, prefix) = split_base_path(Path::new("models/property_friends")).unwrap();
        assert_eq!(dir, PathBuf::from("models"));
        assert_eq!(prefix, "property_friends");

        let (dir, _) = split_base_path(Path::new("property_friends")).unwrap();
        assert_eq!(dir, PathBuf::from("."));
    }

    #[test]
    fn test_save_artifact_rejects_unversioned_name() {
        let dir = tempfile::tempdir().unwrap();
        let res = save_artifact(&1u32, &dir.path().join("model"), ArtifactFormat::Json);
        assert!(matches!(res, Err(ModelOpsError::InvalidName(_))));
    }

    #[test]
    fn test_save_artifact_rejects_version_zero() {
        let dir = tempfile::tempdir().unwrap();
        let stem = dir.path().join("property_friends_v0");
        let res = save_artifact(&1u32, &stem, ArtifactFormat::Bincode);
        assert!(matches!(res, Err(ModelOpsError::InvalidName(_))));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_save_artifact_as_rejects_unknown_format() {
        let dir = tempfile::tempdir().unwrap();
        let res = save_artifact_as(&1u32, &dir.path().join("m_v1"), "pickle");
        assert!(matches!(res, Err(ModelOpsError::UnsupportedFormat(_))));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
