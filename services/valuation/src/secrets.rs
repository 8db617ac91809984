use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rand::RngCore;
use tokio::sync::RwLock;
use tracing::info;

/// Shared API key for one client entry of the secrets file.
///
/// Only the BLAKE3 digest of the key is held; `blake3::Hash` equality is
/// constant time.
pub struct ApiKeyStore {
    path: PathBuf,
    client: String,
    digest: RwLock<blake3::Hash>,
}

impl ApiKeyStore {
    pub fn load(path: impl Into<PathBuf>, client: impl Into<String>) -> Result<Self> {
        let path = path.into();
        let client = client.into();
        let key = read_api_key(&path, &client)?;
        Ok(Self {
            path,
            client,
            digest: RwLock::new(blake3::hash(key.as_bytes())),
        })
    }

    /// Store for a key known up front; `reload` still reads `path`.
    pub fn from_key(path: impl Into<PathBuf>, client: impl Into<String>, key: &str) -> Self {
        Self {
            path: path.into(),
            client: client.into(),
            digest: RwLock::new(blake3::hash(key.as_bytes())),
        }
    }

    pub async fn verify(&self, supplied: &str) -> bool {
        let supplied = blake3::hash(supplied.as_bytes());
        *self.digest.read().await == supplied
    }

    /// Re-reads the secrets file. On failure the current key stays active.
    pub async fn reload(&self) -> Result<()> {
        let key = read_api_key(&self.path, &self.client)?;
        *self.digest.write().await = blake3::hash(key.as_bytes());
        info!(client = %self.client, "api key reloaded");
        Ok(())
    }
}

fn read_table(path: &Path) -> Result<toml::Table> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read secrets file {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Invalid TOML in {}", path.display()))
}

pub fn read_api_key(path: &Path, client: &str) -> Result<String> {
    let table = read_table(path)?;
    let key = table
        .get(client)
        .and_then(|v| v.as_str())
        .with_context(|| format!("No string entry `{client}` in {}", path.display()))?;
    if key.is_empty() {
        anyhow::bail!("Entry `{client}` in {} is empty", path.display());
    }
    Ok(key.to_string())
}

/// 32 random bytes, hex encoded.
pub fn generate_api_key() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Inserts or replaces `client = key`, keeping every other entry.
pub fn store_api_key(path: &Path, client: &str, key: &str) -> Result<()> {
    let mut table = if path.exists() { read_table(path)? } else { toml::Table::new() };
    table.insert(client.to_string(), toml::Value::String(key.to_string()));

    if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    let content = toml::to_string_pretty(&table)?;
    std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}
