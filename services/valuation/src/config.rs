use std::collections::HashSet;
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub bind_addr: String,

    pub models_dir: PathBuf,
    pub model_prefix: String,
    pub metrics_file: PathBuf,

    pub secrets_path: PathBuf,
    pub api_client: String,
    pub ip_blacklist: HashSet<IpAddr>,
    pub rate_limit: usize,
    pub rate_window: Duration,

    pub access_log_path: PathBuf,
    pub log_dir: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; unset keys take their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let models_dir = PathBuf::from(get("MODELS_DIR", "models"));
        let metrics_file = lookup("METRICS_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| models_dir.join("model_metrics.json"));

        let rate_limit: usize = parse("RATE_LIMIT", &get("RATE_LIMIT", "5"))?;
        let rate_window_secs: u64 = parse("RATE_WINDOW_SECS", &get("RATE_WINDOW_SECS", "60"))?;

        // Tiny sanity checks (fail fast, fail loud)
        if rate_limit == 0 {
            bail!("RATE_LIMIT must be at least 1");
        }
        if rate_window_secs == 0 {
            bail!("RATE_WINDOW_SECS must be at least 1");
        }
        let model_prefix = get("MODEL_PREFIX", "property_friends");
        if model_prefix.is_empty() {
            bail!("MODEL_PREFIX must not be empty");
        }

        Ok(Self {
            bind_addr: get("BIND_ADDR", "0.0.0.0:8000"),
            models_dir,
            model_prefix,
            metrics_file,
            secrets_path: PathBuf::from(get("SECRETS_PATH", "secrets.toml")),
            api_client: get("API_CLIENT", "property_friends"),
            ip_blacklist: parse_blacklist(&get("IP_BLACKLIST", ""))?,
            rate_limit,
            rate_window: Duration::from_secs(rate_window_secs),
            access_log_path: PathBuf::from(get("ACCESS_LOG_PATH", "logs/api_logs.json")),
            log_dir: PathBuf::from(get("LOG_DIR", "logs")),
        })
    }

    /// `{models_dir}/{model_prefix}`, the base name new artifacts are versioned under.
    pub fn model_base_path(&self) -> PathBuf {
        self.models_dir.join(&self.model_prefix)
    }
}

fn parse<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("Invalid value for env var {key}: {value:?}"))
}

/// Comma-separated addresses; blanks are skipped.
pub fn parse_blacklist(raw: &str) -> Result<HashSet<IpAddr>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| parse::<IpAddr>("IP_BLACKLIST", s))
        .collect()
}
