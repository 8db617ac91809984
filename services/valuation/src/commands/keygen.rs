use std::path::Path;

use anyhow::Result;
use tracing::info;
use valuation::secrets::{generate_api_key, store_api_key};

pub fn run(secrets_path: &Path, client: &str) -> Result<()> {
    let key = generate_api_key();
    store_api_key(secrets_path, client, &key)?;
    info!(client, path = %secrets_path.display(), "api key stored");
    println!("API key for '{client}' saved in {}.", secrets_path.display());
    println!("{key}");
    Ok(())
}
