use std::path::PathBuf;

use crate::config::Config;
use color_eyre::Result;
use dirs::data_dir;
use docket_store::JsonFileRepo;
use tracing::debug;

/// Resolve the default durable task file for Docket.
pub fn default_data_file() -> Result<PathBuf> {
    let base = data_dir().ok_or_else(|| color_eyre::eyre::eyre!("no data dir available"))?;
    Ok(base.join("docket").join("tasks.json"))
}

/// Open the task repository honoring config overrides.
pub fn repo_from_config(config: &Config) -> Result<JsonFileRepo> {
    let path = match &config.data_file {
        Some(path) => {
            debug!(?path, "opening task store (config override)");
            path.clone()
        }
        None => {
            let path = default_data_file()?;
            debug!(?path, "opening task store");
            path
        }
    };
    Ok(JsonFileRepo::open(path))
}

/// Helper for tests to construct a repository rooted at a temp dir.
#[cfg(test)]
pub fn test_repo(root: impl Into<PathBuf>) -> JsonFileRepo {
    JsonFileRepo::open(root.into().join("tasks.json"))
}
