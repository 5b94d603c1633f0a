use crate::types::Config;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::warn;

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {path}"))?;
        let config: Config =
            serde_yaml::from_str(&contents).context("failed to parse config file")?;
        Ok(config)
    }

    /// Load from `path`, falling back to built-in defaults when the file is
    /// missing. A malformed file is still an error.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::load(path)
        } else {
            warn!("Config file {} not found, using defaults", path);
            Ok(Config::default())
        }
    }
}
