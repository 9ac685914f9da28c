mod types;

pub use types::*;

use crate::{Error, Result};
use std::{env, path::Path};
use tracing::debug;

pub async fn load() -> Result<Config> {
    let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());

    let mut config = load_from_path(&config_path).await?;

    if let Ok(model_path) = env::var("MODEL_PATH") {
        debug!("Model path overridden from environment: {}", model_path);
        config.model.path = Some(model_path.into());
    }

    config.validate()?;
    Ok(config)
}

pub async fn load_from_path(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    debug!("Loading configuration from: {}", path.display());

    let config_str = tokio::fs::read_to_string(path).await?;
    parse(&config_str)
}

pub fn parse(config_str: &str) -> Result<Config> {
    // An empty document deserializes to unit, not to an all-defaults map.
    if config_str.trim().is_empty() {
        return Ok(Config::default());
    }
    Ok(serde_yaml::from_str(config_str)?)
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(Error::config("server.port must be non-zero"));
        }
        if self.server.max_body_bytes == 0 {
            return Err(Error::config("server.max_body_bytes must be non-zero"));
        }
        if self.model.name.trim().is_empty() {
            return Err(Error::config("model.name must not be empty"));
        }
        if self.model.input_size == 0 {
            return Err(Error::config("model.input_size must be non-zero"));
        }
        Ok(())
    }
}
