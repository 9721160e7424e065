// lib/src/config/mod.rs

pub mod config_defaults;
pub mod config_structs;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

pub use config_defaults::*;
pub use config_structs::{
    AppConfig, AuthConfig, ChatConfig, FileConfig, ServerConfig, StorageConfig, StorageEngineType,
};

/// Parses an `AppConfig` from YAML text. Missing sections take defaults.
pub fn parse_config(content: &str) -> Result<AppConfig> {
    if content.trim().is_empty() {
        return Ok(AppConfig::default());
    }
    serde_yaml::from_str(content).context("Failed to parse clinic configuration")
}

/// Loads the configuration from `path` (or `clinic.yaml` in the working
/// directory when it exists), then applies `CLINIC_*` environment overrides.
/// A `.env` file is read first if present.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    if let Ok(env_file) = dotenvy::dotenv() {
        debug!("Loaded environment from {}", env_file.display());
    }

    let path_to_use: Option<PathBuf> = match path {
        Some(p) => Some(p.to_path_buf()),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_FILE);
            default.exists().then_some(default)
        }
    };

    let mut config = match &path_to_use {
        Some(p) => {
            let content = fs::read_to_string(p)
                .with_context(|| format!("Failed to read config file {}", p.display()))?;
            info!("Loaded configuration from {}", p.display());
            parse_config(&content)?
        }
        None => {
            info!("No configuration file found, using defaults");
            AppConfig::default()
        }
    };

    apply_env_overrides(&mut config, |key| env::var(key).ok())?;

    if config.auth.jwt_secret == DEFAULT_JWT_SECRET {
        warn!("Using the built-in development JWT secret; set CLINIC_JWT_SECRET in production");
    }
    if config.auth.jwt_secret.len() < 32 {
        anyhow::bail!("JWT secret must be at least 32 bytes long");
    }
    Ok(config)
}

/// Applies overrides read through `lookup`, which abstracts the process
/// environment for tests.
pub fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(host) = lookup("CLINIC_HOST") {
        config.server.host = host;
    }
    if let Some(port) = lookup("CLINIC_PORT") {
        config.server.port = port
            .parse()
            .with_context(|| format!("CLINIC_PORT is not a valid port: {}", port))?;
    }
    if let Some(engine) = lookup("CLINIC_STORAGE_ENGINE") {
        config.storage.engine = engine.parse()?;
    }
    if let Some(dir) = lookup("CLINIC_DATA_DIR") {
        config.storage.data_directory = PathBuf::from(dir);
    }
    if let Some(secret) = lookup("CLINIC_JWT_SECRET") {
        config.auth.jwt_secret = secret;
    }
    if let Some(email) = lookup("CLINIC_ADMIN_EMAIL") {
        config.auth.admin_email = Some(email);
    }
    if let Some(password) = lookup("CLINIC_ADMIN_PASSWORD") {
        config.auth.admin_password = Some(password);
    }
    if let Some(secs) = lookup("CLINIC_CHAT_POLL_SECS") {
        config.chat.poll_interval_secs = secs
            .parse()
            .with_context(|| format!("CLINIC_CHAT_POLL_SECS is not a number: {}", secs))?;
    }
    Ok(())
}
