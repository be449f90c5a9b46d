//! CLI configuration: flags, then environment, then config file, then defaults.

use std::path::{Path, PathBuf};

use pollchat_core::sort::SortOptions;
use pollchat_core::util::normalize_text_option;
use serde::{Deserialize, Serialize};

use crate::error::CliError;

const APP_DIR_NAME: &str = "pollchat";
const CONFIG_FILE_NAME: &str = "config.json";
const LOCAL_DB_FILE_NAME: &str = "local.db";
const REMOTE_DB_FILE_NAME: &str = "remote.db";

pub const OWNER_ENV: &str = "POLLCHAT_OWNER";
pub const LOCAL_DB_ENV: &str = "POLLCHAT_LOCAL_DB";
pub const REMOTE_DB_ENV: &str = "POLLCHAT_REMOTE_DB";

/// Contents of `<config_dir>/pollchat/config.json`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CliConfig {
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub local_db: Option<PathBuf>,
    #[serde(default)]
    pub remote_db: Option<PathBuf>,
    #[serde(default)]
    pub sort: SortOptions,
}

impl CliConfig {
    pub fn load_from_path(path: &Path) -> Result<Self, CliError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path).map_err(|error| {
            CliError::Config(format!(
                "Failed to read config at {}: {error}",
                path.display()
            ))
        })?;
        let mut config = serde_json::from_str::<Self>(&raw).map_err(|error| {
            CliError::Config(format!(
                "Failed to parse config at {}: {error}",
                path.display()
            ))
        })?;
        config.owner_id = normalize_text_option(config.owner_id.take());
        Ok(config)
    }
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub owner: Option<String>,
    pub local_db: Option<PathBuf>,
    pub remote_db: Option<PathBuf>,
}

/// Fully resolved settings for one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub owner_id: Option<String>,
    pub local_db: PathBuf,
    pub remote_db: PathBuf,
    pub sort: SortOptions,
    pub config_path: PathBuf,
}

impl Settings {
    /// Owner of the listed conversations; required by listing and ranking commands.
    pub fn owner(&self) -> Result<&str, CliError> {
        self.owner_id
            .as_deref()
            .ok_or_else(|| CliError::MissingOwner(self.config_path.display().to_string()))
    }
}

pub fn default_config_path() -> Result<PathBuf, CliError> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
        .ok_or(CliError::NoPlatformDir("config"))
}

fn default_data_dir() -> Result<PathBuf, CliError> {
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .ok_or(CliError::NoPlatformDir("data"))
}

/// Resolve settings from the process environment and the default config file.
pub fn load_settings(overrides: Overrides) -> Result<Settings, CliError> {
    let config_path = default_config_path()?;
    let config = CliConfig::load_from_path(&config_path)?;
    let data_dir = default_data_dir()?;
    Ok(resolve_settings(
        overrides,
        |key| std::env::var(key).ok(),
        config,
        config_path,
        &data_dir,
    ))
}

/// Merge every configuration layer, highest precedence first.
pub fn resolve_settings<F>(
    overrides: Overrides,
    env: F,
    config: CliConfig,
    config_path: PathBuf,
    data_dir: &Path,
) -> Settings
where
    F: Fn(&str) -> Option<String>,
{
    let env_text = |key: &str| normalize_text_option(env(key));
    let env_path = |key: &str| env_text(key).map(PathBuf::from);

    let owner_id = normalize_text_option(overrides.owner)
        .or_else(|| env_text(OWNER_ENV))
        .or(config.owner_id);
    let local_db = overrides
        .local_db
        .or_else(|| env_path(LOCAL_DB_ENV))
        .or(config.local_db)
        .unwrap_or_else(|| data_dir.join(LOCAL_DB_FILE_NAME));
    let remote_db = overrides
        .remote_db
        .or_else(|| env_path(REMOTE_DB_ENV))
        .or(config.remote_db)
        .unwrap_or_else(|| data_dir.join(REMOTE_DB_FILE_NAME));

    Settings {
        owner_id,
        local_db,
        remote_db,
        sort: config.sort,
        config_path,
    }
}
