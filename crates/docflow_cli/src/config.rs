use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use docflow_engine::{ApiSettings, EngineConfig, PollPolicy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cli::GlobalArgs;

pub const DEFAULT_CONFIG_FILENAME: &str = "docflow.ron";
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// Optional settings read from `docflow.ron`. Missing fields keep their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub base_url: Option<String>,
    pub poll_interval_ms: Option<u64>,
    pub max_unrecognized: Option<u32>,
    pub max_attempts: Option<u32>,
    pub request_timeout_secs: Option<u64>,
    pub samples_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub log_to_file: Option<bool>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// A parsed config file and where it came from, if anywhere.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedConfig {
    pub file: FileConfig,
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub engine: EngineConfig,
    pub output_dir: PathBuf,
    pub log_to_file: bool,
}

/// Loads the config file. An explicit path must exist; the default
/// `docflow.ron` is optional.
pub fn load_file_config(explicit: Option<&Path>) -> Result<LoadedConfig, ConfigError> {
    let (path, required) = match explicit {
        Some(path) => (path.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_FILENAME), false),
    };
    let content = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) if !required && err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(LoadedConfig::default());
        }
        Err(source) => return Err(ConfigError::Read { path, source }),
    };
    let file = ron::from_str(&content).map_err(|err| ConfigError::Parse {
        path: path.clone(),
        message: err.to_string(),
    })?;
    Ok(LoadedConfig {
        file,
        path: Some(path),
    })
}

/// Layers defaults, the file, the environment and command-line flags, in
/// increasing priority.
pub fn resolve(
    file: FileConfig,
    env: impl Fn(&str) -> Option<String>,
    flags: &GlobalArgs,
) -> AppConfig {
    let mut api = ApiSettings::default();
    if let Some(base_url) = file.base_url {
        api.base_url = base_url;
    }
    if let Some(secs) = file.request_timeout_secs {
        api.request_timeout = Duration::from_secs(secs);
    }
    let mut api = api.with_env_overrides(env);
    if let Some(base_url) = &flags.base_url {
        api.base_url = base_url.clone();
    }

    let mut poll = PollPolicy::default();
    if let Some(ms) = file.poll_interval_ms {
        poll.interval = Duration::from_millis(ms);
    }
    if file.max_unrecognized.is_some() {
        poll.max_unrecognized = file.max_unrecognized;
    }
    if file.max_attempts.is_some() {
        poll.max_attempts = file.max_attempts;
    }

    let defaults = EngineConfig::default();
    AppConfig {
        engine: EngineConfig {
            api,
            poll,
            samples_dir: file.samples_dir.unwrap_or(defaults.samples_dir),
        },
        output_dir: file
            .output_dir
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
        log_to_file: flags.log_file || file.log_to_file.unwrap_or(false),
    }
}
