use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::data::loader::WINDOW_SIZE;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("Invalid setting: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

fn default_input_path() -> PathBuf {
    PathBuf::from("data/input")
}

fn default_output_path() -> PathBuf {
    PathBuf::from("data/output")
}

fn default_file_limit() -> usize {
    2
}

fn default_window_size() -> usize {
    WINDOW_SIZE
}

fn default_threshold_sigma() -> f64 {
    2.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_input_path")]
    pub input_path: PathBuf,
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,
    #[serde(default = "default_file_limit")]
    pub file_limit: usize,
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    #[serde(default = "default_threshold_sigma")]
    pub threshold_sigma: f64,
    /// Fixed base seed for window offsets; the system clock is used when absent
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            input_path: default_input_path(),
            output_path: default_output_path(),
            file_limit: default_file_limit(),
            window_size: default_window_size(),
            threshold_sigma: default_threshold_sigma(),
            seed: None,
        }
    }
}

impl Settings {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&contents).map_err(|err| match err {
            ConfigError::Yaml { source, .. } => ConfigError::Yaml {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        let settings: Settings =
            serde_yaml::from_str(contents).map_err(|source| ConfigError::Yaml {
                path: PathBuf::from("<inline>"),
                source,
            })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.window_size == 0 {
            return Err(ConfigError::Invalid(
                "window_size must be at least 1".to_string(),
            ));
        }
        if !self.threshold_sigma.is_finite() || self.threshold_sigma <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "threshold_sigma must be a positive number, got {}",
                self.threshold_sigma
            )));
        }
        Ok(())
    }
}
