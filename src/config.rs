//! Driver configuration (spec.md §6): which natives to install and where the
//! REPL keeps its history. Loaded once at startup, never consulted by the
//! scanner/parser/resolver/interpreter core.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_CONFIG_PATH: &str = "glyph.config.json";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub disabled_natives: Vec<String>,
    pub history_file: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file {path}: {source}")]
    Parse { path: PathBuf, source: serde_json::Error },
}

impl Config {
    /// Loads `path` if given, falls back to `./glyph.config.json` if it
    /// exists, else returns the default config. A config file that exists
    /// but fails to parse is a startup error, not a silently-ignored one.
    pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
        let resolved = match path {
            Some(path) => Some(path.to_path_buf()),
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_PATH);
                default_path.exists().then_some(default_path)
            }
        };

        let Some(path) = resolved else {
            return Ok(Config::default());
        };

        let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Read { path: path.clone(), source })?;
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse { path, source })
    }
}
