use config::{Config as ConfigLoader, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

use super::error::Error;
use arb_loop_core::{FinderMode, SearchOptions};

#[derive(Debug, Deserialize, Clone)]
pub struct SnapshotConfig {
    pub path: PathBuf,
    /// Exchange name attached to the graph and to every log line of the search.
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    /// Asset label the search starts from.
    pub source: String,
    #[serde(default)]
    pub loop_from_source: bool,
    #[serde(default)]
    pub ensure_profit: bool,
    #[serde(default)]
    pub unique_paths: bool,
    #[serde(default)]
    pub depth: bool,
    #[serde(default = "default_starting_amount")]
    pub starting_amount: f64,
    pub max_results: Option<usize>,
}

fn default_starting_amount() -> f64 {
    1.0
}

impl SearchConfig {
    pub fn options(&self) -> SearchOptions {
        SearchOptions {
            loop_from_source: self.loop_from_source,
            ensure_profit: self.ensure_profit,
            unique_paths: self.unique_paths,
        }
    }

    pub fn mode(&self) -> FinderMode {
        if self.depth {
            FinderMode::Depth
        } else {
            FinderMode::Weight
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub snapshot: SnapshotConfig,
    pub search: SearchConfig,
}

impl Config {
    /// Checks values the finder cannot reject on its own.
    pub fn validate(&self) -> Result<(), Error> {
        if !(self.search.starting_amount > 0.0) {
            return Err(Error::ConfigLoadError(format!(
                "search.starting_amount must be positive, got {}",
                self.search.starting_amount
            )));
        }
        if self.search.max_results == Some(0) {
            return Err(Error::ConfigLoadError(
                "search.max_results must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Path of the configuration file when none is given on the command line.
pub fn default_config_path() -> Result<PathBuf, Error> {
    let base_path = env::current_dir().map_err(|e| {
        Error::ConfigLoadError(format!("Failed to determine current directory: {}", e))
    })?;

    Ok(base_path
        .join("crates")
        .join("executor")
        .join("Config.toml"))
}

/// Loads configuration from a file and environment variables.
///
/// Environment variables use the `SCANNER_` prefix and `__` between section and key,
/// e.g. `SCANNER_SEARCH__SOURCE=BTC`.
pub fn load_config(path: Option<&Path>) -> Result<Config, Error> {
    let config_file_path = match path {
        Some(path) => path.to_path_buf(),
        None => default_config_path()?,
    };

    if !config_file_path.exists() {
        return Err(Error::ConfigLoadError(format!(
            "Configuration file not found at calculated path: {}",
            config_file_path.display()
        )));
    }

    let s = ConfigLoader::builder()
        .add_source(File::from(config_file_path.as_path()).required(true))
        .add_source(
            Environment::with_prefix("SCANNER")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .map_err(|e| Error::ConfigLoadError(e.to_string()))?;

    let app_config: Config = s
        .try_deserialize()
        .map_err(|e| Error::ConfigLoadError(format!("Failed to deserialize config: {}", e)))?;

    app_config.validate()?;
    Ok(app_config)
}
