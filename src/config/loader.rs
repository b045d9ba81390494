//! Configuration File Loading
//!
//! Looks for an optional configuration file in the usual locations and
//! falls back to the built-in defaults when none exists.

use super::Config;
use crate::error::{Error, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Directory and file stem used in the search paths
const APP_DIR: &str = "rm01-switcher";

/// Environment variable naming an explicit configuration file
pub const CONFIG_ENV_VAR: &str = "RM01_SWITCHER_CONFIG";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigFormat {
    /// TOML format
    Toml,
    /// JSON format
    Json,
}

impl ConfigFormat {
    fn extension(self) -> &'static str {
        match self {
            ConfigFormat::Toml => "toml",
            ConfigFormat::Json => "json",
        }
    }

    fn name(self) -> &'static str {
        match self {
            ConfigFormat::Toml => "TOML",
            ConfigFormat::Json => "JSON",
        }
    }

    /// Format implied by a file extension, TOML unless it says json
    fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => ConfigFormat::Json,
            _ => ConfigFormat::Toml,
        }
    }
}

/// Configuration file loader
pub struct ConfigLoader {
    /// Search paths for configuration files, without extension
    search_paths: Vec<PathBuf>,
    /// Supported configuration file formats, in lookup order
    supported_formats: Vec<ConfigFormat>,
}

impl ConfigLoader {
    /// Create a loader over the default search paths
    pub fn new() -> Self {
        Self::with_search_paths(Self::get_search_paths())
    }

    /// Create a loader over custom search paths
    pub fn with_search_paths(search_paths: Vec<PathBuf>) -> Self {
        Self {
            search_paths,
            supported_formats: vec![ConfigFormat::Toml, ConfigFormat::Json],
        }
    }

    /// Resolve the configuration for this run.
    ///
    /// An explicit path (argument or [`CONFIG_ENV_VAR`]) must exist and load
    /// cleanly. Otherwise the search paths are tried in order and the
    /// defaults are used when nothing is found. Returns the path the
    /// configuration came from, if any.
    pub fn load(&self, explicit: Option<&Path>) -> Result<(Config, Option<PathBuf>)> {
        let explicit = explicit
            .map(Path::to_path_buf)
            .or_else(|| env::var_os(CONFIG_ENV_VAR).map(PathBuf::from));

        if let Some(path) = explicit {
            if !path.exists() {
                return Err(Error::ConfigLoadFailed {
                    path,
                    reason: "Configuration file does not exist".to_string(),
                });
            }
            let config = Self::load_file(&path)?;
            return Ok((config, Some(path)));
        }

        match self.find_and_load_config() {
            Some((path, config)) => Ok((config, Some(path))),
            None => {
                debug!("No configuration file found, using defaults");
                Ok((Config::default(), None))
            }
        }
    }

    /// Load and validate a specific configuration file
    pub fn load_file(path: &Path) -> Result<Config> {
        let format = ConfigFormat::from_path(path);
        let content = fs::read_to_string(path).map_err(|e| Error::ConfigLoadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Config = match format {
            ConfigFormat::Toml => toml::from_str(&content).map_err(|e| Error::ConfigParseFailed {
                format: format.name().to_string(),
                reason: e.to_string(),
            })?,
            ConfigFormat::Json => {
                serde_json::from_str(&content).map_err(|e| Error::ConfigParseFailed {
                    format: format.name().to_string(),
                    reason: e.to_string(),
                })?
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Find and load configuration from search paths
    fn find_and_load_config(&self) -> Option<(PathBuf, Config)> {
        for path in &self.search_paths {
            for format in &self.supported_formats {
                let config_path = path.with_extension(format.extension());

                if config_path.exists() {
                    match Self::load_file(&config_path) {
                        Ok(config) => return Some((config_path, config)),
                        Err(e) => {
                            warn!(
                                "Failed to load config from {}: {}",
                                config_path.display(),
                                e
                            );
                            continue;
                        }
                    }
                }
            }
        }

        None
    }

    /// Get default search paths for configuration files
    fn get_search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Ok(xdg_config) = env::var("XDG_CONFIG_HOME") {
            paths.push(PathBuf::from(xdg_config).join(APP_DIR).join("config"));
        }

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join(APP_DIR).join("config"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(format!(".{}", APP_DIR)).join("config"));
        }

        paths
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
