//! Configuration File Loading
//!
//! Handles loading and saving configuration files from various locations
//! with support for multiple formats and fallback to defaults.

use super::Config;
use crate::error::{Error, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit configuration file
pub const CONFIG_ENV_VAR: &str = "SCANPANE_CONFIG";

/// Configuration file loader
pub struct ConfigLoader {
    /// Search paths for configuration files (without extension)
    search_paths: Vec<PathBuf>,
    /// Supported configuration file formats
    supported_formats: Vec<ConfigFormat>,
    /// Current configuration file path (if loaded)
    current_path: Option<PathBuf>,
    /// File named by the user, tried as given before the search paths
    explicit_path: Option<PathBuf>,
}

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

    /// Format implied by a file extension; TOML when unknown
    fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => ConfigFormat::Json,
            _ => ConfigFormat::Toml,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Whether to fall back to the default config if none exists
    pub create_default: bool,
    /// Whether to validate configuration after loading
    pub validate: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            create_default: true,
            validate: true,
        }
    }
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        let explicit = env::var_os(CONFIG_ENV_VAR).map(PathBuf::from);
        let loader = Self::with_search_paths(Self::get_search_paths());
        match explicit {
            Some(path) => loader.with_explicit_path(path),
            None => loader,
        }
    }

    /// Create a loader searching only `search_paths`
    pub fn with_search_paths(search_paths: Vec<PathBuf>) -> Self {
        Self {
            search_paths,
            supported_formats: vec![ConfigFormat::Toml, ConfigFormat::Json],
            current_path: None,
            explicit_path: None,
        }
    }

    /// Try `path` first, exactly as given; its extension selects the format
    pub fn with_explicit_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.explicit_path = Some(path.into());
        self
    }

    /// Load configuration with default options
    pub fn load() -> Result<Config> {
        Self::new().load_with_options(LoadOptions::default())
    }

    /// Load configuration with custom options
    pub fn load_with_options(&mut self, options: LoadOptions) -> Result<Config> {
        if let Some((path, config)) = self.find_and_load_config()? {
            debug!("Loaded configuration from {}", path.display());
            self.current_path = Some(path);

            if options.validate {
                validate_config(&config)?;
            }
            return Ok(config);
        }

        if options.create_default {
            let config = Config::default();
            if options.validate {
                validate_config(&config)?;
            }
            Ok(config)
        } else {
            Err(Error::ConfigNotFound)
        }
    }

    /// Load one specific file; its extension selects the format
    pub fn load_from_path(path: &Path) -> Result<Config> {
        let config = load_config_file(path, ConfigFormat::from_path(path))?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Path the last configuration was loaded from
    pub fn current_path(&self) -> Option<&Path> {
        self.current_path.as_deref()
    }

    /// Save configuration to the current path or default location
    pub fn save(&self, config: &Config) -> Result<PathBuf> {
        let path = self
            .current_path
            .clone()
            .unwrap_or_else(Self::get_default_config_path);
        self.save_to_path(config, &path)?;
        Ok(path)
    }

    /// Save configuration to a specific path
    pub fn save_to_path(&self, config: &Config, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::ConfigSaveFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        }

        let format = ConfigFormat::from_path(path);
        let content = match format {
            ConfigFormat::Json => serde_json::to_string_pretty(config).map_err(|e| {
                Error::ConfigSerializationFailed {
                    format: format.name().to_string(),
                    reason: e.to_string(),
                }
            })?,
            ConfigFormat::Toml => {
                toml::to_string_pretty(config).map_err(|e| Error::ConfigSerializationFailed {
                    format: format.name().to_string(),
                    reason: e.to_string(),
                })?
            }
        };

        fs::write(path, content).map_err(|e| Error::ConfigSaveFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Find and load configuration from search paths
    fn find_and_load_config(&self) -> Result<Option<(PathBuf, Config)>> {
        if let Some(explicit) = &self.explicit_path {
            if explicit.is_file() {
                match load_config_file(explicit, ConfigFormat::from_path(explicit)) {
                    Ok(config) => return Ok(Some((explicit.clone(), config))),
                    Err(e) => warn!(
                        "Failed to load config from {}: {}",
                        explicit.display(),
                        e
                    ),
                }
            } else {
                warn!("Config path {} is not a file", explicit.display());
            }
        }

        for path in &self.search_paths {
            for format in &self.supported_formats {
                let config_path = path.with_extension(format.extension());

                if config_path.exists() {
                    match load_config_file(&config_path, *format) {
                        Ok(config) => return Ok(Some((config_path, config))),
                        Err(e) => {
                            // Keep searching, a broken file should not block startup
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

        Ok(None)
    }

    /// Get default search paths for configuration files
    fn get_search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Ok(cwd) = env::current_dir() {
            paths.push(cwd.join("scanpane"));
        }

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("scanpane").join("config"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".scanpane"));
        }

        paths
    }

    /// Get the default configuration path
    fn get_default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("scanpane")
            .join("config.toml")
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Load a specific configuration file
fn load_config_file(path: &Path, format: ConfigFormat) -> Result<Config> {
    let content = fs::read_to_string(path).map_err(|e| Error::ConfigLoadFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    match format {
        ConfigFormat::Toml => toml::from_str(&content).map_err(|e| Error::ConfigParseFailed {
            format: format.name().to_string(),
            reason: e.to_string(),
        }),
        ConfigFormat::Json => serde_json::from_str(&content).map_err(|e| Error::ConfigParseFailed {
            format: format.name().to_string(),
            reason: e.to_string(),
        }),
    }
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.runner.channel_capacity == 0 {
        return Err(Error::ConfigValidationFailed {
            field: "runner.channel_capacity".to_string(),
            reason: "Channel capacity must be greater than 0".to_string(),
        });
    }

    if config.template.temp_suffix.trim().is_empty() {
        return Err(Error::ConfigValidationFailed {
            field: "template.temp_suffix".to_string(),
            reason: "Temporary file suffix cannot be empty".to_string(),
        });
    }

    if config
        .template
        .temp_prefix
        .contains(std::path::MAIN_SEPARATOR)
    {
        return Err(Error::ConfigValidationFailed {
            field: "template.temp_prefix".to_string(),
            reason: "Temporary file prefix cannot contain a path separator".to_string(),
        });
    }

    if config.tool.default_path.as_os_str().is_empty() {
        return Err(Error::ConfigValidationFailed {
            field: "tool.default_path".to_string(),
            reason: "Tool path cannot be empty".to_string(),
        });
    }

    Ok(())
}
