//! Configuration loader using figment.
//!
//! # Configuration Priority (lowest to highest)
//!
//! 1. Built-in defaults
//! 2. Profile-specific config file (`slacksoc.{profile}.yaml`)
//! 3. Main config file (`slacksoc.yaml` / `slacksoc.yml`, or `slacksoc.toml`)
//! 4. Environment variables (`SLACKSOC_*`)
//!
//! # Feature Flags
//!
//! - `yaml-config` *(default)*: YAML files
//! - `toml-config`: TOML files
//!
//! # Environment Variable Mapping
//!
//! `__` separates nesting levels:
//!
//! - `SLACKSOC_TOKEN=xoxb-...` → `token`
//! - `SLACKSOC_STATE__SAVE_DELAY_SECS=10` → `state.save_delay_secs = 10`
//! - `SLACKSOC_LOGGING__LEVEL=debug` → `logging.level = "debug"`
//!
//! ```rust,ignore
//! let config = ConfigLoader::new()
//!     .file("./slacksoc.yaml")
//!     .profile("production")
//!     .load()?;
//! ```

use std::path::{Path, PathBuf};

use figment::Figment;
#[cfg(any(feature = "yaml-config", feature = "toml-config"))]
use figment::providers::Format;
#[cfg(feature = "toml-config")]
use figment::providers::Toml;
#[cfg(feature = "yaml-config")]
use figment::providers::Yaml;
use figment::providers::{Env, Serialized};
use tracing::{debug, info, trace, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::SlacksocConfig;
use super::validation::validate_config;

const ENV_PREFIX: &str = "SLACKSOC_";

/// Configuration profile for environment-specific settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Profile {
    #[default]
    Development,
    Production,
    Custom(String),
}

impl Profile {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Custom(name) => name,
        }
    }

    /// Reads `SLACKSOC_PROFILE`, defaulting to development.
    pub fn from_env() -> Self {
        std::env::var("SLACKSOC_PROFILE")
            .map(|p| Self::parse(&p))
            .unwrap_or_default()
    }

    fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "development" | "dev" => Self::Development,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Configuration loader with figment-based multi-source support.
pub struct ConfigLoader {
    figment: Figment,
    profile: Profile,
    search_paths: Vec<PathBuf>,
    load_env: bool,
    /// Specific config file to load (overrides search).
    config_file: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            figment: Figment::new(),
            profile: Profile::from_env(),
            search_paths: Vec::new(),
            load_env: true,
            config_file: None,
        }
    }

    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Profile::parse(&profile.into());
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    pub fn with_current_dir(self) -> Self {
        if let Ok(cwd) = std::env::current_dir() {
            self.search_path(cwd)
        } else {
            self
        }
    }

    /// Adds `<config dir>/slacksoc` to the search paths.
    pub fn with_user_config_dir(self) -> Self {
        if let Some(config_dir) = dirs::config_dir() {
            self.search_path(config_dir.join("slacksoc"))
        } else {
            self
        }
    }

    /// Loads exactly this file instead of searching.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Merges additional configuration programmatically, above the defaults.
    pub fn merge(mut self, config: SlacksocConfig) -> Self {
        self.figment = self.figment.merge(Serialized::defaults(config));
        self
    }

    /// Loads, extracts and validates the configuration.
    pub fn load(self) -> ConfigResult<SlacksocConfig> {
        let profile = self.profile.clone();
        let figment = self.build_figment()?;

        let config: SlacksocConfig = figment.extract().map_err(|e| {
            ConfigError::ParseError(format!("Failed to extract configuration: {e}"))
        })?;
        validate_config(&config)?;

        debug!(
            profile = %profile,
            plugins = config.plugins.len(),
            logging_level = %config.logging.level,
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    fn build_figment(mut self) -> ConfigResult<Figment> {
        let mut figment = Figment::from(Serialized::defaults(SlacksocConfig::default()));

        let user_figment = std::mem::take(&mut self.figment);
        figment = figment.merge(user_figment);

        if let Some(path) = self.config_file.take() {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path));
            }
            figment = self.merge_with_profile(figment, &path)?;
        } else {
            figment = self.load_config_files(figment)?;
        }

        if self.load_env {
            trace!(prefix = ENV_PREFIX, "Loading environment variables");
            figment = figment.merge(Env::prefixed(ENV_PREFIX).ignore(&["profile"]).split("__"));
        }

        Ok(figment)
    }

    /// Merges `path`, preceded by its profile variant when one exists.
    fn merge_with_profile(&self, mut figment: Figment, path: &Path) -> ConfigResult<Figment> {
        if let Some(profile_path) = self.profile_variant(path)
            && profile_path.exists()
        {
            debug!(path = %profile_path.display(), "Loading profile-specific config");
            figment = Self::merge_config_file(figment, &profile_path)?;
        }
        info!(path = %path.display(), "Loading configuration file");
        Self::merge_config_file(figment, path)
    }

    /// `dir/slacksoc.yaml` → `dir/slacksoc.{profile}.yaml`
    fn profile_variant(&self, path: &Path) -> Option<PathBuf> {
        let stem = path.file_stem()?.to_str()?;
        let ext = path.extension()?.to_str()?;
        Some(path.with_file_name(format!("{stem}.{}.{ext}", self.profile.as_str())))
    }

    /// Dispatches on file extension; only enabled formats are accepted.
    fn merge_config_file(figment: Figment, path: &Path) -> ConfigResult<Figment> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ext {
            #[cfg(feature = "toml-config")]
            "toml" => Ok(figment.merge(Toml::file(path))),
            #[cfg(feature = "yaml-config")]
            "yaml" | "yml" => Ok(figment.merge(Yaml::file(path))),
            _ => Err(ConfigError::ParseError(format!(
                "Unsupported or disabled configuration file format: .{ext}"
            ))),
        }
    }

    fn resolve_search_paths(&self) -> Vec<PathBuf> {
        if self.search_paths.is_empty() {
            let mut paths = Vec::new();
            if let Ok(cwd) = std::env::current_dir() {
                paths.push(cwd);
            }
            if let Some(config_dir) = dirs::config_dir() {
                paths.push(config_dir.join("slacksoc"));
            }
            paths
        } else {
            self.search_paths.clone()
        }
    }

    /// Returns the first base file found across `search_paths × base_names`.
    fn find_file(search_paths: &[PathBuf], base_names: &[&str]) -> Option<PathBuf> {
        search_paths
            .iter()
            .flat_map(|dir| base_names.iter().map(move |name| dir.join(name)))
            .find(|path| path.exists())
    }

    fn load_config_files(&self, figment: Figment) -> ConfigResult<Figment> {
        let search_paths = self.resolve_search_paths();
        match Self::find_file(&search_paths, &config_file_names()) {
            Some(path) => self.merge_with_profile(figment, &path),
            None => {
                warn!("No configuration file found, using defaults");
                Ok(figment)
            }
        }
    }
}

/// Base file names searched for, by enabled format.
fn config_file_names() -> Vec<&'static str> {
    #[allow(unused_mut)]
    let mut names = Vec::new();
    #[cfg(feature = "yaml-config")]
    names.extend(["slacksoc.yaml", "slacksoc.yml"]);
    #[cfg(feature = "toml-config")]
    names.push("slacksoc.toml");
    names
}

/// Loads configuration from the default locations.
pub fn load_config() -> ConfigResult<SlacksocConfig> {
    ConfigLoader::new().load()
}

/// Loads configuration from a specific file plus the environment.
pub fn load_config_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<SlacksocConfig> {
    ConfigLoader::new().file(path).load()
}
