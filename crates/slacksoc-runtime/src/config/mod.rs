//! Configuration module for the slacksoc runtime.
//!
//! Layered loading (defaults, files, environment) and validation of the bot
//! configuration: state file, logging and the ordered plugin list.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    LogFormat, LogLevel, LogOutput, LoggingConfig, PluginEntry, SlacksocConfig, SpanEventConfig,
    StateConfig,
};
pub use validation::validate_config;
