//! Runtime error types.

use thiserror::Error;

use slacksoc_framework::{PluginError, StateError};

use crate::config::ConfigError;

/// Errors that abort runtime startup.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// The configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The persisted state could not be loaded.
    #[error("Failed to load plugin state: {0}")]
    State(#[from] StateError),

    /// A plugin constructor failed.
    #[error("Failed to load plugin '{instance}': {source}")]
    Plugin {
        instance: String,
        #[source]
        source: PluginError,
    },

    /// No send primitive was supplied to the builder.
    #[error("No bot connection configured")]
    MissingBot,
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
