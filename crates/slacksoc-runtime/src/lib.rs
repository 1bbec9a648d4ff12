//! slacksoc runtime - wires configuration, logging, plugins and the event loop.
//!
//! This crate provides:
//! - Layered configuration loading (`ConfigLoader`, figment based)
//! - Logging setup driven by the `logging` config section
//! - The built-in directory handlers and `help` command
//! - The event loop (`Runtime`) with graceful shutdown
//!
//! ```ignore
//! use slacksoc_runtime::{ConfigLoader, Runtime};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::new().file("slacksoc.yaml").load()?;
//!     slacksoc_runtime::logging::init_from_config(&config.logging);
//!
//!     let runtime = Runtime::builder(config)
//!         .bot(my_bot)
//!         .registry(my_plugins)
//!         .build()
//!         .await?;
//!     runtime.run(events).await;
//!     Ok(())
//! }
//! ```

pub mod builtin;
pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

pub use config::{
    ConfigError, ConfigLoader, ConfigResult, LogFormat, LogLevel, LogOutput, LoggingConfig,
    PluginEntry, Profile, SlacksocConfig, SpanEventConfig, StateConfig,
};
pub use error::{RuntimeError, RuntimeResult};
pub use runtime::{Runtime, RuntimeBuilder, wait_for_signal};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Logging macros for plugin code.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
