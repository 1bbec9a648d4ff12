//! # slacksoc
//!
//! A plugin-driven chat bot runtime for Slack-style messaging.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐  Event  ┌────────────┐      ┌──────────────────────────────┐
//! │  Runtime  │────────▶│ Dispatcher │─────▶│ handlers (per event kind)    │
//! │ (events)  │         │            │      │  message ▸ addressed ▸ match │
//! └───────────┘         └────────────┘      └──────────────────────────────┘
//!       │                     │                          │
//!       ▼                     ▼                          ▼
//!  StateStore            Directory                      Bot
//!  (debounced)        (users, channels)            (send, react, DM)
//! ```
//!
//! - **Runtime**: loads configuration, constructs plugins and runs the loop
//! - **Dispatcher**: runs every handler registered for an event kind
//! - **Handlers**: async functions wrapped in tower filter layers
//! - **Directory**: the cache of users and channels kept current by events
//! - **StateStore**: per-plugin JSON blobs written behind a debounce timer
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use slacksoc::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::new().file("slacksoc.yaml").load()?;
//!     let mut registry = PluginRegistry::new();
//!     slacksoc::plugins::register(&mut registry);
//!
//!     let runtime = Runtime::builder(config)
//!         .registry(registry)
//!         .bot(my_bot)
//!         .build()
//!         .await?;
//!     runtime.run(events).await;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `bundled-plugins`: the Respond, Debug, RealName and HotPotato plugins (default)
//! - `yaml-config`: YAML configuration files (default)
//! - `toml-config`: TOML configuration files
//! - `json-log`: JSON log output

pub use slacksoc_core as core;
pub use slacksoc_framework as framework;
#[cfg(feature = "bundled-plugins")]
pub use slacksoc_plugins as plugins;
pub use slacksoc_runtime as runtime;

/// Commonly used types for writing plugins and running a bot.
///
/// ```rust,ignore
/// use slacksoc::prelude::*;
/// ```
pub mod prelude {
    // Runtime
    pub use slacksoc_runtime::{ConfigLoader, Runtime, SlacksocConfig, wait_for_signal};

    // Plugin contract
    pub use slacksoc_framework::{Plugin, PluginError, PluginLoadContext, PluginRegistry};

    // Handler contexts
    pub use slacksoc_framework::{BotContext, CommandContext, EventContext, MessageContext};

    // Core types
    pub use slacksoc_core::markup::{mention_channel, mention_special, mention_user};
    pub use slacksoc_core::{Bot, BoxedBot, Channel, Event, Outgoing, User, kind};

    // Logging macros
    pub use slacksoc_runtime::prelude::*;
}
