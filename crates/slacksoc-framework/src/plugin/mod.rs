//! Plugin contract.
//!
//! A plugin is built once at startup by a constructor looked up in the
//! [`PluginRegistry`]. The constructor receives a [`PluginLoadContext`] with
//! the instance name, its raw configuration and mutable access to the
//! [`Dispatcher`] so it can register handlers. The returned [`Plugin`] value
//! only describes itself for the built-in `help` command.
//!
//! ```rust,ignore
//! struct Echo;
//!
//! impl Plugin for Echo {
//!     fn describe(&self) -> &str { "repeats what you say" }
//!     fn help(&self) -> &str { "echo <text> - replies with <text>" }
//! }
//!
//! fn load(ctx: &mut PluginLoadContext<'_>) -> Result<Box<dyn Plugin>, PluginError> {
//!     ctx.dispatcher().on_command("echo", |cmd: CommandContext| async move {
//!         cmd.reply(&cmd.args()[1..].join(" ")).await
//!     });
//!     Ok(Box::new(Echo))
//! }
//! ```

mod config;
mod registry;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::context::BotContext;
use crate::dispatcher::Dispatcher;
use crate::state::{StateError, StateStore};

pub use config::{PluginConfig, decode_config};
pub use registry::{PluginConstructor, PluginRegistry};

/// A loaded plugin instance.
pub trait Plugin: Send + Sync + 'static {
    /// One-line description shown by `help`.
    fn describe(&self) -> &str;

    /// Longer usage text shown by `help <instance>`.
    fn help(&self) -> &str;
}

/// What `help` knows about a loaded plugin instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginSummary {
    pub name: String,
    pub description: String,
    pub help: String,
}

impl PluginSummary {
    pub fn new(name: impl Into<String>, plugin: &dyn Plugin) -> Self {
        Self {
            name: name.into(),
            description: plugin.describe().to_string(),
            help: plugin.help().to_string(),
        }
    }
}

/// Errors raised while constructing a plugin. All of them abort startup.
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("unknown plugin '{0}'")]
    Unknown(String),

    #[error("missing required config key '{0}'")]
    MissingKey(String),

    #[error("unknown config keys: {}", .0.join(", "))]
    UnknownKeys(Vec<String>),

    #[error("invalid plugin config: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error(transparent)]
    State(#[from] StateError),

    #[error("{0}")]
    Custom(String),
}

impl PluginError {
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }
}

/// Everything a constructor gets to work with.
pub struct PluginLoadContext<'a> {
    name: &'a str,
    config: &'a PluginConfig,
    dispatcher: &'a mut Dispatcher,
    bot: &'a Arc<BotContext>,
}

impl<'a> PluginLoadContext<'a> {
    pub fn new(
        name: &'a str,
        config: &'a PluginConfig,
        dispatcher: &'a mut Dispatcher,
        bot: &'a Arc<BotContext>,
    ) -> Self {
        Self {
            name,
            config,
            dispatcher,
            bot,
        }
    }

    /// The instance name; also the key of this instance's persisted state.
    pub fn name(&self) -> &str {
        self.name
    }

    pub fn config(&self) -> &PluginConfig {
        self.config
    }

    /// Decodes the configuration section strictly. See [`decode_config`].
    pub fn decode<T>(&self, required: &[&str]) -> Result<T, PluginError>
    where
        T: DeserializeOwned,
    {
        decode_config(self.config, required)
    }

    pub fn dispatcher(&mut self) -> &mut Dispatcher {
        self.dispatcher
    }

    pub fn bot(&self) -> Arc<BotContext> {
        Arc::clone(self.bot)
    }

    pub fn state(&self) -> &StateStore {
        self.bot.state()
    }
}
