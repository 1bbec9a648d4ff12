//! # slacksoc framework
//!
//! Handler composition and the services handlers rely on:
//!
//! - **Contexts** ([`context`]): [`BotContext`], [`EventContext`] and the
//!   derived [`MessageContext`] / [`CommandContext`] views
//! - **Addressing** ([`addressing`]): decides whether a message is directed at
//!   the bot and computes the addressed text
//! - **Handlers** ([`handler`], [`routing`]): tower filter layers stacked over
//!   a [`HandlerService`], from raw events down to patterns and commands
//! - **Dispatcher** ([`dispatcher`]): event kind to ordered handler list
//! - **State** ([`state`]): the debounced, persisted plugin state store
//! - **Plugins** ([`plugin`]): the plugin contract, registry and strict config
//!   decoding

pub mod addressing;
pub mod command;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod plugin;
pub mod routing;
pub mod state;

pub use addressing::{AddressResolver, resolve_addressed};
pub use command::{SplitError, split};
pub use context::{BotContext, CommandContext, EventContext, MessageContext};
pub use dispatcher::{BoxedHandlerService, DispatchOutcome, Dispatcher};
pub use error::{BoxError, EventSkipped, is_skipped};
pub use handler::{Handler, HandlerService, IntoHandlerResult, ServiceBuilderExt};
pub use plugin::{
    Plugin, PluginConfig, PluginError, PluginLoadContext, PluginRegistry, PluginSummary,
    decode_config,
};
pub use state::{JsonFileBackend, MemoryBackend, StateBackend, StateError, StateStore, StateTable};
