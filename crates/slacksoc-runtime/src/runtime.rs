//! The event loop.
//!
//! [`RuntimeBuilder::build`] performs every startup step that can fail:
//! loading the persisted state, registering the built-in handlers and
//! constructing each configured plugin in order. Any error there aborts
//! startup before a single event is read.
//!
//! [`Runtime::run`] then consumes the event stream on a single task,
//! dispatching one event at a time until the stream ends or the shutdown
//! token fires, and finally flushes pending state.
//!
//! ```rust,ignore
//! let runtime = Runtime::builder(config)
//!     .bot(bot)
//!     .registry(registry)
//!     .build()
//!     .await?;
//!
//! let token = runtime.shutdown_token();
//! tokio::spawn(async move {
//!     wait_for_signal().await;
//!     token.cancel();
//! });
//!
//! runtime.run(events).await;
//! ```

use std::sync::Arc;

use futures::{Stream, StreamExt};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use slacksoc_core::{BoxedBot, Directory, Event};
use slacksoc_framework::{
    BotContext, DispatchOutcome, Dispatcher, EventContext, JsonFileBackend, Plugin,
    PluginLoadContext, PluginRegistry, PluginSummary, StateBackend, StateStore,
};

use crate::builtin;
use crate::config::{SlacksocConfig, validate_config};
use crate::error::{RuntimeError, RuntimeResult};

/// A fully started bot: handlers registered, plugins loaded, state open.
pub struct Runtime {
    config: SlacksocConfig,
    dispatcher: Dispatcher,
    context: Arc<BotContext>,
    plugins: Vec<(String, Box<dyn Plugin>)>,
    shutdown: CancellationToken,
}

impl Runtime {
    pub fn builder(config: SlacksocConfig) -> RuntimeBuilder {
        RuntimeBuilder::new(config)
    }

    pub fn config(&self) -> &SlacksocConfig {
        &self.config
    }

    pub fn context(&self) -> &Arc<BotContext> {
        &self.context
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Loaded plugin instance names, in load order.
    pub fn plugin_names(&self) -> impl Iterator<Item = &str> {
        self.plugins.iter().map(|(name, _)| name.as_str())
    }

    /// Cancelling this token makes [`run`](Self::run) stop after the event
    /// currently being dispatched.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Dispatches a single event.
    pub async fn dispatch(&self, event: Event) -> DispatchOutcome {
        let ctx = Arc::new(EventContext::new(event, Arc::clone(&self.context)));
        self.dispatcher.dispatch(ctx).await
    }

    /// Consumes `events` until it ends or shutdown is requested, then flushes
    /// pending state and stops the state actor.
    pub async fn run<S>(&self, events: S)
    where
        S: Stream<Item = Event>,
    {
        futures::pin_mut!(events);
        info!(plugins = self.plugins.len(), "Runtime is now running");

        let mut dispatched = 0u64;
        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    info!("Shutdown requested");
                    break;
                }
                next = events.next() => match next {
                    Some(event) => {
                        debug!(kind = %event.kind(), "Handling event");
                        self.dispatch(event).await;
                        dispatched += 1;
                    }
                    None => {
                        info!("Event stream closed");
                        break;
                    }
                },
            }
        }

        self.context.state().shutdown().await;
        info!(events = dispatched, "Runtime stopped");
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("dispatcher", &self.dispatcher)
            .field("plugins", &self.plugin_names().collect::<Vec<_>>())
            .finish()
    }
}

/// Waits for Ctrl+C, or SIGTERM on unix.
pub async fn wait_for_signal() {
    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = signal::ctrl_c() => {
                        info!("Received Ctrl+C, shutting down");
                    }
                    _ = sigterm.recv() => {
                        info!("Received SIGTERM, shutting down");
                    }
                }
                return;
            }
            Err(e) => warn!(error = %e, "Failed to register SIGTERM handler"),
        }
    }

    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => warn!(error = %e, "Failed to listen for Ctrl+C"),
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for a [`Runtime`].
///
/// The bot send primitive is required. The plugin registry defaults to an
/// empty one and the state backend to a JSON file at `state.file`.
pub struct RuntimeBuilder {
    config: SlacksocConfig,
    registry: PluginRegistry,
    bot: Option<BoxedBot>,
    backend: Option<Arc<dyn StateBackend>>,
}

impl RuntimeBuilder {
    pub fn new(config: SlacksocConfig) -> Self {
        Self {
            config,
            registry: PluginRegistry::new(),
            bot: None,
            backend: None,
        }
    }

    /// Plugin constructors available to the `plugins` config list.
    pub fn registry(mut self, registry: PluginRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn bot(mut self, bot: BoxedBot) -> Self {
        self.bot = Some(bot);
        self
    }

    /// Overrides where plugin state is persisted.
    pub fn backend(mut self, backend: Arc<dyn StateBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Opens the state store, registers the built-in handlers and loads every
    /// configured plugin in order.
    pub async fn build(self) -> RuntimeResult<Runtime> {
        let Self {
            config,
            registry,
            bot,
            backend,
        } = self;

        validate_config(&config)?;
        let bot = bot.ok_or(RuntimeError::MissingBot)?;

        let backend = backend.unwrap_or_else(|| {
            Arc::new(JsonFileBackend::new(config.state.file.clone())) as Arc<dyn StateBackend>
        });
        let state = StateStore::open(backend, config.state.save_delay()).await?;
        let context = Arc::new(BotContext::new(bot, Arc::new(Directory::new()), state));

        let mut dispatcher = Dispatcher::new();
        builtin::register(&mut dispatcher);

        let plugins = match load_plugins(&config, &registry, &mut dispatcher, &context) {
            Ok(plugins) => plugins,
            Err(e) => {
                context.state().shutdown().await;
                return Err(e);
            }
        };

        let catalog = plugins
            .iter()
            .map(|(name, plugin)| PluginSummary::new(name.clone(), plugin.as_ref()))
            .collect();
        context.set_catalog(catalog);

        info!(
            plugins = plugins.len(),
            registered = ?registry.names().collect::<Vec<_>>(),
            "Runtime initialized"
        );

        Ok(Runtime {
            config,
            dispatcher,
            context,
            plugins,
            shutdown: CancellationToken::new(),
        })
    }
}

fn load_plugins(
    config: &SlacksocConfig,
    registry: &PluginRegistry,
    dispatcher: &mut Dispatcher,
    context: &Arc<BotContext>,
) -> RuntimeResult<Vec<(String, Box<dyn Plugin>)>> {
    let mut plugins = Vec::with_capacity(config.plugins.len());

    for entry in &config.plugins {
        let instance = entry.instance_name();
        let mut ctx = PluginLoadContext::new(instance, &entry.config, dispatcher, context);
        let plugin = registry
            .construct(&entry.name, &mut ctx)
            .map_err(|source| RuntimeError::Plugin {
                instance: instance.to_string(),
                source,
            })?;

        info!(plugin = %entry.name, instance, "Plugin loaded");
        plugins.push((instance.to_string(), plugin));
    }

    Ok(plugins)
}
