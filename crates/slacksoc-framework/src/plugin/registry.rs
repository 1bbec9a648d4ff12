//! Explicit name to constructor table, consulted once at startup.

use std::collections::BTreeMap;
use std::fmt;

use super::{Plugin, PluginError, PluginLoadContext};

/// Builds a plugin instance and registers its handlers.
pub type PluginConstructor =
    Box<dyn Fn(&mut PluginLoadContext<'_>) -> Result<Box<dyn Plugin>, PluginError> + Send + Sync>;

/// Plugin constructors keyed by the name used in configuration.
///
/// ```rust,ignore
/// let mut registry = PluginRegistry::new();
/// registry.register("Respond", Respond::load);
/// let runtime = Runtime::builder(config).registry(registry).build().await?;
/// ```
#[derive(Default)]
pub struct PluginRegistry {
    constructors: BTreeMap<String, PluginConstructor>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `constructor` under `name`, replacing any earlier entry.
    pub fn register<F>(&mut self, name: impl Into<String>, constructor: F) -> &mut Self
    where
        F: Fn(&mut PluginLoadContext<'_>) -> Result<Box<dyn Plugin>, PluginError>
            + Send
            + Sync
            + 'static,
    {
        self.constructors.insert(name.into(), Box::new(constructor));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }

    /// Runs the constructor registered as `name`.
    pub fn construct(
        &self,
        name: &str,
        ctx: &mut PluginLoadContext<'_>,
    ) -> Result<Box<dyn Plugin>, PluginError> {
        let constructor = self
            .constructors
            .get(name)
            .ok_or_else(|| PluginError::Unknown(name.to_string()))?;
        constructor(ctx)
    }
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("plugins", &self.constructors.keys().collect::<Vec<_>>())
            .finish()
    }
}
