//! Plugins bundled with slacksoc.
//!
//! | name | what it does |
//! |---|---|
//! | `Respond` | answers configured trigger messages with a random reply |
//! | `Debug` | addressed `users`, `channels`, `metadata`, `debug` and `info` |
//! | `RealName` | nags people joining a channel without a real name |
//! | `HotPotato` | a game of passing the potato before your timer runs out |
//!
//! ```rust,ignore
//! let mut registry = PluginRegistry::new();
//! slacksoc_plugins::register(&mut registry);
//! ```

pub mod debug;
pub mod potato;
pub mod real_name;
pub mod respond;

#[cfg(test)]
mod testing;

use slacksoc_framework::PluginRegistry;

pub use debug::DebugCommands;
pub use potato::HotPotato;
pub use real_name::RealName;
pub use respond::Respond;

/// Registers every bundled plugin under its config name.
pub fn register(registry: &mut PluginRegistry) -> &mut PluginRegistry {
    registry
        .register("Respond", Respond::load)
        .register("Debug", DebugCommands::load)
        .register("RealName", RealName::load)
        .register("HotPotato", HotPotato::load)
}
