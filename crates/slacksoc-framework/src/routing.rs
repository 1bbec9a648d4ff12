//! Pre-stacked [`ServiceBuilder`]s for the message layers.
//!
//! Each layer only narrows the one before it:
//!
//! ```text
//! event ⊃ message(subtype) ⊃ addressed ⊃ matching / command
//! ```
//!
//! The [`Dispatcher`](crate::Dispatcher) registration methods are thin
//! wrappers over these; use them directly to stack additional tower layers.
//!
//! ```rust,ignore
//! use slacksoc_framework::{routing, ServiceBuilderExt};
//!
//! let svc = routing::addressed_matching("^ping$")?
//!     .handler(|msg: MessageContext| async move { msg.reply("pong").await });
//! dispatcher.register(kind::MESSAGE, svc);
//! ```

use regex::Regex;
use tower::ServiceBuilder;
use tower::filter::FilterLayer;
use tower_layer::{Identity, Stack};

use crate::handler::{AddressedFilter, CommandFilter, PatternFilter, SubtypeFilter};

/// Builder returned by [`message`].
pub type MessageBuilder = ServiceBuilder<Stack<FilterLayer<SubtypeFilter>, Identity>>;

/// Layers of [`addressed`]: subtype `""` then the addressing filter.
pub type AddressedLayers =
    Stack<FilterLayer<AddressedFilter>, Stack<FilterLayer<SubtypeFilter>, Identity>>;

/// Builder returned by [`addressed`].
pub type AddressedBuilder = ServiceBuilder<AddressedLayers>;

/// Builder returned by [`matching`].
pub type MatchBuilder = ServiceBuilder<
    Stack<FilterLayer<PatternFilter>, Stack<FilterLayer<SubtypeFilter>, Identity>>,
>;

/// Builder returned by [`addressed_matching`].
pub type AddressedMatchBuilder = ServiceBuilder<Stack<FilterLayer<PatternFilter>, AddressedLayers>>;

/// Builder returned by [`command`].
pub type CommandBuilder = ServiceBuilder<Stack<FilterLayer<CommandFilter>, AddressedLayers>>;

/// `message` events with the given subtype (`""` for normal messages).
pub fn message(subtype: &str) -> MessageBuilder {
    ServiceBuilder::new().filter(SubtypeFilter::new(subtype))
}

/// Normal messages addressed to the bot, carrying the addressed text.
pub fn addressed() -> AddressedBuilder {
    message("").filter(AddressedFilter)
}

/// Normal messages whose whole text matches `pattern`.
pub fn matching(pattern: &str) -> Result<MatchBuilder, regex::Error> {
    Ok(matching_filter(PatternFilter::new(pattern)?))
}

pub fn matching_regex(regex: Regex) -> MatchBuilder {
    matching_filter(PatternFilter::from_regex(regex))
}

fn matching_filter(filter: PatternFilter) -> MatchBuilder {
    message("").filter(filter)
}

/// Addressed messages whose whole addressed text matches `pattern`.
pub fn addressed_matching(pattern: &str) -> Result<AddressedMatchBuilder, regex::Error> {
    Ok(addressed().filter(PatternFilter::new(pattern)?))
}

pub fn addressed_matching_regex(regex: Regex) -> AddressedMatchBuilder {
    addressed().filter(PatternFilter::from_regex(regex))
}

/// Addressed messages that tokenize to the command `name`.
pub fn command(name: &str) -> CommandBuilder {
    addressed().filter(CommandFilter::new(name))
}
