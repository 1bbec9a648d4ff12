//! Filter predicates for the message layers.
//!
//! Each predicate narrows the request it receives and converts it into the
//! request the next layer expects. A mismatch rejects with [`EventSkipped`],
//! which the dispatcher treats as "not for this handler":
//!
//! | predicate | input | output |
//! |---|---|---|
//! | [`SubtypeFilter`] | `Arc<EventContext>` | [`MessageContext`] |
//! | [`AddressedFilter`] | [`MessageContext`] | [`MessageContext`] (addressed text) |
//! | [`PatternFilter`] | [`MessageContext`] | [`MessageContext`] (with captures) |
//! | [`CommandFilter`] | [`MessageContext`] | [`CommandContext`] |

use std::sync::Arc;

use regex::Regex;
use tower::BoxError;
use tower::filter::Predicate;
use tracing::trace;

use slacksoc_core::Event;

use crate::addressing::resolve_addressed;
use crate::command::split;
use crate::context::{CommandContext, EventContext, MessageContext};
use crate::error::EventSkipped;

fn skipped() -> BoxError {
    Box::new(EventSkipped)
}

/// Passes `message` events whose subtype equals the configured one.
///
/// The empty subtype selects normal user messages.
#[derive(Debug, Clone)]
pub struct SubtypeFilter {
    subtype: Arc<str>,
}

impl SubtypeFilter {
    pub fn new(subtype: impl Into<Arc<str>>) -> Self {
        Self {
            subtype: subtype.into(),
        }
    }
}

impl Predicate<Arc<EventContext>> for SubtypeFilter {
    type Request = MessageContext;

    fn check(&mut self, ctx: Arc<EventContext>) -> Result<MessageContext, BoxError> {
        let message = match ctx.event() {
            Event::Message(msg) if msg.subtype == *self.subtype => Arc::new(msg.clone()),
            _ => return Err(skipped()),
        };
        Ok(MessageContext::new(ctx, message))
    }
}

/// Passes messages addressed to the bot and replaces their text with the
/// addressed text.
#[derive(Debug, Clone, Copy, Default)]
pub struct AddressedFilter;

impl Predicate<MessageContext> for AddressedFilter {
    type Request = MessageContext;

    fn check(&mut self, msg: MessageContext) -> Result<MessageContext, BoxError> {
        let addressed =
            resolve_addressed(msg.bot().resolver(), msg.channel(), msg.text()).map(str::to_string);
        match addressed {
            Some(text) => Ok(msg.with_text(text)),
            None => Err(skipped()),
        }
    }
}

/// Passes messages whose whole text matches a regular expression.
#[derive(Debug, Clone)]
pub struct PatternFilter {
    regex: Regex,
}

impl PatternFilter {
    /// Compiles `pattern` anchored at both ends.
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(&format!("^(?:{pattern})$"))?,
        })
    }

    /// Uses a pre-compiled regex. A message passes only if the leftmost match
    /// covers the entire text.
    pub fn from_regex(regex: Regex) -> Self {
        Self { regex }
    }
}

impl Predicate<MessageContext> for PatternFilter {
    type Request = MessageContext;

    fn check(&mut self, msg: MessageContext) -> Result<MessageContext, BoxError> {
        let text = msg.text();
        let captures = match self.regex.captures(text) {
            Some(caps) if caps.get(0).is_some_and(|m| m.start() == 0 && m.end() == text.len()) => {
                caps.iter()
                    .map(|group| group.map(|m| m.as_str().to_string()))
                    .collect()
            }
            _ => return Err(skipped()),
        };
        Ok(msg.with_captures(captures))
    }
}

/// Passes messages that tokenize to a command named `name`.
///
/// Text that fails to tokenize, or is empty, is not a command.
#[derive(Debug, Clone)]
pub struct CommandFilter {
    name: Arc<str>,
}

impl CommandFilter {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self { name: name.into() }
    }
}

impl Predicate<MessageContext> for CommandFilter {
    type Request = CommandContext;

    fn check(&mut self, msg: MessageContext) -> Result<CommandContext, BoxError> {
        let args = match split(msg.text()) {
            Ok(args) => args,
            Err(e) => {
                trace!(error = %e, "Message is not a valid command line");
                return Err(skipped());
            }
        };
        if args.first().map(String::as_str) != Some(&*self.name) {
            return Err(skipped());
        }
        Ok(CommandContext::new(msg, args))
    }
}
