//! Contexts handed to handlers.
//!
//! - [`BotContext`] lives for the whole process: the send primitive, the
//!   directory, the state store and everything learned from the handshake.
//! - [`EventContext`] wraps one inbound event. It is never mutated.
//! - [`MessageContext`] is a view of a `message` event produced by the message
//!   layers. Its [`text`](MessageContext::text) is the addressed text once the
//!   addressing layer has run, while [`message`](MessageContext::message) still
//!   returns the original payload.
//! - [`CommandContext`] adds the tokenized arguments of a command.

use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;

use slacksoc_core::markup::is_direct;
use slacksoc_core::{ApiResult, BoxedBot, Directory, Event, Identity, MessageEvent, Team};

use crate::addressing::AddressResolver;
use crate::plugin::PluginSummary;
use crate::state::StateStore;

/// Process-wide state shared by every handler.
pub struct BotContext {
    bot: BoxedBot,
    directory: Arc<Directory>,
    state: StateStore,
    resolver: OnceLock<AddressResolver>,
    team: RwLock<Team>,
    catalog: OnceLock<Vec<PluginSummary>>,
}

impl BotContext {
    pub fn new(bot: BoxedBot, directory: Arc<Directory>, state: StateStore) -> Self {
        Self {
            bot,
            directory,
            state,
            resolver: OnceLock::new(),
            team: RwLock::new(Team::default()),
            catalog: OnceLock::new(),
        }
    }

    pub fn bot(&self) -> &BoxedBot {
        &self.bot
    }

    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    pub fn state(&self) -> &StateStore {
        &self.state
    }

    /// Records the bot identity and builds the addressing matcher.
    ///
    /// Only the first call has an effect; the identity is fixed for the
    /// lifetime of the process. Returns `true` if this call set it.
    pub fn set_identity(&self, identity: Identity) -> Result<bool, regex::Error> {
        if self.resolver.get().is_some() {
            return Ok(false);
        }
        let resolver = AddressResolver::new(identity)?;
        Ok(self.resolver.set(resolver).is_ok())
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.resolver.get().map(AddressResolver::identity)
    }

    pub fn resolver(&self) -> Option<&AddressResolver> {
        self.resolver.get()
    }

    pub fn set_team(&self, team: Team) {
        *self.team.write() = team;
    }

    pub fn team(&self) -> Team {
        self.team.read().clone()
    }

    /// Publishes the loaded plugins for the `help` command.
    pub fn set_catalog(&self, catalog: Vec<PluginSummary>) {
        let _ = self.catalog.set(catalog);
    }

    pub fn catalog(&self) -> &[PluginSummary] {
        self.catalog.get().map(Vec::as_slice).unwrap_or_default()
    }

    pub async fn send(&self, channel: &str, text: &str) -> ApiResult<()> {
        self.bot.send(channel, text).await
    }

    pub async fn direct_message(&self, user: &str, text: &str) -> ApiResult<()> {
        self.bot.direct_message(user, text).await
    }
}

impl std::fmt::Debug for BotContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotContext")
            .field("identity", &self.identity())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// One inbound event on its way through the handler chain.
#[derive(Debug, Clone)]
pub struct EventContext {
    event: Event,
    bot: Arc<BotContext>,
}

impl EventContext {
    pub fn new(event: Event, bot: Arc<BotContext>) -> Self {
        Self { event, bot }
    }

    pub fn event(&self) -> &Event {
        &self.event
    }

    pub fn kind(&self) -> &str {
        self.event.kind()
    }

    pub fn bot(&self) -> &Arc<BotContext> {
        &self.bot
    }
}

/// View of a `message` event.
#[derive(Debug, Clone)]
pub struct MessageContext {
    event: Arc<EventContext>,
    message: Arc<MessageEvent>,
    text: String,
    captures: Vec<Option<String>>,
}

impl MessageContext {
    pub fn new(event: Arc<EventContext>, message: Arc<MessageEvent>) -> Self {
        let text = message.text.clone();
        Self {
            event,
            message,
            text,
            captures: Vec::new(),
        }
    }

    /// Returns a view with different effective text. The event is untouched.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub(crate) fn with_captures(mut self, captures: Vec<Option<String>>) -> Self {
        self.captures = captures;
        self
    }

    /// The original message payload.
    pub fn message(&self) -> &MessageEvent {
        &self.message
    }

    /// The effective text: the whole message, or the addressed text after
    /// the addressing layer.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn channel(&self) -> &str {
        &self.message.channel
    }

    pub fn user(&self) -> &str {
        &self.message.user
    }

    pub fn is_direct(&self) -> bool {
        is_direct(&self.message.channel)
    }

    /// Capture group `index` of the pattern that matched this message.
    ///
    /// Group 0 is the whole match. Empty unless a pattern layer ran.
    pub fn capture(&self, index: usize) -> Option<&str> {
        self.captures.get(index)?.as_deref()
    }

    pub fn event(&self) -> &Arc<EventContext> {
        &self.event
    }

    pub fn bot(&self) -> &Arc<BotContext> {
        self.event.bot()
    }

    /// Posts `text` in the channel this message came from.
    pub async fn reply(&self, text: &str) -> ApiResult<()> {
        self.bot().send(&self.message.channel, text).await
    }

    /// Reacts to this message with `reaction`.
    pub async fn react(&self, reaction: &str) -> ApiResult<()> {
        self.bot()
            .bot()
            .react(&self.message.channel, &self.message.ts, reaction)
            .await
    }
}

/// A message that parsed as a command.
#[derive(Debug, Clone)]
pub struct CommandContext {
    message: MessageContext,
    args: Vec<String>,
}

impl CommandContext {
    pub fn new(message: MessageContext, args: Vec<String>) -> Self {
        Self { message, args }
    }

    /// All tokens, the command name included.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }

    pub fn message(&self) -> &MessageContext {
        &self.message
    }

    pub fn bot(&self) -> &Arc<BotContext> {
        self.message.bot()
    }

    pub async fn reply(&self, text: &str) -> ApiResult<()> {
        self.message.reply(text).await
    }
}
