//! Event dispatcher.
//!
//! The [`Dispatcher`] owns a table from event kind to an ordered list of
//! handler services. For every inbound event it runs the handlers registered
//! for that kind, one after another, in registration order:
//!
//! 1. A handler that succeeds counts as handled
//! 2. A filter rejection ([`EventSkipped`](crate::EventSkipped)) is silent
//! 3. Any other error is logged and delivery continues with the next handler
//!
//! ```rust,ignore
//! let mut dispatcher = Dispatcher::new();
//! dispatcher.on_addressed_match("^ping$", |msg: MessageContext| async move {
//!     msg.reply("pong").await
//! })?;
//! dispatcher.on_event(kind::TEAM_JOIN, |ctx: Arc<EventContext>| async move {
//!     tracing::info!("someone joined");
//! });
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use regex::Regex;
use tower::util::BoxCloneSyncService;
use tower::{BoxError, Service, ServiceExt};
use tracing::{Instrument, debug_span, error, trace};

use slacksoc_core::kind;

use crate::context::{CommandContext, EventContext, MessageContext};
use crate::error::is_skipped;
use crate::handler::{Handler, HandlerService, ServiceBuilderExt};
use crate::routing;

/// Type-erased handler service stored in the dispatch table.
pub type BoxedHandlerService = BoxCloneSyncService<Arc<EventContext>, (), BoxError>;

/// What happened to one dispatched event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Handlers that ran and succeeded.
    pub handled: usize,
    /// Handlers whose filters rejected the event.
    pub skipped: usize,
    /// Handlers that returned an error.
    pub failed: usize,
}

/// Event kind to ordered handler list.
#[derive(Default, Clone)]
pub struct Dispatcher {
    handlers: HashMap<String, Vec<BoxedHandlerService>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `service` to the handlers of `kind`.
    pub fn register<S>(&mut self, kind: impl Into<String>, service: S) -> &mut Self
    where
        S: Service<Arc<EventContext>, Response = (), Error = BoxError>
            + Clone
            + Send
            + Sync
            + 'static,
        S::Future: Send + 'static,
    {
        self.handlers
            .entry(kind.into())
            .or_default()
            .push(BoxCloneSyncService::new(service));
        self
    }

    /// Runs `handler` for every event of `kind`.
    pub fn on_event<H>(&mut self, kind: impl Into<String>, handler: H) -> &mut Self
    where
        H: Handler<Arc<EventContext>>,
    {
        self.register(kind, HandlerService::new(handler))
    }

    /// Runs `handler` for every message with the given subtype.
    ///
    /// Use `""` for normal user messages.
    pub fn on_message<H>(&mut self, subtype: &str, handler: H) -> &mut Self
    where
        H: Handler<MessageContext>,
    {
        self.register(kind::MESSAGE, routing::message(subtype).handler(handler))
    }

    /// Runs `handler` for normal messages addressed to the bot.
    ///
    /// [`MessageContext::text`] is the addressed text.
    pub fn on_addressed<H>(&mut self, handler: H) -> &mut Self
    where
        H: Handler<MessageContext>,
    {
        self.register(kind::MESSAGE, routing::addressed().handler(handler))
    }

    /// Runs `handler` for normal messages whose entire text matches `pattern`.
    pub fn on_match<H>(&mut self, pattern: &str, handler: H) -> Result<&mut Self, regex::Error>
    where
        H: Handler<MessageContext>,
    {
        let svc = routing::matching(pattern)?.handler(handler);
        Ok(self.register(kind::MESSAGE, svc))
    }

    /// Like [`on_match`](Self::on_match) with a pre-compiled regex.
    pub fn on_match_regex<H>(&mut self, regex: Regex, handler: H) -> &mut Self
    where
        H: Handler<MessageContext>,
    {
        self.register(kind::MESSAGE, routing::matching_regex(regex).handler(handler))
    }

    /// Runs `handler` for addressed messages whose entire addressed text
    /// matches `pattern`.
    pub fn on_addressed_match<H>(
        &mut self,
        pattern: &str,
        handler: H,
    ) -> Result<&mut Self, regex::Error>
    where
        H: Handler<MessageContext>,
    {
        let svc = routing::addressed_matching(pattern)?.handler(handler);
        Ok(self.register(kind::MESSAGE, svc))
    }

    pub fn on_addressed_match_regex<H>(&mut self, regex: Regex, handler: H) -> &mut Self
    where
        H: Handler<MessageContext>,
    {
        self.register(
            kind::MESSAGE,
            routing::addressed_matching_regex(regex).handler(handler),
        )
    }

    /// Runs `handler` for addressed messages whose first token is `name`.
    pub fn on_command<H>(&mut self, name: &str, handler: H) -> &mut Self
    where
        H: Handler<CommandContext>,
    {
        self.register(kind::MESSAGE, routing::command(name).handler(handler))
    }

    /// Number of handlers registered for `kind`.
    pub fn handler_count(&self, kind: &str) -> usize {
        self.handlers.get(kind).map_or(0, Vec::len)
    }

    /// Runs every handler registered for the kind of `ctx`, in order.
    pub async fn dispatch(&self, ctx: Arc<EventContext>) -> DispatchOutcome {
        let span = debug_span!("dispatch", kind = %ctx.kind());
        self.run_handlers(ctx).instrument(span).await
    }

    async fn run_handlers(&self, ctx: Arc<EventContext>) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();
        let Some(handlers) = self.handlers.get(ctx.kind()) else {
            trace!("No handlers for event kind");
            return outcome;
        };

        for (index, svc) in handlers.iter().enumerate() {
            match svc.clone().oneshot(Arc::clone(&ctx)).await {
                Ok(()) => outcome.handled += 1,
                Err(e) if is_skipped(&e) => outcome.skipped += 1,
                Err(e) => {
                    outcome.failed += 1;
                    error!(handler = index, error = %e, "Handler returned an error");
                }
            }
        }

        trace!(
            handled = outcome.handled,
            skipped = outcome.skipped,
            failed = outcome.failed,
            "Dispatch finished"
        );
        outcome
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: HashMap<&str, usize> = self
            .handlers
            .iter()
            .map(|(kind, list)| (kind.as_str(), list.len()))
            .collect();
        f.debug_struct("Dispatcher")
            .field("handlers", &counts)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use parking_lot::Mutex;
    use tokio::sync::mpsc::UnboundedReceiver;

    use slacksoc_core::{Directory, Event, Identity, MessageEvent, OutboxBot, Outgoing};

    use super::*;
    use crate::context::BotContext;
    use crate::state::{MemoryBackend, StateStore};

    async fn bot_context() -> (Arc<BotContext>, UnboundedReceiver<Outgoing>) {
        let (bot, outbox) = OutboxBot::new();
        let state = StateStore::open(Arc::new(MemoryBackend::new()), Duration::from_secs(1))
            .await
            .unwrap();
        let ctx = BotContext::new(Arc::new(bot), Arc::new(Directory::new()), state);
        ctx.set_identity(Identity {
            id: "B1".into(),
            name: "bot".into(),
        })
        .unwrap();
        (Arc::new(ctx), outbox)
    }

    fn message(bot: &Arc<BotContext>, channel: &str, text: &str) -> Arc<EventContext> {
        let msg = MessageEvent {
            channel: channel.into(),
            user: "U1".into(),
            text: text.into(),
            ts: "1.0".into(),
            ..Default::default()
        };
        Arc::new(EventContext::new(Event::Message(msg), bot.clone()))
    }

    fn replies(outbox: &mut UnboundedReceiver<Outgoing>) -> Vec<String> {
        let mut texts = Vec::new();
        while let Ok(out) = outbox.try_recv() {
            if let Outgoing::Message { text, .. } = out {
                texts.push(text);
            }
        }
        texts
    }

    #[tokio::test]
    async fn test_no_handlers_for_kind() {
        let (bot, _outbox) = bot_context().await;
        let dispatcher = Dispatcher::new();
        let outcome = dispatcher.dispatch(message(&bot, "C1", "hi")).await;
        assert_eq!(outcome, DispatchOutcome::default());
    }

    #[tokio::test]
    async fn test_order_and_error_isolation() {
        let (bot, _outbox) = bot_context().await;
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = Dispatcher::new();

        let s = seen.clone();
        dispatcher.on_event(kind::MESSAGE, move |_: Arc<EventContext>| {
            let s = s.clone();
            async move { s.lock().push(1) }
        });
        let s = seen.clone();
        dispatcher.on_event(kind::MESSAGE, move |_: Arc<EventContext>| {
            let s = s.clone();
            async move {
                s.lock().push(2);
                Err::<(), BoxError>("boom".into())
            }
        });
        let s = seen.clone();
        dispatcher.on_event(kind::MESSAGE, move |_: Arc<EventContext>| {
            let s = s.clone();
            async move { s.lock().push(3) }
        });

        let outcome = dispatcher.dispatch(message(&bot, "C1", "hi")).await;
        assert_eq!(*seen.lock(), vec![1, 2, 3]);
        assert_eq!(outcome.handled, 2);
        assert_eq!(outcome.failed, 1);

        // Later events are unaffected.
        dispatcher.dispatch(message(&bot, "C1", "again")).await;
        assert_eq!(seen.lock().len(), 6);
    }

    #[tokio::test]
    async fn test_ping_pong() {
        let (bot, mut outbox) = bot_context().await;
        let mut dispatcher = Dispatcher::new();
        dispatcher
            .on_addressed_match("^ping$", |msg: MessageContext| async move {
                msg.reply("pong").await
            })
            .unwrap();

        dispatcher.dispatch(message(&bot, "G1", "<@B1> ping")).await;
        assert_eq!(replies(&mut outbox), ["pong"]);

        let outcome = dispatcher.dispatch(message(&bot, "G1", "ping")).await;
        assert_eq!(outcome.skipped, 1);
        assert!(replies(&mut outbox).is_empty());

        dispatcher.dispatch(message(&bot, "D1", "ping")).await;
        assert_eq!(replies(&mut outbox), ["pong"]);
    }

    #[tokio::test]
    async fn test_addressed_view_keeps_original_event() {
        let (bot, _outbox) = bot_context().await;
        let seen = Arc::new(Mutex::new(None));
        let mut dispatcher = Dispatcher::new();

        let s = seen.clone();
        dispatcher.on_addressed(move |msg: MessageContext| {
            let s = s.clone();
            async move {
                *s.lock() = Some((msg.text().to_string(), msg.message().text.clone()));
            }
        });

        let ctx = message(&bot, "C1", "bot: hello there");
        dispatcher.dispatch(ctx.clone()).await;
        assert_eq!(
            seen.lock().clone(),
            Some(("hello there".to_string(), "bot: hello there".to_string()))
        );
        assert_eq!(ctx.event().as_message().unwrap().text, "bot: hello there");
    }

    #[tokio::test]
    async fn test_subtype_filter() {
        let (bot, _outbox) = bot_context().await;
        let joins = Arc::new(AtomicUsize::new(0));
        let mut dispatcher = Dispatcher::new();

        let j = joins.clone();
        dispatcher.on_message("channel_join", move |_: MessageContext| {
            let j = j.clone();
            async move {
                j.fetch_add(1, Ordering::SeqCst);
            }
        });

        dispatcher.dispatch(message(&bot, "C1", "hi")).await;
        let join = MessageEvent {
            channel: "C1".into(),
            user: "U2".into(),
            subtype: "channel_join".into(),
            ..Default::default()
        };
        dispatcher
            .dispatch(Arc::new(EventContext::new(Event::Message(join), bot.clone())))
            .await;
        assert_eq!(joins.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_match_is_full_string() {
        let (bot, mut outbox) = bot_context().await;
        let mut dispatcher = Dispatcher::new();
        dispatcher
            .on_match(r"(\w+)\+\+", |msg: MessageContext| async move {
                let target = msg.capture(1).unwrap_or_default().to_string();
                msg.reply(&format!("{target} gained a point")).await
            })
            .unwrap();

        dispatcher.dispatch(message(&bot, "C1", "rust++")).await;
        dispatcher.dispatch(message(&bot, "C1", "i think rust++ wins")).await;
        assert_eq!(replies(&mut outbox), ["rust gained a point"]);
    }

    #[tokio::test]
    async fn test_precompiled_regex_must_cover_text() {
        let (bot, mut outbox) = bot_context().await;
        let mut dispatcher = Dispatcher::new();
        dispatcher.on_match_regex(Regex::new("hi").unwrap(), |msg: MessageContext| async move {
            msg.reply("hello").await
        });

        dispatcher.dispatch(message(&bot, "C1", "hi there")).await;
        dispatcher.dispatch(message(&bot, "C1", "hi")).await;
        assert_eq!(replies(&mut outbox), ["hello"]);
    }

    #[tokio::test]
    async fn test_invalid_pattern_is_reported() {
        let mut dispatcher = Dispatcher::new();
        let result = dispatcher.on_match("(unclosed", |_: MessageContext| async {});
        assert!(result.is_err());
        assert_eq!(dispatcher.handler_count(kind::MESSAGE), 0);
    }

    #[tokio::test]
    async fn test_command_tokenizing() {
        let (bot, _outbox) = bot_context().await;
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = Dispatcher::new();

        let s = seen.clone();
        dispatcher.on_command("echo", move |cmd: CommandContext| {
            let s = s.clone();
            async move {
                s.lock().push(cmd.args().to_vec());
            }
        });

        dispatcher.dispatch(message(&bot, "C1", "<@B1> echo 'a b'")).await;
        let outcome = dispatcher.dispatch(message(&bot, "C1", "<@B1> echo 'oops")).await;
        assert_eq!(outcome.failed, 0);
        assert_eq!(outcome.skipped, 1);
        dispatcher.dispatch(message(&bot, "C1", "<@B1> other")).await;
        dispatcher.dispatch(message(&bot, "C1", "echo 'a b'")).await;

        assert_eq!(*seen.lock(), vec![vec!["echo".to_string(), "a b".to_string()]]);
    }
}
