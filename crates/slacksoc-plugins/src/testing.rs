use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc::UnboundedReceiver;

use slacksoc_core::{Channel, Directory, Event, Identity, MessageEvent, OutboxBot, Outgoing, User};
use slacksoc_framework::{
    BotContext, Dispatcher, EventContext, MemoryBackend, Plugin, PluginConfig, PluginError,
    PluginLoadContext, StateStore, StateTable,
};

/// A bot named `bot` (`B1`) with a loaded directory and one plugin.
pub struct Harness {
    pub bot: Arc<BotContext>,
    pub dispatcher: Dispatcher,
    pub outbox: UnboundedReceiver<Outgoing>,
    pub backend: Arc<MemoryBackend>,
}

type Loader = fn(&mut PluginLoadContext<'_>) -> Result<Box<dyn Plugin>, PluginError>;

impl Harness {
    pub async fn new(name: &str, config: Value, load: Loader) -> Result<Self, PluginError> {
        Self::with_state(name, config, StateTable::new(), load).await
    }

    pub async fn with_state(
        name: &str,
        config: Value,
        state: StateTable,
        load: Loader,
    ) -> Result<Self, PluginError> {
        let (bot, outbox) = OutboxBot::new();
        let backend = Arc::new(MemoryBackend::with_table(state));
        let store = StateStore::open(backend.clone(), Duration::from_secs(1)).await?;
        let directory = Directory::new();
        directory.load(
            vec![
                User::new("U1", "alice"),
                User::new("U2", "bob"),
                User::new("U3", "carol"),
            ],
            vec![Channel::new("C1", "general"), Channel::new("C2", "random")],
        );

        let bot = Arc::new(BotContext::new(Arc::new(bot), Arc::new(directory), store));
        bot.set_identity(Identity {
            id: "B1".into(),
            name: "bot".into(),
        })?;

        let config: PluginConfig = match config {
            Value::Object(map) => map,
            _ => PluginConfig::new(),
        };
        let mut dispatcher = Dispatcher::new();
        let mut ctx = PluginLoadContext::new(name, &config, &mut dispatcher, &bot);
        load(&mut ctx)?;

        Ok(Self {
            bot,
            dispatcher,
            outbox,
            backend,
        })
    }

    pub async fn dispatch(&self, event: Event) {
        let ctx = Arc::new(EventContext::new(event, Arc::clone(&self.bot)));
        self.dispatcher.dispatch(ctx).await;
    }

    pub async fn say(&self, channel: &str, user: &str, text: &str) {
        self.dispatch(Event::Message(MessageEvent {
            channel: channel.into(),
            user: user.into(),
            text: text.into(),
            ts: "1.0".into(),
            ..Default::default()
        }))
        .await;
    }

    pub fn sent(&mut self) -> Vec<Outgoing> {
        let mut out = Vec::new();
        while let Ok(item) = self.outbox.try_recv() {
            out.push(item);
        }
        out
    }

    /// Texts of plain channel messages, in order.
    pub fn messages(&mut self) -> Vec<(String, String)> {
        self.sent()
            .into_iter()
            .filter_map(|out| match out {
                Outgoing::Message { channel, text } => Some((channel, text)),
                _ => None,
            })
            .collect()
    }
}
