//! The send primitive the runtime needs from the messaging backend.
//!
//! The wire connection is owned by a transport outside this workspace; all the
//! runtime and its plugins require is something that implements [`Bot`].
//! [`OutboxBot`] is a channel-backed implementation that turns every call into
//! an [`Outgoing`] value, which the CLI prints and the tests inspect.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::mpsc;

use crate::error::{ApiError, ApiResult};

/// Outbound actions a bot can perform.
#[async_trait]
pub trait Bot: Send + Sync + 'static {
    /// Posts `text` to `channel`.
    async fn send(&self, channel: &str, text: &str) -> ApiResult<()>;

    /// Adds `reaction` (an emoji name without colons) to the message
    /// identified by `channel` and `timestamp`.
    async fn react(&self, channel: &str, timestamp: &str, reaction: &str) -> ApiResult<()>;

    /// Opens (or reuses) a direct conversation with `user` and posts `text`.
    async fn direct_message(&self, user: &str, text: &str) -> ApiResult<()>;
}

/// Shared handle to a [`Bot`] implementation.
pub type BoxedBot = Arc<dyn Bot>;

/// An action recorded by [`OutboxBot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Outgoing {
    Message {
        channel: String,
        text: String,
    },
    Reaction {
        channel: String,
        timestamp: String,
        reaction: String,
    },
    DirectMessage {
        user: String,
        text: String,
    },
}

/// A [`Bot`] that forwards every action into an unbounded channel.
#[derive(Debug, Clone)]
pub struct OutboxBot {
    tx: mpsc::UnboundedSender<Outgoing>,
}

impl OutboxBot {
    /// Creates the bot together with the receiving end of its outbox.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Outgoing>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn push(&self, action: Outgoing) -> ApiResult<()> {
        self.tx.send(action).map_err(|_| ApiError::NotConnected)
    }
}

#[async_trait]
impl Bot for OutboxBot {
    async fn send(&self, channel: &str, text: &str) -> ApiResult<()> {
        self.push(Outgoing::Message {
            channel: channel.to_string(),
            text: text.to_string(),
        })
    }

    async fn react(&self, channel: &str, timestamp: &str, reaction: &str) -> ApiResult<()> {
        self.push(Outgoing::Reaction {
            channel: channel.to_string(),
            timestamp: timestamp.to_string(),
            reaction: reaction.to_string(),
        })
    }

    async fn direct_message(&self, user: &str, text: &str) -> ApiResult<()> {
        self.push(Outgoing::DirectMessage {
            user: user.to_string(),
            text: text.to_string(),
        })
    }
}
