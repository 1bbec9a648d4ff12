//! Inbound event model.
//!
//! The backend delivers a sequential stream of JSON objects, each tagged with a
//! `type` string. Kinds the runtime understands decode into a dedicated
//! variant of [`Event`]; every other kind is kept verbatim in
//! [`Event::Other`], so new backend kinds never require changes here.
//!
//! ```rust,ignore
//! let event: Event = serde_json::from_str(r#"{"type":"message","channel":"C1","text":"hi"}"#)?;
//! assert_eq!(event.kind(), kind::MESSAGE);
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::directory::{Channel, User};
use crate::error::EventError;

/// Event kind strings used as dispatch keys.
pub mod kind {
    pub const HELLO: &str = "hello";
    pub const MESSAGE: &str = "message";
    pub const TEAM_JOIN: &str = "team_join";
    pub const USER_CHANGE: &str = "user_change";
    pub const CHANNEL_CREATED: &str = "channel_created";
    pub const CHANNEL_DELETED: &str = "channel_deleted";
    pub const CHANNEL_RENAME: &str = "channel_rename";
}

/// The bot's own identity, learned from the handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub name: String,
}

/// The team (workspace) the bot is connected to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub domain: String,
}

/// Handshake event. Carries the bot identity and the initial directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloEvent {
    #[serde(rename = "self")]
    pub identity: Identity,
    #[serde(default)]
    pub team: Team,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub channels: Vec<Channel>,
}

/// A chat message.
///
/// `subtype` is empty for normal user messages and names the system subtype
/// (`channel_join`, `bot_message`, ...) otherwise.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEvent {
    pub channel: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub subtype: String,
    #[serde(default)]
    pub ts: String,
}

/// Payload of `team_join` and `user_change`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserEvent {
    pub user: User,
}

/// Payload of `channel_created` and `channel_rename`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelEvent {
    pub channel: Channel,
}

/// Payload of `channel_deleted`: only the id is sent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelDeletedEvent {
    pub channel: String,
}

/// An event of a kind the runtime does not model.
#[derive(Debug, Clone)]
pub struct RawEvent {
    pub kind: String,
    pub payload: Value,
}

/// An inbound event.
#[derive(Debug, Clone)]
pub enum Event {
    Hello(HelloEvent),
    Message(MessageEvent),
    TeamJoin(UserEvent),
    UserChange(UserEvent),
    ChannelCreated(ChannelEvent),
    ChannelDeleted(ChannelDeletedEvent),
    ChannelRename(ChannelEvent),
    Other(RawEvent),
}

impl Event {
    /// Returns the dispatch key of this event.
    pub fn kind(&self) -> &str {
        match self {
            Self::Hello(_) => kind::HELLO,
            Self::Message(_) => kind::MESSAGE,
            Self::TeamJoin(_) => kind::TEAM_JOIN,
            Self::UserChange(_) => kind::USER_CHANGE,
            Self::ChannelCreated(_) => kind::CHANNEL_CREATED,
            Self::ChannelDeleted(_) => kind::CHANNEL_DELETED,
            Self::ChannelRename(_) => kind::CHANNEL_RENAME,
            Self::Other(raw) => &raw.kind,
        }
    }

    /// Returns the message payload if this is a `message` event.
    pub fn as_message(&self) -> Option<&MessageEvent> {
        match self {
            Self::Message(msg) => Some(msg),
            _ => None,
        }
    }

    /// Decodes an event from a raw JSON object.
    pub fn from_value(value: Value) -> Result<Self, EventError> {
        let Value::Object(ref fields) = value else {
            return Err(EventError::NotAnObject);
        };
        let kind = fields
            .get("type")
            .and_then(Value::as_str)
            .ok_or(EventError::MissingType)?
            .to_string();

        fn decode<T: serde::de::DeserializeOwned>(
            kind: &str,
            value: Value,
        ) -> Result<T, EventError> {
            serde_json::from_value(value).map_err(|source| EventError::Malformed {
                kind: kind.to_string(),
                source,
            })
        }

        Ok(match kind.as_str() {
            kind::HELLO => Self::Hello(decode(&kind, value)?),
            kind::MESSAGE => Self::Message(decode(&kind, value)?),
            kind::TEAM_JOIN => Self::TeamJoin(decode(&kind, value)?),
            kind::USER_CHANGE => Self::UserChange(decode(&kind, value)?),
            kind::CHANNEL_CREATED => Self::ChannelCreated(decode(&kind, value)?),
            kind::CHANNEL_DELETED => Self::ChannelDeleted(decode(&kind, value)?),
            kind::CHANNEL_RENAME => Self::ChannelRename(decode(&kind, value)?),
            _ => Self::Other(RawEvent {
                kind,
                payload: value,
            }),
        })
    }
}

impl<'de> Deserialize<'de> for Event {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Event::from_value(value).map_err(serde::de::Error::custom)
    }
}

impl From<MessageEvent> for Event {
    fn from(msg: MessageEvent) -> Self {
        Self::Message(msg)
    }
}
