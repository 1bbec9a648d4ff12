//! # slacksoc core
//!
//! Leaf types shared by every other slacksoc crate:
//!
//! - **Events**: the closed [`Event`] sum type delivered by the messaging
//!   backend, with an [`Event::Other`] catch-all for kinds the runtime does not
//!   model.
//! - **Bot**: the [`Bot`] send primitive the runtime needs from the backend,
//!   plus [`OutboxBot`], a channel-backed implementation.
//! - **Directory**: the concurrently readable [`Directory`] cache of users and
//!   channels.
//! - **Markup**: helpers for building and parsing mentions and classifying
//!   channel identifiers.
//!
//! ```text
//! ┌───────────┐  Event   ┌────────────┐  reads   ┌───────────┐
//! │  Backend  │─────────▶│ Dispatcher │─────────▶│ Directory │
//! │ transport │◀─────────│ (framework)│          └───────────┘
//! └───────────┘   Bot    └────────────┘
//! ```

pub mod bot;
pub mod directory;
pub mod error;
pub mod event;
pub mod markup;

pub use bot::{Bot, BoxedBot, OutboxBot, Outgoing};
pub use directory::{Channel, Directory, DirectoryEntry, User, UserProfile};
pub use error::{ApiError, ApiResult, EventError};
pub use event::{
    ChannelDeletedEvent, ChannelEvent, Event, HelloEvent, Identity, MessageEvent, RawEvent, Team,
    UserEvent, kind,
};
