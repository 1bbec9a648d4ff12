//! Decides whether a message is directed at the bot.
//!
//! A message is *addressed* when it starts with a mention of the bot
//! (`<@B1>`, `<@B1|bot>`, `@bot` or `bot`), optionally followed by a colon,
//! then whitespace. The addressed text is whatever follows that prefix.
//! Messages in a direct conversation are always addressed, unstripped.
//!
//! ```rust,ignore
//! let resolver = AddressResolver::new(Identity { id: "B1".into(), name: "bot".into() })?;
//! assert_eq!(resolver.strip("<@B1> hello"), Some("hello"));
//! assert_eq!(resolver.strip("bot: hi"), Some("hi"));
//! assert_eq!(resolver.strip("hi bot"), None);
//! ```

use regex::Regex;

use slacksoc_core::Identity;
use slacksoc_core::markup::is_direct;

/// Matcher built once from the bot identity.
#[derive(Debug, Clone)]
pub struct AddressResolver {
    identity: Identity,
    prefix: Regex,
}

impl AddressResolver {
    pub fn new(identity: Identity) -> Result<Self, regex::Error> {
        let prefix = Regex::new(&format!(
            r"^\s*(?:<@{id}(?:\|\w+)?>|@?{name}):?\s+",
            id = regex::escape(&identity.id),
            name = regex::escape(&identity.name),
        ))?;
        Ok(Self { identity, prefix })
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Returns the text after a leading mention of the bot, if there is one.
    pub fn strip<'a>(&self, text: &'a str) -> Option<&'a str> {
        self.prefix.find(text).map(|m| &text[m.end()..])
    }

    /// Resolves the addressed text of a message posted in `channel`.
    pub fn resolve<'a>(&self, channel: &str, text: &'a str) -> Option<&'a str> {
        resolve_addressed(Some(self), channel, text)
    }
}

/// Resolves the addressed text of a message, with or without a known identity.
///
/// Before the identity is learned only the direct-conversation rule applies.
pub fn resolve_addressed<'a>(
    resolver: Option<&AddressResolver>,
    channel: &str,
    text: &'a str,
) -> Option<&'a str> {
    if let Some(stripped) = resolver.and_then(|r| r.strip(text)) {
        return Some(stripped);
    }
    is_direct(channel).then_some(text)
}
