//! Chat markup helpers.
//!
//! Conversation ids carry their kind in the first character: `C` for public
//! channels, `G` for private groups and `D` for direct conversations.

/// Whether `channel` is a direct (one-to-one) conversation.
pub fn is_direct(channel: &str) -> bool {
    channel.starts_with('D')
}

pub fn is_public_channel(channel: &str) -> bool {
    channel.starts_with('C')
}

/// `<@U123>`
pub fn mention_user(id: &str) -> String {
    format!("<@{id}>")
}

/// Special mentions such as `<!channel>` or `<!here>`.
pub fn mention_special(name: &str) -> String {
    format!("<!{name}>")
}

/// `<#C123>`
pub fn mention_channel(id: &str) -> String {
    format!("<#{id}>")
}

/// Extracts the user id from a `<@U123>` or `<@U123|name>` mention.
///
/// The whole (trimmed) input must be a single mention.
pub fn parse_user_mention(text: &str) -> Option<&str> {
    let inner = text.trim().strip_prefix("<@")?.strip_suffix('>')?;
    if inner.contains(['<', '>']) {
        return None;
    }
    let id = inner.split_once('|').map_or(inner, |(id, _)| id);
    if id.is_empty() || id.contains('@') {
        return None;
    }
    Some(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_kinds() {
        assert!(is_direct("D024BE91L"));
        assert!(!is_direct("C024BE91L"));
        assert!(is_public_channel("C024BE91L"));
        assert!(!is_public_channel("G024BE91L"));
    }

    #[test]
    fn test_mentions() {
        assert_eq!(mention_user("U1"), "<@U1>");
        assert_eq!(mention_special("here"), "<!here>");
        assert_eq!(mention_channel("C1"), "<#C1>");
    }

    #[test]
    fn test_parse_user_mention() {
        assert_eq!(parse_user_mention("<@U1>"), Some("U1"));
        assert_eq!(parse_user_mention(" <@U1|alice> "), Some("U1"));
        assert_eq!(parse_user_mention("alice"), None);
        assert_eq!(parse_user_mention("<@>"), None);
        assert_eq!(parse_user_mention("<@U1> hi"), None);
    }
}
