//! JSON-lines event input.

use futures::Stream;
use futures::stream;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{error, warn};

use slacksoc_core::Event;

/// Decodes one line. Blank lines yield `None`.
pub fn parse_line(line: &str) -> anyhow::Result<Option<Event>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let value = serde_json::from_str(line)?;
    Ok(Some(Event::from_value(value)?))
}

/// Streams the events of `reader`, one JSON object per line.
///
/// Lines that fail to decode are logged and skipped. A read error ends the
/// stream.
pub fn event_stream<R>(reader: R) -> impl Stream<Item = Event>
where
    R: AsyncBufRead + Unpin,
{
    stream::unfold((reader.lines(), 0usize), |(mut lines, mut number)| async move {
        loop {
            number += 1;
            match lines.next_line().await {
                Ok(Some(line)) => match parse_line(&line) {
                    Ok(Some(event)) => return Some((event, (lines, number))),
                    Ok(None) => {}
                    Err(e) => warn!(line = number, error = %e, "Skipping undecodable event"),
                },
                Ok(None) => return None,
                Err(e) => {
                    error!(line = number, error = %e, "Failed to read events");
                    return None;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;

    #[test]
    fn test_parse_line() {
        assert!(parse_line("   ").unwrap().is_none());

        let event = parse_line(r#"{"type":"message","channel":"C1","user":"U1","text":"hi"}"#)
            .unwrap()
            .unwrap();
        assert_eq!(event.kind(), "message");

        assert!(parse_line("{not json").is_err());
        assert!(parse_line(r#"{"channel":"C1"}"#).is_err());
    }

    #[tokio::test]
    async fn test_stream_skips_bad_lines() {
        let input: &[u8] = b"{\"type\":\"hello\",\"self\":{\"id\":\"B1\",\"name\":\"bot\"}}\n\
            garbage\n\
            \n\
            {\"type\":\"pong\",\"reply_to\":1}\n";

        let kinds: Vec<String> = event_stream(input)
            .map(|event| event.kind().to_string())
            .collect()
            .await;
        assert_eq!(kinds, ["hello", "pong"]);
    }
}
