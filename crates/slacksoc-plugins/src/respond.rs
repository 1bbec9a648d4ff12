//! Canned replies to trigger messages.
//!
//! ```yaml
//! - name: Respond
//!   responses:
//!     - trigger: "good bot"
//!       replies: ["thanks!", ":blush:"]
//! ```

use std::sync::Arc;

use rand::seq::IndexedRandom;
use serde::Deserialize;
use tracing::info;

use slacksoc_framework::{MessageContext, Plugin, PluginError, PluginLoadContext};

/// A trigger and the replies to pick from.
#[derive(Debug, Clone, Deserialize)]
pub struct Response {
    pub trigger: String,
    pub replies: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RespondConfig {
    responses: Vec<Response>,
}

/// Listens to every normal message and answers exact trigger matches with
/// a randomly selected reply.
pub struct Respond;

impl Respond {
    pub fn load(ctx: &mut PluginLoadContext<'_>) -> Result<Box<dyn Plugin>, PluginError> {
        let config: RespondConfig = ctx.decode(&["responses"])?;
        if let Some(empty) = config.responses.iter().find(|r| r.replies.is_empty()) {
            return Err(PluginError::custom(format!(
                "trigger '{}' has no replies",
                empty.trigger
            )));
        }

        let triggers = config.responses.len();
        let responses = Arc::new(config.responses);
        ctx.dispatcher().on_message("", move |msg: MessageContext| {
            let responses = Arc::clone(&responses);
            async move { respond(&responses, msg).await }
        });

        info!(instance = ctx.name(), triggers, "Respond loaded");
        Ok(Box::new(Respond))
    }
}

impl Plugin for Respond {
    fn describe(&self) -> &str {
        "responds to triggers with randomly selected messages"
    }

    fn help(&self) -> &str {
        "Listens to all messages and, when a trigger message is heard, replies \
         with one of its configured responses picked at random."
    }
}

async fn respond(responses: &[Response], msg: MessageContext) -> anyhow::Result<()> {
    let Some(response) = responses.iter().find(|r| r.trigger == msg.text()) else {
        return Ok(());
    };
    let Some(reply) = pick(&response.replies) else {
        return Ok(());
    };

    msg.reply(reply).await?;
    info!(trigger = %response.trigger, reply = %reply, "Respond trigger activated");
    Ok(())
}

fn pick(replies: &[String]) -> Option<&String> {
    replies.choose(&mut rand::rng())
}
