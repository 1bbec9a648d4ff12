use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use slacksoc_framework::{MessageContext, Plugin, PluginError, PluginLoadContext};

#[derive(Debug, Deserialize)]
struct RealNameConfig {
    /// Channel name, without `#`.
    channel: String,
}

/// DMs people who join the configured channel without a real name set.
pub struct RealName;

impl RealName {
    pub fn load(ctx: &mut PluginLoadContext<'_>) -> Result<Box<dyn Plugin>, PluginError> {
        let config: RealNameConfig = ctx.decode(&["channel"])?;
        let channel: Arc<str> = config.channel.trim_start_matches('#').into();

        ctx.dispatcher()
            .on_message("channel_join", move |msg: MessageContext| {
                let channel = Arc::clone(&channel);
                async move { nag(&channel, msg).await }
            });
        Ok(Box::new(RealName))
    }
}

impl Plugin for RealName {
    fn describe(&self) -> &str {
        "makes people set real name fields"
    }

    fn help(&self) -> &str {
        "Sends a DM to people who join the configured channel without setting \
         their real name field."
    }
}

async fn nag(channel: &str, msg: MessageContext) -> anyhow::Result<()> {
    let bot = msg.bot();
    let joined = bot.directory().channel_by_id(msg.channel());
    if joined.is_none_or(|c| c.name != channel) {
        return Ok(());
    }
    let Some(user) = bot.directory().user_by_id(msg.user()) else {
        return Ok(());
    };
    if !user.real_name.is_empty() || user.is_bot {
        return Ok(());
    }

    let text = format!(
        "Please set your real name fields. https://{}.slack.com/team/{}. Then click \"Edit\".",
        bot.team().domain,
        user.name
    );
    bot.direct_message(&user.id, &text).await?;
    info!(user = %user.name, channel, "Asked user to set a real name");
    Ok(())
}
