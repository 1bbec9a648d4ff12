//! Commands for looking at the bot's view of the world.

use tracing::debug;

use slacksoc_core::markup::{mention_channel, mention_special, mention_user};
use slacksoc_framework::{MessageContext, Plugin, PluginError, PluginLoadContext};

/// Answers messages whose whole text is `users`, `channels`, `metadata`,
/// `debug` or `info`, in any channel and without addressing the bot.
pub struct DebugCommands;

impl DebugCommands {
    pub fn load(ctx: &mut PluginLoadContext<'_>) -> Result<Box<dyn Plugin>, PluginError> {
        ctx.decode::<NoConfig>(&[])?;

        let dispatcher = ctx.dispatcher();
        dispatcher.on_match("users", users)?;
        dispatcher.on_match("channels", channels)?;
        dispatcher.on_match("metadata", metadata)?;
        dispatcher.on_match("debug", |msg: MessageContext| async move {
            msg.react("dope").await
        })?;
        dispatcher.on_match("info", info)?;

        Ok(Box::new(DebugCommands))
    }
}

impl Plugin for DebugCommands {
    fn describe(&self) -> &str {
        "several commands for seeing the internal state of the bot"
    }

    fn help(&self) -> &str {
        "Commands for debugging the bot. Send the bare word, without addressing\n\
         the bot, as the whole message:\n\
         \x20 users - lists known users\n\
         \x20 channels - lists known channels\n\
         \x20 metadata - shows the team and the bot identity\n\
         \x20 debug - reacts to the message with :dope:\n\
         \x20 info - tells you what channel you're in"
    }
}

#[derive(serde::Deserialize)]
struct NoConfig {}

async fn users(msg: MessageContext) -> anyhow::Result<()> {
    let mut users = msg.bot().directory().users();
    users.sort_by(|a, b| a.name.cmp(&b.name));
    debug!(count = users.len(), "Listing users");

    for user in users {
        let email = user.profile.email.as_deref().unwrap_or("");
        msg.reply(&format!(
            "user: id={}, username={}, email={}",
            user.id, user.name, email
        ))
        .await?;
    }
    Ok(())
}

async fn channels(msg: MessageContext) -> anyhow::Result<()> {
    let mut channels = msg.bot().directory().channels();
    channels.sort_by(|a, b| a.name.cmp(&b.name));

    for channel in channels {
        msg.reply(&format!("channel: id={}, name={}", channel.id, channel.name))
            .await?;
    }
    Ok(())
}

async fn metadata(msg: MessageContext) -> anyhow::Result<()> {
    let team = msg.bot().team();
    msg.reply(&format!(
        "team: id={}, name={}, domain={}",
        team.id, team.name, team.domain
    ))
    .await?;

    if let Some(me) = msg.bot().identity() {
        msg.reply(&format!("me: id={}, name={}", me.id, me.name))
            .await?;
    }
    Ok(())
}

async fn info(msg: MessageContext) -> anyhow::Result<()> {
    let text = format!(
        "{}: we are in {}, tell {}",
        mention_user(msg.user()),
        mention_channel(msg.channel()),
        mention_special("everyone")
    );
    msg.reply(&text).await?;
    Ok(())
}
