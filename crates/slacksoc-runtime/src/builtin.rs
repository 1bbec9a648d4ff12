//! Handlers the runtime registers ahead of every plugin.
//!
//! They keep the directory in sync with membership events, learn the bot
//! identity from `hello`, and answer the `help` command from the plugin
//! catalog.

use std::sync::Arc;

use tracing::{debug, info, warn};

use slacksoc_core::{ApiResult, Event, kind};
use slacksoc_framework::{BoxError, CommandContext, Dispatcher, EventContext};

/// Registers the directory handlers and the `help` command.
pub fn register(dispatcher: &mut Dispatcher) {
    dispatcher
        .on_event(kind::HELLO, on_hello)
        .on_event(kind::TEAM_JOIN, on_user_event)
        .on_event(kind::USER_CHANGE, on_user_event)
        .on_event(kind::CHANNEL_CREATED, on_channel_event)
        .on_event(kind::CHANNEL_RENAME, on_channel_event)
        .on_event(kind::CHANNEL_DELETED, on_channel_deleted)
        .on_command("help", help);
}

async fn on_hello(ctx: Arc<EventContext>) -> Result<(), BoxError> {
    let Event::Hello(hello) = ctx.event() else {
        return Ok(());
    };
    let bot = ctx.bot();

    if bot.set_identity(hello.identity.clone())? {
        info!(id = %hello.identity.id, name = %hello.identity.name, "Bot identity learned");
    } else if bot.identity() != Some(&hello.identity) {
        warn!(
            id = %hello.identity.id,
            name = %hello.identity.name,
            "Handshake reported a different identity, keeping the first one"
        );
    }
    bot.set_team(hello.team.clone());
    bot.directory()
        .load(hello.users.clone(), hello.channels.clone());

    info!(
        team = %hello.team.name,
        users = hello.users.len(),
        channels = hello.channels.len(),
        "Directory loaded"
    );
    Ok(())
}

async fn on_user_event(ctx: Arc<EventContext>) {
    let (Event::TeamJoin(evt) | Event::UserChange(evt)) = ctx.event() else {
        return;
    };
    info!(kind = %ctx.kind(), id = %evt.user.id, name = %evt.user.name, "Updating user");
    ctx.bot().directory().upsert_user(evt.user.clone());
}

async fn on_channel_event(ctx: Arc<EventContext>) {
    let (Event::ChannelCreated(evt) | Event::ChannelRename(evt)) = ctx.event() else {
        return;
    };
    info!(kind = %ctx.kind(), id = %evt.channel.id, name = %evt.channel.name, "Updating channel");
    ctx.bot().directory().upsert_channel(evt.channel.clone());
}

async fn on_channel_deleted(ctx: Arc<EventContext>) {
    let Event::ChannelDeleted(evt) = ctx.event() else {
        return;
    };
    match ctx.bot().directory().remove_channel(&evt.channel) {
        Some(channel) => info!(id = %channel.id, name = %channel.name, "Channel deleted"),
        None => debug!(id = %evt.channel, "Deleted channel was not in the directory"),
    }
}

/// `help` lists the loaded plugins; `help <instance>` shows one plugin's help.
async fn help(cmd: CommandContext) -> ApiResult<()> {
    let text = help_text(&cmd);
    cmd.reply(&text).await
}

fn help_text(cmd: &CommandContext) -> String {
    let catalog = cmd.bot().catalog();

    if let Some(name) = cmd.arg(1) {
        return match catalog.iter().find(|p| p.name == name) {
            Some(plugin) => format!("*{}*: {}", plugin.name, plugin.help),
            None => format!("No plugin named `{name}` is loaded."),
        };
    }

    if catalog.is_empty() {
        return "No plugins are loaded.".to_string();
    }

    let mut text = String::from("Loaded plugins:");
    for plugin in catalog {
        text.push_str(&format!("\n• *{}*: {}", plugin.name, plugin.description));
    }
    text.push_str("\nSay `help <plugin>` for details.");
    text
}
