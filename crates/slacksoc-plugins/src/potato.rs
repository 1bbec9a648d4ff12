//! Hot potato: a game of passing the potato before your timer runs out.
//!
//! The game is persisted as the instance's state blob, so it survives a
//! restart. On `hello` a restored game gets its timer back; if the holder ran
//! out of time while the bot was down they get an apology and the game ends.
//!
//! ```text
//! #general   @bot give me the potato        starts a game
//! DM         pass the potato to @bob        hands it on
//! #general   @bot who has the potato?
//! #general   @bot potato history
//! ```
//!
//! Each running timer remembers the history length it was armed for. A timer
//! whose game has moved on by the time it fires does nothing.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use slacksoc_core::kind;
use slacksoc_core::markup::{is_direct, is_public_channel, mention_user, parse_user_mention};
use slacksoc_framework::{
    BotContext, EventContext, MessageContext, Plugin, PluginError, PluginLoadContext,
};

const PASS_PATTERN: &str = r"(?i)pass the (?:hot )?potato to (<@[^>]*>)";
const GAME_CHANNEL: &str = "random";
const SLACKBOT: &str = "USLACKBOT";

#[derive(Debug, Deserialize)]
struct PotatoConfig {
    /// Minutes each holder has to pass the potato on.
    timeout: u64,
    /// Maximum passes per distinct holder before a repeat holder is refused.
    diversity_threshold: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Holder {
    user: String,
    received: DateTime<Utc>,
    #[serde(default)]
    passed: Option<DateTime<Utc>>,
}

/// The persisted part of the game.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Game {
    history: Vec<Holder>,
    unique: usize,
}

impl Game {
    fn holder(&self) -> Option<&Holder> {
        self.history.last()
    }

    fn has_held(&self, user: &str) -> bool {
        self.history.iter().any(|h| h.user == user)
    }
}

struct Table {
    game: Game,
    timer: Option<JoinHandle<()>>,
    restored: bool,
}

impl Table {
    fn disarm(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

struct Inner {
    name: String,
    timeout: Duration,
    diversity_threshold: f64,
    table: Mutex<Table>,
}

/// See the [module documentation](self).
pub struct HotPotato;

impl HotPotato {
    pub fn load(ctx: &mut PluginLoadContext<'_>) -> Result<Box<dyn Plugin>, PluginError> {
        let config: PotatoConfig = ctx.decode(&["timeout", "diversity_threshold"])?;
        if config.timeout == 0 {
            return Err(PluginError::custom("timeout must be at least one minute"));
        }
        if config.diversity_threshold < 1.0 {
            return Err(PluginError::custom("diversity_threshold must be at least 1"));
        }
        let game: Game = ctx.state().get_as(ctx.name())?.unwrap_or_default();
        if !game.history.is_empty() {
            info!(instance = ctx.name(), passes = game.history.len(), "Restored potato game");
        }

        let pass = Regex::new(PASS_PATTERN)?;
        let inner = Arc::new(Inner {
            name: ctx.name().to_string(),
            timeout: Duration::from_secs(config.timeout * 60),
            diversity_threshold: config.diversity_threshold,
            table: Mutex::new(Table {
                game,
                timer: None,
                restored: false,
            }),
        });

        let dispatcher = ctx.dispatcher();
        let p = Arc::clone(&inner);
        dispatcher.on_addressed_match_regex(pass, move |msg: MessageContext| {
            let p = Arc::clone(&p);
            async move { p.pass(msg).await }
        });
        let p = Arc::clone(&inner);
        dispatcher.on_addressed_match(r"(?i)give me the potato[!.]?", move |msg: MessageContext| {
            let p = Arc::clone(&p);
            async move { p.give(msg).await }
        })?;
        let p = Arc::clone(&inner);
        dispatcher.on_addressed_match(
            r"(?i)who has the (?:hot )?potato[?.!]?",
            move |msg: MessageContext| {
                let p = Arc::clone(&p);
                async move { p.who(msg).await }
            },
        )?;
        let p = Arc::clone(&inner);
        dispatcher.on_addressed_match(r"(?i)potato history", move |msg: MessageContext| {
            let p = Arc::clone(&p);
            async move { p.history(msg).await }
        })?;
        let p = inner;
        dispatcher.on_event(kind::HELLO, move |ctx: Arc<EventContext>| {
            let p = Arc::clone(&p);
            async move { p.restore(ctx.bot().clone()).await }
        });

        Ok(Box::new(HotPotato))
    }
}

impl Plugin for HotPotato {
    fn describe(&self) -> &str {
        "a game where you pass the hot potato"
    }

    fn help(&self) -> &str {
        "If you get the potato, I'll DM you. Pass it to someone else before your \
         timer runs out, or you lose and get publicly shamed in #random.\n\
         In public channels:\n\
         *give me the potato* - starts a game if there's not one happening\n\
         *who has the potato* - who has it, and how long they have left\n\
         *potato history* - who has had the potato this game\n\
         In a DM:\n\
         *pass the potato to* _@username_ - passes it on if you have it"
    }
}

impl Inner {
    async fn give(self: &Arc<Self>, msg: MessageContext) -> anyhow::Result<()> {
        let mut table = self.table.lock().await;
        if !is_public_channel(msg.channel()) {
            msg.reply("why don't you ask me in a public channel?").await?;
            return Ok(());
        }
        if !table.game.history.is_empty() {
            msg.reply("There is a game running right now.").await?;
            return Ok(());
        }

        table.game = Game {
            history: vec![Holder {
                user: msg.user().to_string(),
                received: Utc::now(),
                passed: None,
            }],
            unique: 1,
        };
        self.save(msg.bot(), &table.game)?;
        self.arm(&mut table, msg.bot(), msg.user(), self.timeout);
        info!(user = %msg.user(), "Potato game started");

        msg.reply(&format!(
            "{} now has the hot potato :sweet_potato:. Let the game begin!",
            mention_user(msg.user())
        ))
        .await?;
        msg.bot()
            .direct_message(
                msg.user(),
                "You have the hot potato :sweet_potato:! Say 'pass the potato to @username' to pass!",
            )
            .await?;
        Ok(())
    }

    async fn pass(self: &Arc<Self>, msg: MessageContext) -> anyhow::Result<()> {
        let mut table = self.table.lock().await;
        if !is_direct(msg.channel()) {
            msg.react("no_entry_sign").await?;
            return Ok(());
        }
        let Some(holder) = table.game.holder() else {
            msg.reply("There's no game happening right now! You could grab the potato if you want.")
                .await?;
            return Ok(());
        };
        if holder.user != msg.user() {
            msg.reply("You don't have the potato right now!").await?;
            return Ok(());
        }

        let Some(target) = msg.capture(1).and_then(parse_user_mention).map(str::to_string) else {
            return Ok(());
        };
        let me = msg.bot().identity().map(|i| i.id.as_str());
        if target == msg.user() || target == SLACKBOT || Some(target.as_str()) == me {
            msg.reply("You can't pass the potato to them.").await?;
            return Ok(());
        }
        if table.game.has_held(&target) {
            let passes = (table.game.history.len() + 1) as f64;
            if passes / table.game.unique as f64 > self.diversity_threshold {
                msg.reply("Try sending to someone new!").await?;
                return Ok(());
            }
        } else {
            table.game.unique += 1;
        }

        let now = Utc::now();
        if let Some(last) = table.game.history.last_mut() {
            last.passed = Some(now);
        }
        table.game.history.push(Holder {
            user: target.clone(),
            received: now,
            passed: None,
        });
        self.save(msg.bot(), &table.game)?;
        self.arm(&mut table, msg.bot(), &target, self.timeout);
        info!(from = %msg.user(), to = %target, "Potato passed");

        let bot = msg.bot();
        bot.direct_message(
            &target,
            &format!(
                "{} passed you the hot potato :sweet_potato:! You can pass it by replying \
                 to this DM: 'pass the potato to @username'",
                mention_user(msg.user())
            ),
        )
        .await?;
        bot.direct_message(
            msg.user(),
            &format!("Passed the potato to {} :sweet_potato:", mention_user(&target)),
        )
        .await?;
        announce(
            bot,
            &format!(
                "{} passed the potato to {} :sweet_potato:",
                mention_user(msg.user()),
                mention_user(&target)
            ),
        )
        .await?;
        Ok(())
    }

    async fn who(self: &Arc<Self>, msg: MessageContext) -> anyhow::Result<()> {
        let table = self.table.lock().await;
        let Some(holder) = table.game.holder() else {
            msg.reply("There's no game happening right now.").await?;
            return Ok(());
        };

        let deadline = self.deadline(holder);
        let text = format!(
            "{} got the hot potato at {}. They have until {} to pass it. \
             The potato has been passed {} times.",
            mention_user(&holder.user),
            holder.received.format("%-I:%M %p"),
            deadline.format("%-I:%M %p"),
            table.game.history.len()
        );
        msg.reply(&text).await?;
        Ok(())
    }

    async fn history(self: &Arc<Self>, msg: MessageContext) -> anyhow::Result<()> {
        let table = self.table.lock().await;
        if table.game.history.is_empty() {
            msg.reply("There's no game happening right now.").await?;
            return Ok(());
        }

        let bot = msg.bot();
        let mut text = bot
            .identity()
            .map(|i| i.name.clone())
            .unwrap_or_default();
        for holder in &table.game.history {
            let name = bot
                .directory()
                .user_by_id(&holder.user)
                .map_or_else(|| holder.user.clone(), |u| u.name);
            text.push_str(" - ");
            text.push_str(&name);
        }
        msg.reply(&text).await?;
        Ok(())
    }

    /// Re-arms the timer of a game restored from state, once per process.
    async fn restore(self: &Arc<Self>, bot: Arc<BotContext>) -> anyhow::Result<()> {
        let mut table = self.table.lock().await;
        if table.restored {
            return Ok(());
        }
        table.restored = true;

        let Some(holder) = table.game.holder().cloned() else {
            return Ok(());
        };
        let deadline = self.deadline(&holder);
        let remaining = (deadline - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        info!(holder = %holder.user, remaining_secs = remaining.as_secs(), "Resuming potato game");

        if remaining.is_zero() {
            bot.direct_message(
                &holder.user,
                "Sorry, it looks like I crashed in the middle of your game. The game has \
                 ended, but you can start a new one if you'd like.",
            )
            .await?;
        }
        self.arm(&mut table, &bot, &holder.user, remaining);
        Ok(())
    }

    /// Replaces the running timer with one that ends the game for `user`.
    fn arm(self: &Arc<Self>, table: &mut Table, bot: &Arc<BotContext>, user: &str, after: Duration) {
        table.disarm();
        let generation = table.game.history.len();
        let this = Arc::clone(self);
        let bot = Arc::clone(bot);
        let user = user.to_string();
        table.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(after).await;
            if let Err(e) = this.game_over(&bot, &user, generation).await {
                warn!(error = %e, "Failed to end potato game");
            }
        }));
    }

    async fn game_over(&self, bot: &BotContext, user: &str, generation: usize) -> anyhow::Result<()> {
        let mut table = self.table.lock().await;
        if table.game.history.len() != generation {
            return Ok(());
        }
        table.timer = None;
        table.game = Game::default();
        self.save(bot, &table.game)?;
        info!(user, passes = generation, "Potato game over");

        bot.direct_message(user, "Uh oh, you ran out of time. Game Over!")
            .await?;
        announce(
            bot,
            &format!(
                "The game of hot potato ended with {} after {} passes.",
                mention_user(user),
                generation
            ),
        )
        .await?;
        Ok(())
    }

    fn deadline(&self, holder: &Holder) -> DateTime<Utc> {
        holder.received + TimeDelta::seconds(self.timeout.as_secs() as i64)
    }

    fn save(&self, bot: &BotContext, game: &Game) -> anyhow::Result<()> {
        bot.state().update_from(&self.name, game)?;
        Ok(())
    }
}

/// Posts in the game channel, if the directory knows it.
async fn announce(bot: &BotContext, text: &str) -> anyhow::Result<()> {
    match bot.directory().channel_by_name(GAME_CHANNEL) {
        Some(channel) => bot.send(&channel.id, text).await?,
        None => warn!(channel = GAME_CHANNEL, "Game channel not found, skipping announcement"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use slacksoc_core::{Event, HelloEvent, Identity, Outgoing};
    use slacksoc_framework::StateTable;

    use super::*;
    use crate::testing::Harness;

    fn config() -> Value {
        json!({"timeout": 1, "diversity_threshold": 1.2})
    }

    async fn harness() -> Harness {
        Harness::new("HotPotato", config(), HotPotato::load)
            .await
            .unwrap()
    }

    fn dms(sent: &[Outgoing], to: &str) -> Vec<String> {
        sent.iter()
            .filter_map(|out| match out {
                Outgoing::DirectMessage { user, text } if user == to => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    fn posts(sent: &[Outgoing], channel: &str) -> Vec<String> {
        sent.iter()
            .filter_map(|out| match out {
                Outgoing::Message { channel: c, text } if c == channel => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    fn saved_game(h: &Harness) -> Option<Game> {
        h.bot.state().get_as("HotPotato").unwrap()
    }

    fn hello() -> Event {
        Event::Hello(HelloEvent {
            identity: Identity {
                id: "B1".into(),
                name: "bot".into(),
            },
            team: Default::default(),
            users: Vec::new(),
            channels: Vec::new(),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_give_and_pass() {
        let mut h = harness().await;

        h.say("C1", "U1", "bot: give me the potato!").await;
        let sent = h.sent();
        assert_eq!(
            posts(&sent, "C1"),
            ["<@U1> now has the hot potato :sweet_potato:. Let the game begin!"]
        );
        assert_eq!(dms(&sent, "U1").len(), 1);
        assert_eq!(saved_game(&h).unwrap().history.len(), 1);

        h.say("C1", "U1", "bot: give me the potato").await;
        assert_eq!(posts(&h.sent(), "C1"), ["There is a game running right now."]);

        h.say("D1", "U1", "pass the potato to <@U2>").await;
        let sent = h.sent();
        assert_eq!(dms(&sent, "U2").len(), 1);
        assert_eq!(dms(&sent, "U1"), ["Passed the potato to <@U2> :sweet_potato:"]);
        assert_eq!(posts(&sent, "C2"), ["<@U1> passed the potato to <@U2> :sweet_potato:"]);

        let game = saved_game(&h).unwrap();
        assert_eq!(game.unique, 2);
        assert_eq!(game.holder().map(|g| g.user.as_str()), Some("U2"));
        assert!(game.history[0].passed.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pass_rules() {
        let mut h = harness().await;

        h.say("D1", "U1", "pass the potato to <@U2>").await;
        assert_eq!(
            posts(&h.sent(), "D1"),
            ["There's no game happening right now! You could grab the potato if you want."]
        );

        h.say("C1", "U1", "bot: give me the potato").await;
        h.sent();

        // Only in DMs.
        h.say("C1", "U1", "bot: pass the potato to <@U2>").await;
        let sent = h.sent();
        assert!(matches!(sent.as_slice(), [Outgoing::Reaction { .. }]));

        h.say("D2", "U2", "pass the potato to <@U3>").await;
        assert_eq!(posts(&h.sent(), "D2"), ["You don't have the potato right now!"]);

        for target in ["<@U1>", "<@B1>", "<@USLACKBOT>"] {
            h.say("D1", "U1", &format!("pass the potato to {target}")).await;
            assert_eq!(posts(&h.sent(), "D1"), ["You can't pass the potato to them."]);
        }

        // An empty mention names nobody.
        h.say("D1", "U1", "pass the potato to <@>").await;
        assert!(h.sent().is_empty());

        // U1 -> U2 -> U1 would make 3 passes over 2 holders, above 1.2.
        h.say("D1", "U1", "pass the hot potato to <@U2|bob>").await;
        h.sent();
        h.say("D2", "U2", "pass the potato to <@U1>").await;
        assert_eq!(posts(&h.sent(), "D2"), ["Try sending to someone new!"]);
        assert_eq!(saved_game(&h).unwrap().history.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_give_requires_public_channel() {
        let mut h = harness().await;
        h.say("D1", "U1", "give me the potato").await;
        assert_eq!(
            posts(&h.sent(), "D1"),
            ["why don't you ask me in a public channel?"]
        );
        assert!(saved_game(&h).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_ends_game() {
        let mut h = harness().await;
        h.say("C1", "U1", "bot: give me the potato").await;
        h.say("D1", "U1", "pass the potato to <@U2>").await;
        h.sent();

        // The first holder's timer was replaced; only U2's fires.
        tokio::time::sleep(Duration::from_secs(61)).await;
        let sent = h.sent();
        assert_eq!(dms(&sent, "U2"), ["Uh oh, you ran out of time. Game Over!"]);
        assert!(dms(&sent, "U1").is_empty());
        assert_eq!(
            posts(&sent, "C2"),
            ["The game of hot potato ended with <@U2> after 2 passes."]
        );
        assert_eq!(saved_game(&h).unwrap(), Game::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_who_and_history() {
        let mut h = harness().await;
        h.say("C1", "U1", "bot: who has the potato?").await;
        assert_eq!(posts(&h.sent(), "C1"), ["There's no game happening right now."]);

        h.say("C1", "U1", "bot: give me the potato").await;
        h.say("D1", "U1", "pass the potato to <@U3>").await;
        h.sent();

        h.say("C1", "U1", "bot: who has the hot potato").await;
        let who = posts(&h.sent(), "C1");
        assert_eq!(who.len(), 1);
        assert!(who[0].starts_with("<@U3> got the hot potato at "));
        assert!(who[0].ends_with("The potato has been passed 2 times."));

        h.say("C1", "U1", "bot: potato history").await;
        assert_eq!(posts(&h.sent(), "C1"), ["bot - alice - carol"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restore_on_hello() {
        let expired = Game {
            history: vec![Holder {
                user: "U2".into(),
                received: Utc::now() - chrono::Duration::hours(1),
                passed: None,
            }],
            unique: 1,
        };
        let state = StateTable::from([(
            "HotPotato".to_string(),
            serde_json::to_value(&expired).unwrap(),
        )]);
        let mut h = Harness::with_state("HotPotato", config(), state, HotPotato::load)
            .await
            .unwrap();

        h.dispatch(hello()).await;
        // Let the zero-length timer run.
        tokio::time::sleep(Duration::from_millis(1)).await;

        let sent = h.sent();
        let to_holder = dms(&sent, "U2");
        assert_eq!(to_holder.len(), 2);
        assert!(to_holder[0].starts_with("Sorry, it looks like I crashed"));
        assert_eq!(to_holder[1], "Uh oh, you ran out of time. Game Over!");
        assert_eq!(saved_game(&h).unwrap(), Game::default());

        // A reconnect does not restore again.
        h.dispatch(hello()).await;
        assert!(h.sent().is_empty());
    }

    #[tokio::test]
    async fn test_config_validation() {
        let missing = Harness::new("HotPotato", json!({"timeout": 5}), HotPotato::load).await;
        assert!(
            matches!(missing, Err(PluginError::MissingKey(key)) if key == "diversity_threshold")
        );

        let zero = Harness::new(
            "HotPotato",
            json!({"timeout": 0, "diversity_threshold": 2.0}),
            HotPotato::load,
        )
        .await;
        assert!(matches!(zero, Err(PluginError::Custom(_))));
    }
}
