//! slacksoc command line runner.
//!
//! Reads events as JSON lines (one object with a `type` field per line) and
//! writes every outbound action as a JSON line on stdout:
//!
//! ```bash
//! slacksoc --config slacksoc.yaml --events session.jsonl
//! tail -f events.jsonl | slacksoc --config slacksoc.yaml --profile dev
//! ```
//!
//! Logs go to stderr unless the config sends them to a file.

mod events;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufReader, Stdout};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;
use tracing::info;

use slacksoc_core::{OutboxBot, Outgoing};
use slacksoc_framework::PluginRegistry;
use slacksoc_runtime::{ConfigLoader, LogOutput, Runtime, logging, wait_for_signal};

#[derive(Debug, Parser)]
#[command(name = "slacksoc", version, about = "Run a slacksoc bot")]
struct Args {
    /// Configuration file (YAML or TOML).
    #[arg(short, long)]
    config: PathBuf,

    /// JSON-lines event file. Reads stdin when omitted.
    #[arg(short, long)]
    events: Option<PathBuf>,

    /// Configuration profile, overriding SLACKSOC_PROFILE.
    #[arg(short, long)]
    profile: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut loader = ConfigLoader::new().file(&args.config);
    if let Some(profile) = &args.profile {
        loader = loader.profile(profile.clone());
    }
    let config = loader
        .load()
        .with_context(|| format!("failed to load {}", args.config.display()))?;

    // Stdout carries the outbound actions.
    let mut log_config = config.logging.clone();
    if log_config.output == LogOutput::Stdout {
        log_config.output = LogOutput::Stderr;
    }
    logging::init_from_config(&log_config);

    let mut registry = PluginRegistry::new();
    slacksoc_plugins::register(&mut registry);

    let (bot, outbox) = OutboxBot::new();
    let runtime = Runtime::builder(config)
        .registry(registry)
        .bot(Arc::new(bot))
        .build()
        .await?;
    info!(plugins = ?runtime.plugin_names().collect::<Vec<_>>(), "Bot ready");

    let done = CancellationToken::new();
    let printer = tokio::spawn(print_outgoing(outbox, done.clone()));

    let shutdown = runtime.shutdown_token();
    tokio::spawn(async move {
        wait_for_signal().await;
        shutdown.cancel();
    });

    match &args.events {
        Some(path) => {
            let file = File::open(path)
                .await
                .with_context(|| format!("failed to open {}", path.display()))?;
            runtime.run(events::event_stream(BufReader::new(file))).await;
            done.cancel();
            printer.await??;
            Ok(())
        }
        None => {
            runtime
                .run(events::event_stream(BufReader::new(tokio::io::stdin())))
                .await;
            done.cancel();
            printer.await??;
            // A stdin read blocks a runtime thread until the next line, so
            // dropping the runtime after a signal would hang.
            std::process::exit(0);
        }
    }
}

/// Prints actions until `done` fires, then prints whatever is still queued.
///
/// Timer tasks may keep the bot alive, so the outbox closing cannot be used
/// as the end signal.
async fn print_outgoing(mut outbox: UnboundedReceiver<Outgoing>, done: CancellationToken) -> Result<()> {
    let mut stdout = tokio::io::stdout();
    loop {
        tokio::select! {
            biased;
            action = outbox.recv() => match action {
                Some(action) => write_action(&mut stdout, &action).await?,
                None => return Ok(()),
            },
            _ = done.cancelled() => break,
        }
    }
    while let Ok(action) = outbox.try_recv() {
        write_action(&mut stdout, &action).await?;
    }
    Ok(())
}

async fn write_action(stdout: &mut Stdout, action: &Outgoing) -> Result<()> {
    let mut line = serde_json::to_vec(action)?;
    line.push(b'\n');
    stdout.write_all(&line).await?;
    stdout.flush().await?;
    Ok(())
}
