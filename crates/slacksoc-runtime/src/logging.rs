//! Logging setup on `tracing` and `tracing-subscriber`, driven by the
//! `logging` section of the configuration:
//!
//! ```rust,ignore
//! let config = ConfigLoader::new().load()?;
//! slacksoc_runtime::logging::init_from_config(&config.logging);
//! ```
//!
//! `RUST_LOG`, when set, replaces the configured base level. The per-module
//! `filters` are added on top of either.

use std::ffi::OsStr;
use std::path::Path;

use tracing::warn;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{LogFormat, LogOutput, LoggingConfig, SpanEventConfig};

/// Initializes logging from `config`.
///
/// Does nothing if a global subscriber is already installed.
pub fn init_from_config(config: &LoggingConfig) {
    let _ = try_init_from_config(config);
}

/// Installs the subscriber described by `config`, failing if one is already
/// set.
pub fn try_init_from_config(config: &LoggingConfig) -> Result<(), TryInitError> {
    let filter = env_filter(config);
    let spans = fmt_span(&config.span_events);

    macro_rules! configure_layer {
        ($layer:expr) => {
            $layer
                .with_span_events(spans.clone())
                .with_thread_ids(config.thread_ids)
                .with_file(config.file_location)
                .with_line_number(config.file_location)
        };
    }

    macro_rules! init_with_writer {
        ($writer:expr) => {
            match config.format {
                #[cfg(feature = "json-log")]
                LogFormat::Json => {
                    let layer = fmt::layer()
                        .json()
                        .with_span_events(spans.clone())
                        .with_writer($writer);
                    tracing_subscriber::registry().with(layer).with(filter).try_init()
                }
                LogFormat::Compact => {
                    let layer = configure_layer!(fmt::layer().compact().with_writer($writer));
                    tracing_subscriber::registry().with(layer).with(filter).try_init()
                }
                LogFormat::Full => {
                    let layer = configure_layer!(fmt::layer().with_writer($writer));
                    tracing_subscriber::registry().with(layer).with(filter).try_init()
                }
                LogFormat::Pretty => {
                    let layer = configure_layer!(fmt::layer().pretty().with_writer($writer));
                    tracing_subscriber::registry().with(layer).with(filter).try_init()
                }
            }
        };
    }

    match (config.output, config.file_path.as_deref()) {
        (LogOutput::Stdout, _) => init_with_writer!(std::io::stdout),
        (LogOutput::Stderr, _) => init_with_writer!(std::io::stderr),
        (LogOutput::File, Some(path)) => {
            let appender = tracing_appender::rolling::never(
                path.parent().unwrap_or_else(|| Path::new(".")),
                path.file_name().unwrap_or_else(|| OsStr::new("slacksoc.log")),
            );
            init_with_writer!(appender)
        }
        (LogOutput::File, None) => {
            let result = init_with_writer!(std::io::stderr);
            warn!("Log output is 'file' but no file_path is set, logging to stderr");
            result
        }
    }
}

/// The configured span events. Every dispatch runs inside a `dispatch` span,
/// so `new` plus `close` logs one line when an event starts and one when it
/// is done.
fn fmt_span(config: &SpanEventConfig) -> FmtSpan {
    [
        (config.new, FmtSpan::NEW),
        (config.enter, FmtSpan::ENTER),
        (config.exit, FmtSpan::EXIT),
        (config.close, FmtSpan::CLOSE),
    ]
    .into_iter()
    .filter(|(enabled, _)| *enabled)
    .fold(FmtSpan::NONE, |acc, (_, span)| acc | span)
}

/// `module=level` directives for the configured filters, sorted by module.
fn filter_directives(config: &LoggingConfig) -> Vec<String> {
    let mut filters: Vec<_> = config.filters.iter().collect();
    filters.sort_by(|a, b| a.0.cmp(b.0));
    filters
        .into_iter()
        .map(|(module, level)| format!("{module}={}", level.as_str()))
        .collect()
}

fn env_filter(config: &LoggingConfig) -> EnvFilter {
    let mut filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));

    for directive in filter_directives(config) {
        match directive.parse() {
            Ok(d) => filter = filter.add_directive(d),
            Err(e) => eprintln!("Ignoring invalid log filter '{directive}': {e}"),
        }
    }

    filter
}
