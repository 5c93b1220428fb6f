//! Tracing initialization.
//!
//! Centralizes tracing config so both binaries behave the same.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::ColorWhen;

/// Subscriber settings gathered from the command line.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    // ---
    /// Level used when `RUST_LOG` is not set
    pub level: String,

    pub color: ColorWhen,

    /// Optional file receiving a plain-text copy of every log line
    pub log_file: Option<PathBuf>,
}

/// Initialize tracing subscriber.
///
/// - Respects `RUST_LOG` via `EnvFilter`, falling back to `config.level`.
/// - Unknown level names fall back to `info`.
/// - ANSI color on stderr controlled by `ColorWhen`; the file copy is never colored.
///
/// # Errors
///
/// Returns error if the log file cannot be opened or a global subscriber
/// is already installed.
pub fn init_tracing(config: TracingConfig) -> Result<()> {
    // ---
    let fallback = config.level.parse::<LevelFilter>().ok();
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::default().add_directive(fallback.unwrap_or(LevelFilter::INFO).into())
    });

    let file_layer = match &config.log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file: {}", path.display()))?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_ansi(config.color.should_color_stderr())
                .with_writer(std::io::stderr),
        )
        .with(file_layer)
        .try_init()
        .context("failed to install tracing subscriber")?;

    if fallback.is_none() {
        ::tracing::warn!("Unknown log level {:?}, using info", config.level);
    }

    Ok(())
}
