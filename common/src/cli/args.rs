//! Shared logging flags.

use clap::{Args, ValueEnum};

use super::ColorWhen;
use crate::observability::TracingConfig;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorArg {
    Auto,
    Always,
    Never,
}

impl From<ColorArg> for ColorWhen {
    fn from(v: ColorArg) -> Self {
        match v {
            ColorArg::Auto => ColorWhen::Auto,
            ColorArg::Always => ColorWhen::Always,
            ColorArg::Never => ColorWhen::Never,
        }
    }
}

/// Verbosity and colour flags common to sender and receiver.
#[derive(Args, Debug, Clone)]
pub struct LoggingArgs {
    // ---
    /// Log level filter (trace, debug, info, warn, error). `RUST_LOG` overrides it.
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Coloring
    #[arg(long, value_enum, default_value = "auto")]
    pub color: ColorArg,
}

impl LoggingArgs {
    // ---
    /// Builds a tracing configuration, optionally mirroring output to a file.
    pub fn tracing_config(&self, log_file: Option<std::path::PathBuf>) -> TracingConfig {
        // ---
        TracingConfig {
            level: self.log_level.clone(),
            color: self.color.into(),
            log_file,
        }
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use clap::Parser;

    #[derive(Parser, Debug)]
    struct Harness {
        #[command(flatten)]
        logging: LoggingArgs,
    }

    #[test]
    fn test_defaults() {
        // ---
        let h = Harness::parse_from(["test"]);
        assert_eq!(h.logging.log_level, "info");
        assert_eq!(h.logging.color, ColorArg::Auto);
    }

    #[test]
    fn test_overrides() {
        // ---
        let h = Harness::parse_from(["test", "--log-level", "debug", "--color", "never"]);
        let cfg = h.logging.tracing_config(None);

        assert_eq!(cfg.level, "debug");
        assert_eq!(cfg.color, ColorWhen::Never);
        assert!(cfg.log_file.is_none());
    }
}
