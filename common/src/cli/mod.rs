//! CLI-related shared utilities.
//!
//! Both binaries flatten [`LoggingArgs`] into their parsers so verbosity and
//! colour behave identically on each end of the stream.

mod args;
mod color;

pub use args::{ColorArg, LoggingArgs};
pub use color::ColorWhen;
