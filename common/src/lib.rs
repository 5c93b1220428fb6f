//! Shared building blocks for the tone stream sender and receiver.
//!
//! Holds the wire packet codec, stream format arithmetic, error types,
//! the cooperative shutdown flag and the observability setup used by both
//! binaries.

pub mod cli;
pub mod error;
pub mod format;
pub mod observability;
pub mod packet;
pub mod shutdown;

pub use cli::{ColorWhen, LoggingArgs};
pub use error::{ConfigError, FormatError};
pub use format::StreamFormat;
pub use observability::{init_tracing, MetricsContext, MetricsServerConfig, TracingConfig};
pub use packet::{PacketHeader, HEADER_LEN, MAX_DATAGRAM_LEN};
pub use shutdown::ShutdownFlag;
