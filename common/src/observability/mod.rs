//! Observability utilities (metrics + tracing).

mod metrics;
mod tracing;

pub use metrics::{MetricsContext, MetricsServerConfig};
pub use tracing::{init_tracing, TracingConfig};
