//! Tone stream sender - CLI binary.
//!
//! Generates a PCM sine tone and transmits it as sequenced UDP datagrams
//! until interrupted.

use std::net::{IpAddr, SocketAddr};

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use sender::{stream_tone, ToneSender, ToneSettings};
use tone_stream_common::{
    init_tracing, LoggingArgs, MetricsContext, MetricsServerConfig, ShutdownFlag,
};

/// Tone Stream Sender - Stream a PCM sine tone over UDP
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    // ---
    /// Destination IP address
    #[arg(long)]
    ip: IpAddr,

    /// Destination UDP port
    #[arg(long)]
    port: u16,

    /// Tone frequency in Hz
    #[arg(long, default_value = "1000")]
    freq: f64,

    /// Amplitude as fraction of full scale (clamped to 0.0-1.0)
    #[arg(long, default_value = "0.8", allow_negative_numbers = true)]
    amplitude: f64,

    /// PCM sample rate
    #[arg(long, default_value = "44100", allow_negative_numbers = true)]
    sample_rate: i64,

    /// Channel count; the tone is duplicated on every channel
    #[arg(long, default_value = "1", allow_negative_numbers = true)]
    channels: i64,

    /// Packet duration in milliseconds
    #[arg(long, default_value = "20", allow_negative_numbers = true)]
    packet_ms: f64,

    /// Prometheus metrics bind address (serves `GET /metrics`); disabled when omitted.
    #[arg(long)]
    metrics_bind: Option<SocketAddr>,

    #[command(flatten)]
    logging: LoggingArgs,
}

/// Capture version number from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    let args = Args::parse();
    init_tracing(args.logging.tracing_config(None))?;

    let settings = ToneSettings::new(
        SocketAddr::new(args.ip, args.port),
        args.freq,
        args.amplitude,
        args.sample_rate,
        args.channels,
        args.packet_ms,
    )
    .inspect_err(|e| error!("{e}"))?;

    info!("Starting tone sender v{VERSION}");
    info!(
        "Destination {} | {:.1} Hz at amplitude {:.2} | {} Hz x{} | {:.1} ms packets ({} byte payload)",
        settings.destination,
        settings.frequency_hz,
        settings.amplitude,
        settings.format.sample_rate,
        settings.format.channels,
        settings.packet_ms,
        settings.payload_len()
    );

    let metrics = MetricsContext::new("sender")?;
    if let Some(bind) = args.metrics_bind {
        info!("Metrics bind: {}", bind);
        let _metrics_task = metrics.spawn_metrics_server(MetricsServerConfig::new(bind));
    }

    let shutdown = ShutdownFlag::new();
    let _signal_task = shutdown.trigger_on_ctrl_c();

    let mut sender = ToneSender::new(settings.destination, settings.datagram_len())?;

    let summary = stream_tone(&mut sender, &settings, &metrics, &shutdown).await?;
    info!(
        "Transmission complete: {} packets, {} bytes",
        summary.packets_sent, summary.bytes_sent
    );

    Ok(())
}
