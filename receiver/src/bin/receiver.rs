//! Tone stream receiver - CLI binary.
//!
//! Receives tone packets via UDP, reports transport statistics and plays
//! the stream through the system audio device.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use receiver::config::{AUDIO_TEARDOWN, RECEIVE_TIMEOUT};
use receiver::{
    receive_loop, DeviceSelector, PlaybackMode, ReceiveSession, ReceiverSettings, ToneReceiver,
    WavCapture,
};
use tone_stream_common::{
    init_tracing, LoggingArgs, MetricsContext, MetricsServerConfig, ShutdownFlag,
};

/// Tone Stream Receiver - Receive, play and measure a UDP tone stream
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    // ---
    /// UDP port to bind
    #[arg(long, default_value = "50005")]
    listen_port: u16,

    /// Expected sample rate
    #[arg(long, default_value = "44100", allow_negative_numbers = true)]
    sample_rate: i64,

    /// Channel count (mono=1)
    #[arg(long, default_value = "1", allow_negative_numbers = true)]
    channels: i64,

    /// Jitter buffer depth in milliseconds
    #[arg(long, default_value = "60", allow_negative_numbers = true)]
    jitter_buffer_ms: f64,

    /// Playback device, by index or name
    #[arg(long)]
    device: Option<DeviceSelector>,

    /// Disable audio playback (stats only)
    #[arg(long)]
    no_audio: bool,

    /// Optional WAV output path
    #[arg(long)]
    save_wav: Option<PathBuf>,

    /// Optional log file path
    #[arg(long)]
    log_file: Option<PathBuf>,

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
    init_tracing(args.logging.tracing_config(args.log_file.clone()))?;

    let settings = ReceiverSettings::new(
        args.listen_port,
        args.sample_rate,
        args.channels,
        args.jitter_buffer_ms,
    )
    .inspect_err(|e| error!("{e}"))?;

    info!("Starting tone receiver v{VERSION}");
    info!(
        "{} Hz x{} | jitter buffer {:.1} ms ({} samples)",
        settings.format.sample_rate,
        settings.format.channels,
        settings.buffer_depth_ms(),
        settings.jitter_buffer_samples
    );

    let metrics = MetricsContext::new("receiver")?;
    if let Some(bind) = args.metrics_bind {
        info!("Metrics bind: {}", bind);
        let _metrics_task = metrics.spawn_metrics_server(MetricsServerConfig::new(bind));
    }

    // The user asked for a capture, so failing to create it is fatal
    let capture = match &args.save_wav {
        Some(path) => Some(
            WavCapture::create(path, settings.format).inspect_err(|e| error!("{e:#}"))?,
        ),
        None => None,
    };

    let mut receiver = ToneReceiver::bind(
        settings.listen_port,
        settings.max_datagram_len(),
        RECEIVE_TIMEOUT,
    )?;

    let playback = PlaybackMode::resolve(&settings, args.no_audio, args.device.as_ref());
    let mut session =
        ReceiveSession::new(&settings, playback.buffer(), playback.counters(), capture);

    let shutdown = ShutdownFlag::new();
    let _signal_task = shutdown.trigger_on_ctrl_c();

    info!("Ready to receive audio...");
    let outcome = receive_loop(&mut receiver, &mut session, &metrics, &shutdown).await;

    info!("Stopping receiver");
    playback.shutdown(AUDIO_TEARDOWN);
    let finished = session.finish();

    let (packets, bytes, undersized) = receiver.stats();
    info!(
        "Socket totals: {} datagrams, {} bytes, {} undersized",
        packets, bytes, undersized
    );
    drop(receiver);

    outcome?;
    finished
}
