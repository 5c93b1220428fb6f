//! Prometheus metrics (Rust `prometheus` crate).
//!
//! One `MetricsContext` is intended per process. Each binary owns its registry
//! and only touches the metrics relevant to its end of the stream.

use anyhow::Result;
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server, StatusCode};
use prometheus::{Encoder, IntCounter, IntGauge, Opts, Registry, TextEncoder};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Configuration for the built-in Prometheus scrape endpoint.
#[derive(Debug, Clone)]
pub struct MetricsServerConfig {
    // ---
    /// Address to bind, e.g. `127.0.0.1:9100`.
    pub bind: SocketAddr,
}

impl MetricsServerConfig {
    // ---
    pub fn new(bind: SocketAddr) -> Self {
        // ---
        Self { bind }
    }
}

/// Prometheus metrics registry + handles.
///
/// Hot-path instrumentation is plain counter increments. The render path
/// never touches these; playback counters are folded in by the reporter.
#[derive(Clone)]
pub struct MetricsContext {
    // ---
    registry: Registry,

    // Sender
    pub packets_sent_total: IntCounter,
    pub bytes_sent_total: IntCounter,
    pub short_sends_total: IntCounter,

    // Receiver network
    pub packets_received_total: IntCounter,
    pub packets_lost_total: IntCounter,
    pub bytes_received_total: IntCounter,
    pub undersized_packets_total: IntCounter,

    // Receiver playback
    pub backpressure_drops_total: IntCounter,
    pub playback_underflows_total: IntCounter,
    pub jitter_queue_max_depth_chunks: IntGauge,
}

fn counter(name: &str, help: &str) -> Result<IntCounter> {
    // ---
    Ok(IntCounter::with_opts(Opts::new(name, help))?)
}

impl MetricsContext {
    // ---
    /// Create a new registry and register the standard metrics.
    ///
    /// `process_name` is applied as a constant label (`process=<name>`).
    pub fn new(process_name: &str) -> Result<Self> {
        // ---
        let registry = Registry::new_custom(
            Some("tone_stream".into()),
            Some(prometheus::labels! { "process".to_string() => process_name.to_string() }),
        )?;

        let packets_sent_total = counter("packets_sent_total", "Total tone packets sent")?;
        let bytes_sent_total = counter("bytes_sent_total", "Total datagram bytes sent")?;
        let short_sends_total = counter(
            "short_sends_total",
            "Sends that wrote fewer bytes than requested",
        )?;

        let packets_received_total =
            counter("packets_received_total", "Total well-formed packets received")?;
        let packets_lost_total = counter(
            "packets_lost_total",
            "Packets counted as lost from sequence gaps",
        )?;
        let bytes_received_total =
            counter("bytes_received_total", "Total PCM payload bytes received")?;
        let undersized_packets_total = counter(
            "undersized_packets_total",
            "Datagrams rejected for being no longer than the header",
        )?;

        let backpressure_drops_total = counter(
            "backpressure_drops_total",
            "Audio chunks dropped because the jitter queue stayed full",
        )?;
        let playback_underflows_total = counter(
            "playback_underflows_total",
            "Render callbacks padded with silence",
        )?;
        let jitter_queue_max_depth_chunks = IntGauge::with_opts(Opts::new(
            "jitter_queue_max_depth_chunks",
            "Maximum jitter queue depth seen during the last report window",
        ))?;

        registry.register(Box::new(packets_sent_total.clone()))?;
        registry.register(Box::new(bytes_sent_total.clone()))?;
        registry.register(Box::new(short_sends_total.clone()))?;
        registry.register(Box::new(packets_received_total.clone()))?;
        registry.register(Box::new(packets_lost_total.clone()))?;
        registry.register(Box::new(bytes_received_total.clone()))?;
        registry.register(Box::new(undersized_packets_total.clone()))?;
        registry.register(Box::new(backpressure_drops_total.clone()))?;
        registry.register(Box::new(playback_underflows_total.clone()))?;
        registry.register(Box::new(jitter_queue_max_depth_chunks.clone()))?;

        Ok(Self {
            registry,
            packets_sent_total,
            bytes_sent_total,
            short_sends_total,
            packets_received_total,
            packets_lost_total,
            bytes_received_total,
            undersized_packets_total,
            backpressure_drops_total,
            playback_underflows_total,
            jitter_queue_max_depth_chunks,
        })
    }

    /// Gather metric families from this registry.
    pub fn gather(&self) -> Vec<prometheus::proto::MetricFamily> {
        // ---
        self.registry.gather()
    }

    /// Spawns a minimal HTTP server that serves `GET /metrics`.
    ///
    /// Callers decide whether to run it; both binaries only do so when
    /// `--metrics-bind` is given.
    pub fn spawn_metrics_server(&self, cfg: MetricsServerConfig) -> JoinHandle<Result<()>> {
        // ---
        let registry = Arc::new(self.registry.clone());
        tokio::spawn(async move {
            // ---
            let make_svc = make_service_fn(move |_conn| {
                let registry = Arc::clone(&registry);
                async move {
                    Ok::<_, hyper::Error>(service_fn(move |req| {
                        let registry = Arc::clone(&registry);
                        async move { handle_metrics_request(req, registry).await }
                    }))
                }
            });

            Server::try_bind(&cfg.bind)?.serve(make_svc).await?;
            Ok(())
        })
    }
}

async fn handle_metrics_request(
    req: Request<Body>,
    registry: Arc<Registry>,
) -> Result<Response<Body>, hyper::Error> {
    match (req.method(), req.uri().path()) {
        (&Method::GET, "/metrics") => {
            let mut buffer = Vec::new();

            if let Err(e) = TextEncoder::new().encode(&registry.gather(), &mut buffer) {
                let mut resp = Response::new(Body::from(format!("encode error: {e}")));
                *resp.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                return Ok(resp);
            }

            let mut resp = Response::new(Body::from(buffer));
            resp.headers_mut().insert(
                hyper::header::CONTENT_TYPE,
                hyper::header::HeaderValue::from_static("text/plain; version=0.0.4"),
            );
            Ok(resp)
        }
        _ => {
            let mut resp = Response::new(Body::from("not found"));
            *resp.status_mut() = StatusCode::NOT_FOUND;
            Ok(resp)
        }
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_counters_are_registered() {
        // ---
        let ctx = MetricsContext::new("test").expect("MetricsContext should init");
        ctx.packets_lost_total.inc_by(3);

        let families = ctx.gather();
        let lost = families
            .iter()
            .find(|f| f.get_name() == "tone_stream_packets_lost_total")
            .expect("lost counter missing");
        assert_eq!(lost.get_metric()[0].get_counter().get_value(), 3.0);
    }

    #[test]
    fn test_contexts_are_independent() {
        // ---
        let a = MetricsContext::new("a").unwrap();
        let b = MetricsContext::new("b").unwrap();
        a.packets_sent_total.inc();

        assert_eq!(a.packets_sent_total.get(), 1);
        assert_eq!(b.packets_sent_total.get(), 0);
    }
}
