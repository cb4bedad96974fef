//! Prometheus metrics HTTP server.
//!
//! Uses the built-in HTTP listener from `metrics-exporter-prometheus`
//! to expose a Prometheus scrape endpoint at `/metrics`.

use std::net::SocketAddr;

use anyhow::Result;
use metrics_exporter_prometheus::PrometheusBuilder;

use netpulse_core::config::MetricsConfig;

/// Install the global metrics recorder and start the HTTP listener.
///
/// Must be called at most once per process. After this, all
/// `metrics::counter!()` / `metrics::gauge!()` macros record to the
/// Prometheus exposition format.
///
/// # Errors
///
/// - The listen address is invalid or the socket cannot be bound
/// - A global recorder is already installed
pub fn install_metrics_recorder(config: &MetricsConfig) -> Result<()> {
    let addr: SocketAddr = config
        .bind
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid metrics bind address '{}': {}", config.bind, e))?;

    if addr.ip().is_unspecified() {
        tracing::warn!(
            bind = %addr,
            "metrics endpoint is exposed on all interfaces; restrict bind in untrusted networks"
        );
    }

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("failed to install metrics recorder: {}", e))?;

    // Register metric descriptions
    netpulse_core::metrics::describe_all();

    tracing::info!(bind = %addr, "Prometheus metrics endpoint active");
    Ok(())
}
