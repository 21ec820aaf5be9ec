//! Scan metrics.
//!
//! Recorded through the `metrics` facade; nothing is exported unless
//! [`init_metrics`] installs the Prometheus recorder.

use crate::constants::DEFAULT_METRICS_PORT;
use std::net::SocketAddr;
use tracing::{info, warn};

pub fn init_metrics() {
    let port: u16 = std::env::var("KGB_METRICS_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_METRICS_PORT);
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new().with_http_listener(addr);
    match builder.install() {
        Ok(()) => info!(%addr, "Prometheus exporter listening on /metrics"),
        Err(e) => warn!("Prometheus exporter install failed (possibly already installed): {}", e),
    }
}

/// Metrics for one roster scan
pub struct ScanMetrics;

impl ScanMetrics {
    pub fn record_scan(duration_secs: f64) {
        ::metrics::counter!("kgb_scans_total").increment(1);
        ::metrics::histogram!("kgb_scan_duration_seconds").record(duration_secs);
    }

    /// The source could not be fetched, so the whole tick was abandoned
    pub fn record_scan_failure() {
        ::metrics::counter!("kgb_scan_failures_total").increment(1);
    }

    pub fn record_row_skipped() {
        ::metrics::counter!("kgb_rows_skipped_total").increment(1);
    }

    pub fn record_eligible() {
        ::metrics::counter!("kgb_events_eligible_total").increment(1);
    }

    pub fn record_sent() {
        ::metrics::counter!("kgb_notifications_sent_total").increment(1);
    }

    pub fn record_dispatch_failure() {
        ::metrics::counter!("kgb_dispatch_failures_total").increment(1);
    }

    pub fn record_ledger_error() {
        ::metrics::counter!("kgb_ledger_errors_total").increment(1);
    }
}
