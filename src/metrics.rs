//! Prometheus counters for catalog activity.

use anyhow::{Context, Result};
use metrics::counter;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

pub fn install_exporter(addr: SocketAddr) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("install prometheus exporter")?;
    log::info!("Prometheus metrics on http://{}/metrics", addr);
    Ok(())
}

pub fn record_upload(outcome: &'static str) {
    counter!("catalog_uploads_total", "outcome" => outcome).increment(1);
}

pub fn record_preview(file_type: &str) {
    counter!("catalog_previews_total", "file_type" => file_type.to_string()).increment(1);
}

pub fn record_download() {
    counter!("catalog_downloads_total").increment(1);
}

pub fn record_login(outcome: &'static str) {
    counter!("catalog_logins_total", "outcome" => outcome).increment(1);
}
