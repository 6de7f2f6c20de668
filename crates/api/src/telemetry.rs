//! Logging and metrics

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::{warn, Level};
use tracing_subscriber::FmtSubscriber;

use crate::config::ServerConfig;

/// Advisory answers served, by advisor and source
pub const ADVICE_TOTAL: &str = "harvesthub_advice_total";
/// Advisory latency in milliseconds
pub const ADVICE_LATENCY_MS: &str = "harvesthub_advice_latency_ms";
/// Listing acceptance attempts, by outcome
pub const ACCEPT_TOTAL: &str = "harvesthub_listing_accept_total";
/// Listings posted, by MSP position
pub const LISTINGS_POSTED_TOTAL: &str = "harvesthub_listings_posted_total";

fn parse_level(level: &str) -> Level {
    level.trim().parse().unwrap_or(Level::INFO)
}

/// Initialize logging
///
/// Safe to call more than once; later calls leave the first subscriber in place.
pub fn init_logging(config: &ServerConfig) {
    let builder = FmtSubscriber::builder()
        .with_max_level(parse_level(&config.log_level))
        .with_target(true);

    let result = if config.json_logs {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };

    if result.is_err() {
        warn!("Tracing subscriber already set");
    }
}

/// Install the global Prometheus recorder
pub fn install_metrics() -> Option<PrometheusHandle> {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("Metrics recorder not installed: {}", e);
            None
        }
    }
}

/// Count one advisory answer
pub fn record_advice(advisor: &'static str, source: &'static str, latency_ms: u64) {
    metrics::counter!(ADVICE_TOTAL, "advisor" => advisor, "source" => source).increment(1);
    metrics::histogram!(ADVICE_LATENCY_MS, "advisor" => advisor).record(latency_ms as f64);
}

/// Count one acceptance attempt
pub fn record_acceptance(outcome: &'static str) {
    metrics::counter!(ACCEPT_TOTAL, "outcome" => outcome).increment(1);
}

/// Count one posted listing
pub fn record_listing(below_msp: bool) {
    let position = if below_msp { "below_msp" } else { "at_or_above_msp" };
    metrics::counter!(LISTINGS_POSTED_TOTAL, "msp" => position).increment(1);
}
