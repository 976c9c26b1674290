use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use prometheus::{IntCounterVec, Opts, Registry};
use std::sync::OnceLock;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
pub static PROMETHEUS_REGISTRY: OnceLock<Registry> = OnceLock::new();
pub static DONATIONS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static DONATION_AMOUNT_CENTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Install the Prometheus recorder and register donation counters.
/// Called once from `main`; later calls are no-ops so test harnesses can
/// spawn several applications in one process.
pub fn init_metrics() {
    if METRICS_HANDLE.get().is_some() {
        return;
    }

    let builder = PrometheusBuilder::new();
    let Ok(handle) = builder.install_recorder() else {
        tracing::warn!("Prometheus recorder already installed");
        return;
    };

    if METRICS_HANDLE.set(handle).is_err() {
        return;
    }

    let registry = Registry::new();

    let donations_counter = IntCounterVec::new(
        Opts::new(
            "donations_total",
            "Donation ledger events by rail and status",
        ),
        &["rail", "status"],
    )
    .expect("Failed to create donations_total metric");

    let amount_counter = IntCounterVec::new(
        Opts::new(
            "donation_amount_cents_total",
            "Settled NGO-share amounts by rail, in cents",
        ),
        &["rail"],
    )
    .expect("Failed to create donation_amount_cents_total metric");

    registry
        .register(Box::new(donations_counter.clone()))
        .expect("Failed to register donations_total");
    registry
        .register(Box::new(amount_counter.clone()))
        .expect("Failed to register donation_amount_cents_total");

    PROMETHEUS_REGISTRY
        .set(registry)
        .expect("Failed to set prometheus registry");
    DONATIONS_TOTAL
        .set(donations_counter)
        .expect("Failed to set donations_total");
    DONATION_AMOUNT_CENTS_TOTAL
        .set(amount_counter)
        .expect("Failed to set donation_amount_cents_total");
}

pub fn get_metrics() -> String {
    let mut output = METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string());

    if let Some(registry) = PROMETHEUS_REGISTRY.get() {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let metric_families = registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer).ok();
        if let Ok(custom_metrics) = String::from_utf8(buffer) {
            output.push_str(&custom_metrics);
        }
    }

    output
}

/// Record a donation ledger event (created, settled, failed).
pub fn record_donation(rail: &str, status: &str) {
    if let Some(counter) = DONATIONS_TOTAL.get() {
        counter.with_label_values(&[rail, status]).inc();
    }
}

/// Record a settled NGO share for revenue tracking.
pub fn record_settled_amount(rail: &str, ngo_cents: u64) {
    if let Some(counter) = DONATION_AMOUNT_CENTS_TOTAL.get() {
        counter.with_label_values(&[rail]).inc_by(ngo_cents);
    }
}
