//! Pipeline counters, registered once in the default prometheus registry.

use lazy_static::lazy_static;
use prometheus::{register_int_counter, register_int_counter_vec, Encoder, IntCounter, IntCounterVec, TextEncoder};

lazy_static! {
    pub static ref CERTIFICATES_RENDERED: IntCounter = register_int_counter!(
        "certificates_rendered_total",
        "Certificates laid out into a generated document"
    )
    .expect("metric registration");
    pub static ref CERTIFICATE_RUNS: IntCounterVec = register_int_counter_vec!(
        "certificate_runs_total",
        "Certificate generation runs by outcome",
        &["outcome"]
    )
    .expect("metric registration");
}

pub fn record_run(outcome: &str) {
    CERTIFICATE_RUNS.with_label_values(&[outcome]).inc();
}

/// Text exposition of every metric in the default registry.
pub fn render() -> Result<String, prometheus::Error> {
    let families = prometheus::gather();
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&families, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}
