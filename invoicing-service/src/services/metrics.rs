//! Prometheus metrics for invoicing-service.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter, register_counter_vec, register_histogram_vec, register_int_counter,
    Counter, CounterVec, HistogramVec, IntCounter, TextEncoder,
};

/// Invoice lifecycle counter by resulting status.
pub static INVOICES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "invoicing_invoices_total",
        "Total number of invoices entering each status",
        &["status"] // draft, sent, viewed, paid
    )
    .expect("Failed to register invoices_total")
});

/// Invoice email deliveries by provider and outcome.
pub static EMAILS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "invoicing_emails_total",
        "Total number of invoice emails by provider and outcome",
        &["provider", "outcome"]
    )
    .expect("Failed to register emails_total")
});

/// Ledger entries written, by source.
pub static LEDGER_ENTRIES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "invoicing_ledger_entries_total",
        "Total number of income entries by source",
        &["source"] // manual, settlement
    )
    .expect("Failed to register ledger_entries_total")
});

/// Invoice numbers minted from the clock because the counter store failed.
pub static COUNTER_FALLBACK_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "invoicing_counter_fallback_total",
        "Total number of invoice numbers minted without the counter store"
    )
    .expect("Failed to register counter_fallback_total")
});

/// Settled invoice amount.
pub static SETTLED_AMOUNT_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "invoicing_settled_amount_total",
        "Total amount credited to the income ledger by settlement"
    )
    .expect("Failed to register settled_amount_total")
});

/// PDF renders by document kind and outcome.
pub static PDF_RENDERS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "invoicing_pdf_renders_total",
        "Total number of PDF renders by document kind and outcome",
        &["kind", "outcome"]
    )
    .expect("Failed to register pdf_renders_total")
});

/// Error counter for alerting.
pub static ERRORS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "invoicing_errors_total",
        "Total number of errors by type",
        &["error_type"]
    )
    .expect("Failed to register errors_total")
});

/// Database query duration histogram.
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "invoicing_db_query_duration_seconds",
        "Database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .expect("Failed to register db_query_duration")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&INVOICES_TOTAL);
    Lazy::force(&EMAILS_TOTAL);
    Lazy::force(&LEDGER_ENTRIES_TOTAL);
    Lazy::force(&COUNTER_FALLBACK_TOTAL);
    Lazy::force(&SETTLED_AMOUNT_TOTAL);
    Lazy::force(&PDF_RENDERS_TOTAL);
    Lazy::force(&ERRORS_TOTAL);
    Lazy::force(&DB_QUERY_DURATION);
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_default()
}
