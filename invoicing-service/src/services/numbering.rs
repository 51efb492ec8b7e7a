//! Per-user invoice numbering.

use super::metrics::COUNTER_FALLBACK_TOTAL;
use super::repository::CounterRepository;
use chrono::Utc;
use std::sync::Arc;
use tracing::instrument;

#[derive(Clone)]
pub struct InvoiceNumberer {
    counters: Arc<dyn CounterRepository>,
}

impl InvoiceNumberer {
    pub fn new(counters: Arc<dyn CounterRepository>) -> Self {
        Self { counters }
    }

    /// Mints the next number for `user_id`, e.g. `INV-00042`.
    ///
    /// Never fails: when the counter store is unreachable the number is
    /// derived from the current time in milliseconds instead. Such numbers
    /// are unique in practice but break the sequence.
    #[instrument(skip(self))]
    pub async fn next_invoice_number(&self, user_id: &str, prefix: &str) -> String {
        match self.counters.increment(user_id).await {
            Ok(seq) => format_invoice_number(prefix, seq),
            Err(e) => {
                COUNTER_FALLBACK_TOTAL.inc();
                let fallback = format!("{}-{}", prefix, Utc::now().timestamp_millis());
                tracing::warn!(
                    error = %e,
                    invoice_number = %fallback,
                    "Invoice counter unavailable, using time-based number"
                );
                fallback
            }
        }
    }
}

pub fn format_invoice_number(prefix: &str, seq: u64) -> String {
    format!("{}-{:05}", prefix, seq)
}
