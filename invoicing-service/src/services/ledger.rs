//! Income ledger.

use super::metrics::{LEDGER_ENTRIES_TOTAL, SETTLED_AMOUNT_TOTAL};
use super::repository::{InsertOutcome, LedgerRepository};
use crate::models::{IncomeEntry, IncomeSummary, Invoice, NewIncomeEntry};
use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use service_core::error::AppError;
use std::sync::Arc;
use tracing::instrument;

pub const DEFAULT_RECENT_LIMIT: usize = 10;
pub const MAX_RECENT_LIMIT: usize = 100;

#[derive(Clone)]
pub struct IncomeLedger {
    entries: Arc<dyn LedgerRepository>,
}

impl IncomeLedger {
    pub fn new(entries: Arc<dyn LedgerRepository>) -> Self {
        Self { entries }
    }

    /// Records income entered directly by the user.
    #[instrument(skip(self, entry))]
    pub async fn record(
        &self,
        user_id: &str,
        mut entry: NewIncomeEntry,
    ) -> Result<IncomeEntry, AppError> {
        if entry.amount <= Decimal::ZERO {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "amount must be greater than zero"
            )));
        }
        entry.description = entry.description.trim().to_string();
        if entry.description.is_empty() {
            return Err(AppError::missing_field("description"));
        }

        let entry = IncomeEntry::new(user_id, entry);
        self.entries.insert(&entry).await?;

        LEDGER_ENTRIES_TOTAL.with_label_values(&["manual"]).inc();
        tracing::info!(entry_id = %entry.entry_id, amount = %entry.amount, "Income recorded");
        Ok(entry)
    }

    /// Most recent entries, newest date first, with their sum.
    #[instrument(skip(self))]
    pub async fn recent(&self, user_id: &str, limit: usize) -> Result<IncomeSummary, AppError> {
        let limit = limit.clamp(1, MAX_RECENT_LIMIT);
        let entries = self.entries.recent(user_id, limit).await?;
        Ok(IncomeSummary::from_entries(entries))
    }

    /// Credits a paid invoice to the ledger. At most one entry is ever written
    /// per invoice; returns the entry and whether this call wrote it.
    #[instrument(skip(self, invoice), fields(
        user_id = %invoice.user_id,
        invoice_number = %invoice.invoice_number
    ))]
    pub async fn credit_invoice(&self, invoice: &Invoice) -> Result<(IncomeEntry, bool), AppError> {
        if let Some(existing) = self
            .entries
            .find_by_invoice_reference(&invoice.user_id, &invoice.invoice_number)
            .await?
        {
            tracing::info!(entry_id = %existing.entry_id, "Invoice already credited");
            return Ok((existing, false));
        }

        let entry = IncomeEntry::settlement(invoice, Utc::now().date_naive());

        match self.entries.insert(&entry).await? {
            InsertOutcome::Inserted => {
                LEDGER_ENTRIES_TOTAL.with_label_values(&["settlement"]).inc();
                SETTLED_AMOUNT_TOTAL.inc_by(entry.amount.to_f64().unwrap_or_default());
                tracing::info!(entry_id = %entry.entry_id, amount = %entry.amount, "Invoice credited");
                Ok((entry, true))
            }
            // A concurrent settlement won the race
            InsertOutcome::AlreadyExists => {
                let existing = self
                    .entries
                    .find_by_invoice_reference(&invoice.user_id, &invoice.invoice_number)
                    .await?
                    .ok_or_else(|| {
                        AppError::InternalError(anyhow::anyhow!(
                            "ledger reported a duplicate for {} but it cannot be found",
                            invoice.invoice_number
                        ))
                    })?;
                Ok((existing, false))
            }
        }
    }
}
