//! In-memory store, used by tests and by `STORE_BACKEND=memory`.
//!
//! DashMap shards give per-key locking: conditional status updates, counter
//! increments and the ledger uniqueness check all happen while holding the
//! entry's lock, matching the atomicity MongoDB gives the same operations.

use super::repository::{
    CounterRepository, EmailLogRepository, InsertOutcome, InvoiceRepository, LedgerRepository,
    ProfileRepository, StoreHealth,
};
use crate::models::{
    CompanyProfile, EmailLog, IncomeEntry, Invoice, InvoiceFilter, StatusChange,
};
use async_trait::async_trait;
use dashmap::DashMap;
use service_core::error::AppError;
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct MemoryStore {
    invoices: Arc<DashMap<String, Invoice>>,
    /// Keyed by user id.
    ledger: Arc<DashMap<String, Vec<IncomeEntry>>>,
    counters: Arc<DashMap<String, u64>>,
    profiles: Arc<DashMap<String, CompanyProfile>>,
    /// Keyed by invoice id.
    email_logs: Arc<DashMap<String, Vec<EmailLog>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn invoice_count(&self) -> usize {
        self.invoices.len()
    }

    pub fn ledger_len(&self, user_id: &str) -> usize {
        self.ledger.get(user_id).map(|e| e.len()).unwrap_or(0)
    }
}

#[async_trait]
impl InvoiceRepository for MemoryStore {
    async fn insert(&self, invoice: &Invoice) -> Result<(), AppError> {
        if self.invoices.contains_key(&invoice.invoice_id) {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "invoice {} already exists",
                invoice.invoice_id
            )));
        }
        self.invoices
            .insert(invoice.invoice_id.clone(), invoice.clone());
        Ok(())
    }

    async fn get(&self, user_id: &str, invoice_id: &str) -> Result<Option<Invoice>, AppError> {
        Ok(self
            .invoices
            .get(invoice_id)
            .filter(|inv| inv.user_id == user_id)
            .map(|inv| inv.clone()))
    }

    async fn find_by_id(&self, invoice_id: &str) -> Result<Option<Invoice>, AppError> {
        Ok(self.invoices.get(invoice_id).map(|inv| inv.clone()))
    }

    async fn list(&self, user_id: &str, filter: InvoiceFilter) -> Result<Vec<Invoice>, AppError> {
        let mut invoices: Vec<Invoice> = self
            .invoices
            .iter()
            .filter(|inv| inv.user_id == user_id && filter.matches(inv.status))
            .map(|inv| inv.clone())
            .collect();
        invoices.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(invoices)
    }

    async fn apply_status_change(
        &self,
        user_id: &str,
        invoice_id: &str,
        change: &StatusChange,
    ) -> Result<Option<Invoice>, AppError> {
        let Some(mut invoice) = self.invoices.get_mut(invoice_id) else {
            return Ok(None);
        };
        if invoice.user_id != user_id
            || !change.transition.allowed_from().contains(&invoice.status)
        {
            return Ok(None);
        }
        invoice.apply_status_change(change);
        Ok(Some(invoice.clone()))
    }
}

#[async_trait]
impl LedgerRepository for MemoryStore {
    async fn insert(&self, entry: &IncomeEntry) -> Result<InsertOutcome, AppError> {
        let mut entries = self.ledger.entry(entry.user_id.clone()).or_default();
        if let Some(reference) = &entry.invoice_reference {
            if entries
                .iter()
                .any(|e| e.invoice_reference.as_ref() == Some(reference))
            {
                return Ok(InsertOutcome::AlreadyExists);
            }
        }
        entries.push(entry.clone());
        Ok(InsertOutcome::Inserted)
    }

    async fn find_by_invoice_reference(
        &self,
        user_id: &str,
        invoice_reference: &str,
    ) -> Result<Option<IncomeEntry>, AppError> {
        Ok(self.ledger.get(user_id).and_then(|entries| {
            entries
                .iter()
                .find(|e| e.invoice_reference.as_deref() == Some(invoice_reference))
                .cloned()
        }))
    }

    async fn recent(&self, user_id: &str, limit: usize) -> Result<Vec<IncomeEntry>, AppError> {
        let mut entries = self
            .ledger
            .get(user_id)
            .map(|e| e.clone())
            .unwrap_or_default();
        entries.sort_by(|a, b| {
            b.date
                .cmp(&a.date)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        entries.truncate(limit);
        Ok(entries)
    }
}

#[async_trait]
impl CounterRepository for MemoryStore {
    async fn increment(&self, user_id: &str) -> Result<u64, AppError> {
        let mut seq = self.counters.entry(user_id.to_string()).or_insert(0);
        *seq += 1;
        Ok(*seq)
    }
}

#[async_trait]
impl ProfileRepository for MemoryStore {
    async fn get(&self, user_id: &str) -> Result<Option<CompanyProfile>, AppError> {
        Ok(self.profiles.get(user_id).map(|p| p.clone()))
    }

    async fn upsert(&self, profile: &CompanyProfile) -> Result<(), AppError> {
        self.profiles
            .insert(profile.user_id.clone(), profile.clone());
        Ok(())
    }
}

#[async_trait]
impl EmailLogRepository for MemoryStore {
    async fn insert(&self, log: &EmailLog) -> Result<(), AppError> {
        self.email_logs
            .entry(log.invoice_id.clone())
            .or_default()
            .push(log.clone());
        Ok(())
    }

    async fn list_for_invoice(
        &self,
        user_id: &str,
        invoice_id: &str,
    ) -> Result<Vec<EmailLog>, AppError> {
        Ok(self
            .email_logs
            .get(invoice_id)
            .map(|logs| {
                logs.iter()
                    .filter(|l| l.user_id == user_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[async_trait]
impl StoreHealth for MemoryStore {
    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }
}
