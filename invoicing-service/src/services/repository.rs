//! Storage seams for invoicing-service.
//!
//! Every read and write is scoped to a `user_id`. `MongoStore` and
//! `MemoryStore` both implement all of these traits; the workflow only sees
//! the trait objects bundled in [`Repositories`].

use crate::models::{
    CompanyProfile, EmailLog, IncomeEntry, Invoice, InvoiceFilter, StatusChange,
};
use async_trait::async_trait;
use service_core::error::AppError;
use std::sync::Arc;

/// Result of inserting a record guarded by a uniqueness constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    AlreadyExists,
}

#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    async fn insert(&self, invoice: &Invoice) -> Result<(), AppError>;

    async fn get(&self, user_id: &str, invoice_id: &str) -> Result<Option<Invoice>, AppError>;

    /// Unscoped lookup, only used to resolve a public payment link.
    async fn find_by_id(&self, invoice_id: &str) -> Result<Option<Invoice>, AppError>;

    /// Invoices of one user, newest first.
    async fn list(&self, user_id: &str, filter: InvoiceFilter) -> Result<Vec<Invoice>, AppError>;

    /// Writes the status change only if the stored status is one of
    /// `change.transition.allowed_from()`. Returns the updated invoice, or
    /// `None` when the invoice is missing or the guard did not match.
    async fn apply_status_change(
        &self,
        user_id: &str,
        invoice_id: &str,
        change: &StatusChange,
    ) -> Result<Option<Invoice>, AppError>;
}

#[async_trait]
pub trait LedgerRepository: Send + Sync {
    /// Inserts an entry. Entries carrying an `invoice_reference` already held
    /// by another entry of the same user are not written.
    async fn insert(&self, entry: &IncomeEntry) -> Result<InsertOutcome, AppError>;

    async fn find_by_invoice_reference(
        &self,
        user_id: &str,
        invoice_reference: &str,
    ) -> Result<Option<IncomeEntry>, AppError>;

    /// Most recent entries by date, newest first.
    async fn recent(&self, user_id: &str, limit: usize) -> Result<Vec<IncomeEntry>, AppError>;
}

#[async_trait]
pub trait CounterRepository: Send + Sync {
    /// Atomically advances the user's invoice counter and returns the new
    /// value. A fresh counter returns 1.
    async fn increment(&self, user_id: &str) -> Result<u64, AppError>;
}

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn get(&self, user_id: &str) -> Result<Option<CompanyProfile>, AppError>;

    async fn upsert(&self, profile: &CompanyProfile) -> Result<(), AppError>;
}

#[async_trait]
pub trait EmailLogRepository: Send + Sync {
    async fn insert(&self, log: &EmailLog) -> Result<(), AppError>;

    async fn list_for_invoice(
        &self,
        user_id: &str,
        invoice_id: &str,
    ) -> Result<Vec<EmailLog>, AppError>;
}

#[async_trait]
pub trait StoreHealth: Send + Sync {
    async fn health_check(&self) -> Result<(), AppError>;
}

/// All storage handles used by the service.
#[derive(Clone)]
pub struct Repositories {
    pub invoices: Arc<dyn InvoiceRepository>,
    pub ledger: Arc<dyn LedgerRepository>,
    pub counters: Arc<dyn CounterRepository>,
    pub profiles: Arc<dyn ProfileRepository>,
    pub email_logs: Arc<dyn EmailLogRepository>,
    pub health: Arc<dyn StoreHealth>,
}

impl Repositories {
    /// Every handle backed by the same store.
    pub fn from_store<S>(store: S) -> Self
    where
        S: InvoiceRepository
            + LedgerRepository
            + CounterRepository
            + ProfileRepository
            + EmailLogRepository
            + StoreHealth
            + 'static,
    {
        let store = Arc::new(store);
        Self {
            invoices: store.clone(),
            ledger: store.clone(),
            counters: store.clone(),
            profiles: store.clone(),
            email_logs: store.clone(),
            health: store,
        }
    }
}
