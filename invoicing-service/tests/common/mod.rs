//! Shared fixtures: the service wired over the in-memory store and the mock
//! email provider, plus store wrappers that fail on demand.
#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use chrono::{NaiveDate, Utc};
use invoicing_service::models::{
    CompanyProfile, IncomeEntry, Invoice, InvoiceFilter, LineItemInput, NewInvoice, StatusChange,
};
use invoicing_service::services::notification::MockEmailProvider;
use invoicing_service::services::repository::{
    CounterRepository, InsertOutcome, InvoiceRepository, LedgerRepository,
};
use invoicing_service::services::{InvoiceWorkflow, MemoryStore, Repositories};
use invoicing_service::startup::{build_router, AppState};
use rust_decimal::Decimal;
use service_core::error::AppError;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

pub const TEST_USER_ID: &str = "user-1";
pub const OTHER_USER_ID: &str = "user-2";
pub const PUBLIC_ORIGIN: &str = "https://app.indiepilot.test";
pub const SENDER_ADDRESS: &str = "invoices@indiepilot.test";

pub fn dec(s: &str) -> Decimal {
    s.parse().expect("valid decimal")
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub fn profile(user_id: &str, tax_percent: &str) -> CompanyProfile {
    CompanyProfile {
        user_id: user_id.to_string(),
        company_name: "Pixel Studio".to_string(),
        email: "hello@pixel.test".to_string(),
        phone: "+1 555 0100".to_string(),
        address: "1 Market St".to_string(),
        brand_color: Some("#2563eb".to_string()),
        tax_percent: dec(tax_percent),
        invoice_prefix: None,
        default_notes: "Thank you for your business".to_string(),
        default_terms: "Payment due within 30 days".to_string(),
        updated_at: Utc::now(),
    }
}

pub fn item(description: &str, quantity: &str, rate: &str) -> LineItemInput {
    LineItemInput {
        description: description.to_string(),
        quantity: dec(quantity),
        rate: dec(rate),
    }
}

/// Acme, one line of 2 × 50.
pub fn acme_invoice() -> NewInvoice {
    NewInvoice {
        client_name: "Acme".to_string(),
        client_email: "ap@acme.test".to_string(),
        client_address: None,
        issue_date: date(2024, 3, 1),
        due_date: date(2024, 3, 31),
        items: vec![item("Design", "2", "50")],
        notes: None,
        terms: None,
    }
}

pub struct TestApp {
    pub store: MemoryStore,
    pub repositories: Repositories,
    pub provider: Arc<MockEmailProvider>,
    pub state: AppState,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_provider(MockEmailProvider::new(true))
    }

    pub fn with_provider(provider: MockEmailProvider) -> Self {
        let store = MemoryStore::new();
        let repositories = Repositories::from_store(store.clone());
        Self::with_repositories(store, repositories, provider)
    }

    /// Custom repositories, e.g. with one handle swapped for a failing wrapper.
    pub fn with_repositories(
        store: MemoryStore,
        repositories: Repositories,
        provider: MockEmailProvider,
    ) -> Self {
        let provider = Arc::new(provider);
        let state = AppState::new(
            repositories.clone(),
            provider.clone(),
            SENDER_ADDRESS,
            PUBLIC_ORIGIN,
        );
        Self {
            store,
            repositories,
            provider,
            state,
        }
    }

    pub fn workflow(&self) -> &InvoiceWorkflow {
        &self.state.workflow
    }

    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    pub async fn seed_profile(&self, user_id: &str, tax_percent: &str) -> CompanyProfile {
        let profile = profile(user_id, tax_percent);
        self.repositories
            .profiles
            .upsert(&profile)
            .await
            .expect("Failed to seed profile");
        profile
    }

    /// Seeds a profile and creates the Acme invoice.
    pub async fn draft_invoice(&self, user_id: &str) -> Invoice {
        if self
            .repositories
            .profiles
            .get(user_id)
            .await
            .expect("profile lookup")
            .is_none()
        {
            self.seed_profile(user_id, "8").await;
        }
        self.workflow()
            .create_invoice(user_id, acme_invoice())
            .await
            .expect("Failed to create invoice")
    }
}

/// Counter store that is always down.
pub struct FailingCounter;

#[async_trait]
impl CounterRepository for FailingCounter {
    async fn increment(&self, _user_id: &str) -> Result<u64, AppError> {
        Err(AppError::DatabaseError(anyhow::anyhow!("counter store unreachable")))
    }
}

/// Ledger that rejects writes while `failing` is set.
pub struct FlakyLedger {
    pub inner: MemoryStore,
    pub failing: AtomicBool,
}

impl FlakyLedger {
    pub fn new(inner: MemoryStore, failing: bool) -> Self {
        Self {
            inner,
            failing: AtomicBool::new(failing),
        }
    }
}

#[async_trait]
impl LedgerRepository for FlakyLedger {
    async fn insert(&self, entry: &IncomeEntry) -> Result<InsertOutcome, AppError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::DatabaseError(anyhow::anyhow!("ledger unavailable")));
        }
        LedgerRepository::insert(&self.inner, entry).await
    }

    async fn find_by_invoice_reference(
        &self,
        user_id: &str,
        invoice_reference: &str,
    ) -> Result<Option<IncomeEntry>, AppError> {
        self.inner
            .find_by_invoice_reference(user_id, invoice_reference)
            .await
    }

    async fn recent(&self, user_id: &str, limit: usize) -> Result<Vec<IncomeEntry>, AppError> {
        LedgerRepository::recent(&self.inner, user_id, limit).await
    }
}

/// Invoice store whose next `failures` status updates error out.
pub struct FlakyInvoices {
    pub inner: MemoryStore,
    pub failures: AtomicUsize,
}

impl FlakyInvoices {
    pub fn new(inner: MemoryStore, failures: usize) -> Self {
        Self {
            inner,
            failures: AtomicUsize::new(failures),
        }
    }
}

#[async_trait]
impl InvoiceRepository for FlakyInvoices {
    async fn insert(&self, invoice: &Invoice) -> Result<(), AppError> {
        InvoiceRepository::insert(&self.inner, invoice).await
    }

    async fn get(&self, user_id: &str, invoice_id: &str) -> Result<Option<Invoice>, AppError> {
        self.inner.get(user_id, invoice_id).await
    }

    async fn find_by_id(&self, invoice_id: &str) -> Result<Option<Invoice>, AppError> {
        self.inner.find_by_id(invoice_id).await
    }

    async fn list(&self, user_id: &str, filter: InvoiceFilter) -> Result<Vec<Invoice>, AppError> {
        self.inner.list(user_id, filter).await
    }

    async fn apply_status_change(
        &self,
        user_id: &str,
        invoice_id: &str,
        change: &StatusChange,
    ) -> Result<Option<Invoice>, AppError> {
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(AppError::DatabaseError(anyhow::anyhow!("write timed out")));
        }
        self.inner
            .apply_status_change(user_id, invoice_id, change)
            .await
    }
}
