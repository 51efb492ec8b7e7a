//! Domain models for invoicing-service.

pub mod company_profile;
pub mod contract;
pub mod email_log;
pub mod income;
pub mod invoice;

pub use company_profile::{CompanyProfile, CompanyProfileRequest, DEFAULT_INVOICE_PREFIX};
pub use contract::ContractRequest;
pub use email_log::{EmailLog, EmailLogStatus};
pub use income::{IncomeCategory, IncomeEntry, IncomeSummary, NewIncomeEntry};
pub use invoice::{
    format_amount, to_cents, AmountOverflow, CompanySnapshot, Invoice, InvoiceFilter,
    InvoiceStatus, InvoiceTotals, LineItem, LineItemInput, NewInvoice, StatusChange, Transition,
    TransitionError,
};
