//! Services module for invoicing-service.

pub mod database;
pub mod ledger;
pub mod memory;
pub mod metrics;
pub mod notification;
pub mod numbering;
pub mod payment;
pub mod pdf;
pub mod repository;
pub mod workflow;

pub use database::MongoStore;
pub use ledger::IncomeLedger;
pub use memory::MemoryStore;
pub use metrics::{get_metrics, init_metrics};
pub use notification::{EmailProvider, InvoiceMailer};
pub use numbering::InvoiceNumberer;
pub use payment::PaymentService;
pub use pdf::PdfRenderer;
pub use repository::Repositories;
pub use workflow::{InvoiceWorkflow, SendOptions, Settlement};
