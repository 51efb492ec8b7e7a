pub mod income;
pub mod invoices;
pub mod payment;

pub use income::IncomeListParams;
pub use invoices::{
    CreateInvoiceRequest, InvoiceListParams, InvoiceListResponse, SendInvoiceRequest,
    SendInvoiceResponse,
};
pub use payment::PaymentLinkParams;
