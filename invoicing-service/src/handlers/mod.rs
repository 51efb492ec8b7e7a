pub mod contracts;
pub mod health;
pub mod income;
pub mod invoices;
pub mod payment;
pub mod profile;

pub use contracts::contract_pdf;
pub use health::{health_check, metrics_endpoint, readiness_check};
pub use income::{list_income, record_income};
pub use invoices::{
    create_invoice, email_history, get_invoice, invoice_pdf, list_invoices, mark_paid,
    mark_viewed, send_invoice,
};
pub use payment::{payment_summary, submit_payment};
pub use profile::{get_profile, put_profile};

use axum::{
    http::{header, StatusCode},
    response::IntoResponse,
};

/// PDF download with `Content-Disposition: attachment`.
pub(crate) fn pdf_attachment(filename: &str, bytes: Vec<u8>) -> impl IntoResponse {
    let disposition = format!(
        "attachment; filename=\"{}\"",
        filename.replace(['"', '\\', '\r', '\n'], "")
    );
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
}
