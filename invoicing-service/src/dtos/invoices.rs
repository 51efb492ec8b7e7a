use crate::models::{Invoice, InvoiceFilter, InvoiceStatus, LineItemInput, NewInvoice};
use crate::services::SendOptions;
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use service_core::error::AppError;

/// Days between issue and due date when the client sends no due date.
pub const DEFAULT_PAYMENT_DAYS: u64 = 30;

#[derive(Debug, Deserialize)]
pub struct CreateInvoiceRequest {
    #[serde(default)]
    pub client_name: String,
    #[serde(default)]
    pub client_email: String,
    #[serde(default)]
    pub client_address: Option<String>,
    #[serde(default)]
    pub issue_date: Option<NaiveDate>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub items: Vec<LineItemInput>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub terms: Option<String>,
}

impl CreateInvoiceRequest {
    pub fn into_new_invoice(self, today: NaiveDate) -> NewInvoice {
        let issue_date = self.issue_date.unwrap_or(today);
        let due_date = self.due_date.unwrap_or_else(|| {
            issue_date
                .checked_add_days(Days::new(DEFAULT_PAYMENT_DAYS))
                .unwrap_or(issue_date)
        });
        NewInvoice {
            client_name: self.client_name,
            client_email: self.client_email,
            client_address: self.client_address,
            issue_date,
            due_date,
            items: self.items,
            notes: self.notes,
            terms: self.terms,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SendInvoiceRequest {
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl From<SendInvoiceRequest> for SendOptions {
    fn from(req: SendInvoiceRequest) -> Self {
        SendOptions {
            subject: req.subject,
            message: req.message,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SendInvoiceResponse {
    pub invoice: Invoice,
    pub email_id: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct InvoiceListParams {
    pub status: Option<String>,
}

impl InvoiceListParams {
    /// `pending` selects every invoice that is not paid yet.
    pub fn filter(&self) -> Result<InvoiceFilter, AppError> {
        match self.status.as_deref().map(str::trim) {
            None | Some("") | Some("all") => Ok(InvoiceFilter::All),
            Some("pending") => Ok(InvoiceFilter::Outstanding),
            Some("paid") => Ok(InvoiceFilter::Paid),
            Some(other) => InvoiceStatus::parse(other)
                .map(InvoiceFilter::Status)
                .ok_or_else(|| {
                    AppError::BadRequest(anyhow::anyhow!("unknown invoice status '{}'", other))
                }),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct InvoiceListResponse {
    pub invoices: Vec<Invoice>,
    pub total: usize,
}
