//! Mock payment page backend.
//!
//! A payment link resolves to a public summary of its invoice. Submitting the
//! card form checks the card fields for shape only; no card data is stored or
//! forwarded anywhere. A well-formed submission settles the invoice through
//! the workflow, so the ledger sees exactly one entry per invoice.

use super::repository::InvoiceRepository;
use super::workflow::InvoiceWorkflow;
use crate::models::{format_amount, Invoice, InvoiceStatus};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use std::str::FromStr;
use std::sync::Arc;
use tracing::instrument;

/// What the payer sees before paying.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentSummary {
    pub invoice_id: String,
    pub invoice_number: String,
    pub client_name: String,
    pub client_email: String,
    pub due_date: NaiveDate,
    pub total: Decimal,
    pub status: InvoiceStatus,
    pub company_name: String,
    pub company_email: String,
    pub company_phone: String,
    pub brand_color: Option<String>,
    /// False when the link's `amount` disagrees with the invoice total.
    pub amount_matches: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentRequest {
    pub invoice_id: String,
    pub amount: Decimal,
    #[serde(default)]
    pub card_number: String,
    #[serde(default)]
    pub card_name: String,
    /// `MM/YY`
    #[serde(default)]
    pub expiry: String,
    #[serde(default)]
    pub cvv: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentReceipt {
    pub confirmation: String,
    pub invoice_id: String,
    pub invoice_number: String,
    pub amount: Decimal,
    pub paid_at: Option<DateTime<Utc>>,
    /// Last four digits of the card.
    pub card_last4: String,
}

/// Parses the `amount` query value of a payment link.
pub fn parse_link_amount(raw: &str) -> Option<Decimal> {
    Decimal::from_str(raw.trim()).ok()
}

fn invalid(message: &str) -> AppError {
    AppError::BadRequest(anyhow::anyhow!("{}", message))
}

/// Checks the card form, returning the digits of the card number.
pub fn validate_card(request: &PaymentRequest, today: NaiveDate) -> Result<String, AppError> {
    if request.card_number.trim().is_empty() {
        return Err(AppError::missing_field("card_number"));
    }
    if request.card_name.trim().is_empty() {
        return Err(AppError::missing_field("card_name"));
    }
    if request.expiry.trim().is_empty() {
        return Err(AppError::missing_field("expiry"));
    }
    if request.cvv.trim().is_empty() {
        return Err(AppError::missing_field("cvv"));
    }

    let digits: String = request
        .card_number
        .chars()
        .filter(|c| !matches!(c, ' ' | '-'))
        .collect();
    if !(12..=19).contains(&digits.len()) || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid("card number must be 12 to 19 digits"));
    }

    let cvv = request.cvv.trim();
    if !(3..=4).contains(&cvv.len()) || !cvv.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid("cvv must be 3 or 4 digits"));
    }

    let (month, year) = parse_expiry(request.expiry.trim())
        .ok_or_else(|| invalid("expiry must be in MM/YY format"))?;
    if (year, month) < (today.year(), today.month()) {
        return Err(invalid("card has expired"));
    }

    Ok(digits)
}

fn parse_expiry(expiry: &str) -> Option<(u32, i32)> {
    let (mm, yy) = expiry.split_once('/')?;
    let (mm, yy) = (mm.trim(), yy.trim());
    if mm.len() != 2 || yy.len() != 2 {
        return None;
    }
    let month: u32 = mm.parse().ok()?;
    let year: i32 = yy.parse().ok()?;
    (1..=12).contains(&month).then_some((month, 2000 + year))
}

#[derive(Clone)]
pub struct PaymentService {
    invoices: Arc<dyn InvoiceRepository>,
    workflow: InvoiceWorkflow,
}

impl PaymentService {
    pub fn new(invoices: Arc<dyn InvoiceRepository>, workflow: InvoiceWorkflow) -> Self {
        Self { invoices, workflow }
    }

    async fn resolve(&self, invoice_id: &str) -> Result<Invoice, AppError> {
        if invoice_id.trim().is_empty() {
            return Err(invalid("invalid payment link"));
        }
        self.invoices
            .find_by_id(invoice_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("invoice {} not found", invoice_id)))
    }

    #[instrument(skip(self))]
    pub async fn summary(
        &self,
        invoice_id: &str,
        link_amount: Option<&str>,
    ) -> Result<PaymentSummary, AppError> {
        let invoice = self.resolve(invoice_id).await?;
        let amount_matches = link_amount
            .map(|raw| parse_link_amount(raw) == Some(invoice.total.round_dp(2)))
            .unwrap_or(true);

        Ok(PaymentSummary {
            invoice_id: invoice.invoice_id,
            invoice_number: invoice.invoice_number,
            client_name: invoice.client_name,
            client_email: invoice.client_email,
            due_date: invoice.due_date,
            total: invoice.total,
            status: invoice.status,
            company_name: invoice.company_profile.company_name,
            company_email: invoice.company_profile.email,
            company_phone: invoice.company_profile.phone,
            brand_color: invoice.company_profile.brand_color,
            amount_matches,
        })
    }

    #[instrument(skip(self, request), fields(invoice_id = %request.invoice_id))]
    pub async fn pay(&self, request: PaymentRequest) -> Result<PaymentReceipt, AppError> {
        let invoice = self.resolve(&request.invoice_id).await?;
        if invoice.status.is_paid() {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "invoice {} is already paid",
                invoice.invoice_number
            )));
        }

        let digits = validate_card(&request, Utc::now().date_naive())?;

        if request.amount.round_dp(2) != invoice.total.round_dp(2) {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "amount {} does not match the invoice total {}",
                format_amount(request.amount),
                format_amount(invoice.total)
            )));
        }

        let settlement = self
            .workflow
            .mark_paid(&invoice.user_id, &invoice.invoice_id)
            .await?;

        let card_last4 = digits[digits.len() - 4..].to_string();
        tracing::info!(
            invoice_number = %settlement.invoice.invoice_number,
            newly_credited = settlement.newly_credited,
            "Mock payment accepted"
        );

        Ok(PaymentReceipt {
            confirmation: format!("mock-{}", uuid::Uuid::new_v4()),
            invoice_id: settlement.invoice.invoice_id,
            invoice_number: settlement.invoice.invoice_number,
            amount: settlement.invoice.total,
            paid_at: settlement.invoice.paid_at,
            card_last4,
        })
    }
}
