//! Outbound invoice email.
//!
//! [`InvoiceMailer`] composes the message for an invoice, hands it to the
//! configured [`EmailProvider`] and records an [`EmailLog`] for the attempt.

pub mod mock;
pub mod preview;
pub mod resend;
pub mod smtp;
pub mod template;

use super::metrics::EMAILS_TOTAL;
use super::repository::EmailLogRepository;
use crate::models::{EmailLog, EmailLogStatus};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use service_core::error::AppError;
use std::sync::Arc;
use thiserror::Error;
use tracing::instrument;

pub use mock::MockEmailProvider;
pub use preview::PreviewEmailProvider;
pub use resend::ResendProvider;
pub use smtp::SmtpProvider;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Provider not enabled: {0}")]
    NotEnabled(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Send error: {0}")]
    SendFailed(String),

    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),

    #[error("Authentication error: {0}")]
    Authentication(String),
}

#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub provider_id: Option<String>,
}

impl ProviderResponse {
    pub fn success(provider_id: Option<String>) -> Self {
        Self { provider_id }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmailAttachment {
    pub filename: String,
    pub content_type: String,
    pub content: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct EmailMessage {
    /// Full mailbox, e.g. `Acme Studio <invoices@indiepilot.io>`.
    pub from: String,
    pub to: String,
    pub to_name: Option<String>,
    pub subject: String,
    pub body_text: String,
    pub body_html: String,
    pub headers: Vec<(String, String)>,
    pub attachments: Vec<EmailAttachment>,
}

impl EmailMessage {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[async_trait]
pub trait EmailProvider: Send + Sync {
    async fn send(&self, email: &EmailMessage) -> Result<ProviderResponse, ProviderError>;
    async fn health_check(&self) -> Result<(), ProviderError>;
    fn is_enabled(&self) -> bool;
    /// Short label used in logs and metrics.
    fn name(&self) -> &'static str;
}

/// Everything needed to email one invoice.
#[derive(Debug, Clone)]
pub struct InvoiceEmail {
    pub user_id: String,
    pub invoice_id: String,
    pub invoice_number: String,
    pub client_email: String,
    pub client_name: String,
    pub company_name: String,
    pub subject: String,
    pub message: String,
    pub amount_due: Decimal,
    pub due_date: NaiveDate,
    pub payment_link: String,
    pub pdf: Vec<u8>,
}

#[derive(Clone)]
pub struct InvoiceMailer {
    provider: Arc<dyn EmailProvider>,
    email_logs: Arc<dyn EmailLogRepository>,
    sender_address: String,
}

impl InvoiceMailer {
    pub fn new(
        provider: Arc<dyn EmailProvider>,
        email_logs: Arc<dyn EmailLogRepository>,
        sender_address: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            email_logs,
            sender_address: sender_address.into(),
        }
    }

    pub fn provider(&self) -> &Arc<dyn EmailProvider> {
        &self.provider
    }

    /// Builds the message the provider will receive.
    pub fn compose(&self, email: &InvoiceEmail) -> EmailMessage {
        EmailMessage {
            from: template::sender_mailbox(&email.company_name, &self.sender_address),
            to: email.client_email.clone(),
            to_name: Some(email.client_name.clone()).filter(|n| !n.is_empty()),
            subject: email.subject.clone(),
            body_text: template::text_body(email),
            body_html: template::html_body(email),
            headers: vec![
                ("X-Invoice-ID".to_string(), email.invoice_id.clone()),
                ("X-Invoice-Number".to_string(), email.invoice_number.clone()),
            ],
            attachments: vec![EmailAttachment {
                filename: format!("{}.pdf", email.invoice_number),
                content_type: "application/pdf".to_string(),
                content: email.pdf.clone(),
            }],
        }
    }

    /// Sends the invoice email and returns the provider's message id.
    ///
    /// An audit record is written for every attempt. Failing to write it is
    /// logged and does not change the outcome.
    #[instrument(skip(self, email), fields(
        user_id = %email.user_id,
        invoice_id = %email.invoice_id,
        invoice_number = %email.invoice_number,
        provider = self.provider.name()
    ))]
    pub async fn dispatch(&self, email: &InvoiceEmail) -> Result<String, AppError> {
        if email.client_email.trim().is_empty() {
            return Err(AppError::missing_field("client_email"));
        }
        if email.invoice_number.trim().is_empty() {
            return Err(AppError::missing_field("invoice_number"));
        }
        if email.company_name.trim().is_empty() {
            return Err(AppError::missing_field("company_name"));
        }

        let message = self.compose(email);
        let provider = self.provider.name();

        match self.provider.send(&message).await {
            Ok(response) => {
                let email_id = response
                    .provider_id
                    .unwrap_or_else(|| "unknown".to_string());
                EMAILS_TOTAL.with_label_values(&[provider, "sent"]).inc();
                tracing::info!(email_id = %email_id, to = %email.client_email, "Invoice email sent");
                self.record(email, EmailLogStatus::Sent, Some(email_id.clone()), None)
                    .await;
                Ok(email_id)
            }
            Err(e) => {
                EMAILS_TOTAL.with_label_values(&[provider, "failed"]).inc();
                tracing::error!(error = %e, to = %email.client_email, "Invoice email failed");
                self.record(email, EmailLogStatus::Failed, None, Some(e.to_string()))
                    .await;
                Err(AppError::BadGateway(format!("Failed to send email: {}", e)))
            }
        }
    }

    async fn record(
        &self,
        email: &InvoiceEmail,
        status: EmailLogStatus,
        email_id: Option<String>,
        error: Option<String>,
    ) {
        let log = EmailLog {
            invoice_id: email.invoice_id.clone(),
            invoice_number: email.invoice_number.clone(),
            user_id: email.user_id.clone(),
            client_email: email.client_email.clone(),
            client_name: email.client_name.clone(),
            status,
            email_id,
            error,
            sent_at: Utc::now(),
        };
        if let Err(e) = self.email_logs.insert(&log).await {
            tracing::warn!(error = %e, status = %status, "Failed to write email audit log");
        }
    }
}
