//! Invoice lifecycle: creation, transmission, viewing and settlement.
//!
//! Every mutation of an invoice's status goes through a conditional store
//! update guarded by the statuses the transition may start from, so two
//! concurrent requests can never move an invoice backwards or out of `paid`.

use super::ledger::IncomeLedger;
use super::metrics::{ERRORS_TOTAL, INVOICES_TOTAL};
use super::notification::{template, InvoiceEmail, InvoiceMailer};
use super::numbering::InvoiceNumberer;
use super::pdf::PdfRenderer;
use super::repository::{EmailLogRepository, InvoiceRepository, ProfileRepository, Repositories};
use crate::models::{
    format_amount, CompanySnapshot, EmailLog, IncomeEntry, Invoice, InvoiceFilter,
    InvoiceStatus, InvoiceTotals, LineItem, NewInvoice, StatusChange, Transition,
    TransitionError,
};
use chrono::Utc;
use serde::Serialize;
use service_core::error::AppError;
use std::sync::Arc;
use tracing::instrument;

/// Caller overrides for the outgoing email.
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    pub subject: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SendOutcome {
    pub invoice: Invoice,
    pub email_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Settlement {
    pub invoice: Invoice,
    /// Ledger entry backing the payment; `None` when the invoice was already
    /// paid before this call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<IncomeEntry>,
    /// Whether this call wrote the ledger entry.
    pub newly_credited: bool,
}

fn transition_conflict(err: TransitionError) -> AppError {
    AppError::Conflict(anyhow::Error::new(err))
}

fn invoice_not_found(invoice_id: &str) -> AppError {
    AppError::NotFound(anyhow::anyhow!("invoice {} not found", invoice_id))
}

/// `<origin>/pay?invoice=<id>&amount=<total with two decimals>`.
pub fn payment_link(origin: &str, invoice: &Invoice) -> String {
    format!(
        "{}/pay?invoice={}&amount={}",
        origin.trim_end_matches('/'),
        invoice.invoice_id,
        format_amount(invoice.total)
    )
}

#[derive(Clone)]
pub struct InvoiceWorkflow {
    invoices: Arc<dyn InvoiceRepository>,
    profiles: Arc<dyn ProfileRepository>,
    email_logs: Arc<dyn EmailLogRepository>,
    numberer: InvoiceNumberer,
    ledger: IncomeLedger,
    mailer: InvoiceMailer,
    pdf: PdfRenderer,
    public_origin: String,
}

impl InvoiceWorkflow {
    pub fn new(
        repositories: &Repositories,
        mailer: InvoiceMailer,
        public_origin: impl Into<String>,
    ) -> Self {
        Self {
            invoices: repositories.invoices.clone(),
            profiles: repositories.profiles.clone(),
            email_logs: repositories.email_logs.clone(),
            numberer: InvoiceNumberer::new(repositories.counters.clone()),
            ledger: IncomeLedger::new(repositories.ledger.clone()),
            mailer,
            pdf: PdfRenderer,
            public_origin: public_origin.into(),
        }
    }

    pub fn ledger(&self) -> &IncomeLedger {
        &self.ledger
    }

    pub fn mailer(&self) -> &InvoiceMailer {
        &self.mailer
    }

    pub fn pdf(&self) -> &PdfRenderer {
        &self.pdf
    }

    #[instrument(skip(self, input))]
    pub async fn create_invoice(
        &self,
        user_id: &str,
        input: NewInvoice,
    ) -> Result<Invoice, AppError> {
        let profile = self
            .profiles
            .get(user_id)
            .await?
            .ok_or_else(|| AppError::missing_field("company profile"))?;

        let client_name = input.client_name.trim().to_string();
        if client_name.is_empty() {
            return Err(AppError::missing_field("client_name"));
        }
        let client_email = input.client_email.trim().to_string();
        if client_email.is_empty() {
            return Err(AppError::missing_field("client_email"));
        }

        let items: Vec<LineItem> = input
            .items
            .into_iter()
            .map(LineItem::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| AppError::BadRequest(anyhow::anyhow!("line item {}", e)))?
            .into_iter()
            .filter(LineItem::is_billable)
            .collect();
        if items.is_empty() {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "at least one line item with a description and a positive amount is required"
            )));
        }

        let totals = InvoiceTotals::compute(&items, profile.tax_percent)
            .map_err(|e| AppError::BadRequest(anyhow::anyhow!("invoice total {}", e)))?;
        let invoice_number = self
            .numberer
            .next_invoice_number(user_id, profile.prefix())
            .await;

        let notes = input
            .notes
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| profile.default_notes.clone());
        let terms = input
            .terms
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| profile.default_terms.clone());

        let invoice = Invoice {
            invoice_id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            invoice_number,
            client_name,
            client_email,
            client_address: input.client_address.filter(|a| !a.trim().is_empty()),
            issue_date: input.issue_date,
            due_date: input.due_date,
            items,
            subtotal: totals.subtotal,
            tax_rate: totals.tax_rate,
            tax: totals.tax,
            total: totals.total,
            notes,
            terms,
            status: InvoiceStatus::Draft,
            payment_link: None,
            company_profile: CompanySnapshot::from(&profile),
            created_at: Utc::now(),
            sent_at: None,
            viewed_at: None,
            paid_at: None,
            updated_at: None,
        };

        self.invoices.insert(&invoice).await?;
        INVOICES_TOTAL.with_label_values(&["draft"]).inc();
        tracing::info!(
            invoice_id = %invoice.invoice_id,
            invoice_number = %invoice.invoice_number,
            total = %invoice.total,
            "Invoice created"
        );

        // The document is regenerated on demand; a failure here only matters
        // for the log.
        if let Err(e) = self.pdf.render_invoice(&invoice) {
            ERRORS_TOTAL.with_label_values(&["pdf_render"]).inc();
            tracing::warn!(error = %e, invoice_id = %invoice.invoice_id, "Invoice PDF could not be generated");
        }

        Ok(invoice)
    }

    #[instrument(skip(self))]
    pub async fn get_invoice(&self, user_id: &str, invoice_id: &str) -> Result<Invoice, AppError> {
        self.invoices
            .get(user_id, invoice_id)
            .await?
            .ok_or_else(|| invoice_not_found(invoice_id))
    }

    #[instrument(skip(self))]
    pub async fn list_invoices(
        &self,
        user_id: &str,
        filter: InvoiceFilter,
    ) -> Result<Vec<Invoice>, AppError> {
        self.invoices.list(user_id, filter).await
    }

    /// The invoice together with its rendered PDF.
    #[instrument(skip(self))]
    pub async fn invoice_pdf(
        &self,
        user_id: &str,
        invoice_id: &str,
    ) -> Result<(Invoice, Vec<u8>), AppError> {
        let invoice = self.get_invoice(user_id, invoice_id).await?;
        let pdf = self.pdf.render_invoice(&invoice)?;
        Ok((invoice, pdf))
    }

    pub fn payment_link(&self, invoice: &Invoice) -> String {
        payment_link(&self.public_origin, invoice)
    }

    /// Emails the invoice and marks it sent. When delivery fails the invoice
    /// is left exactly as it was.
    #[instrument(skip(self, options))]
    pub async fn send_invoice(
        &self,
        user_id: &str,
        invoice_id: &str,
        options: SendOptions,
    ) -> Result<SendOutcome, AppError> {
        let invoice = self.get_invoice(user_id, invoice_id).await?;
        invoice
            .status
            .apply(Transition::Send)
            .map_err(transition_conflict)?;

        let company_name = invoice.company_profile.company_name.clone();
        let link = self.payment_link(&invoice);
        let subject = options
            .subject
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| template::default_subject(&invoice.invoice_number, &company_name));
        let message = options
            .message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| {
                template::default_message(
                    &invoice.client_name,
                    &invoice.invoice_number,
                    invoice.total,
                    invoice.due_date,
                    &company_name,
                )
            });

        let pdf = self.pdf.render_invoice(&invoice)?;

        let email_id = self
            .mailer
            .dispatch(&InvoiceEmail {
                user_id: user_id.to_string(),
                invoice_id: invoice.invoice_id.clone(),
                invoice_number: invoice.invoice_number.clone(),
                client_email: invoice.client_email.clone(),
                client_name: invoice.client_name.clone(),
                company_name,
                subject,
                message,
                amount_due: invoice.total,
                due_date: invoice.due_date,
                payment_link: link.clone(),
                pdf,
            })
            .await?;

        let change = StatusChange::sent(link, Utc::now());
        let invoice = match self
            .invoices
            .apply_status_change(user_id, invoice_id, &change)
            .await?
        {
            Some(updated) => updated,
            None => {
                // Status moved while the email was in flight
                let current = self.get_invoice(user_id, invoice_id).await?;
                tracing::warn!(
                    email_id = %email_id,
                    status = %current.status,
                    "Invoice emailed but status changed concurrently"
                );
                return Err(current
                    .status
                    .apply(Transition::Send)
                    .err()
                    .map(transition_conflict)
                    .unwrap_or_else(|| {
                        AppError::Conflict(anyhow::anyhow!(
                            "invoice {} changed while it was being sent",
                            invoice_id
                        ))
                    }));
            }
        };

        INVOICES_TOTAL.with_label_values(&["sent"]).inc();
        tracing::info!(
            invoice_number = %invoice.invoice_number,
            email_id = %email_id,
            "Invoice sent"
        );

        Ok(SendOutcome { invoice, email_id })
    }

    #[instrument(skip(self))]
    pub async fn mark_viewed(&self, user_id: &str, invoice_id: &str) -> Result<Invoice, AppError> {
        let invoice = self.get_invoice(user_id, invoice_id).await?;
        invoice
            .status
            .apply(Transition::View)
            .map_err(transition_conflict)?;

        let change = StatusChange::viewed(Utc::now());
        match self
            .invoices
            .apply_status_change(user_id, invoice_id, &change)
            .await?
        {
            Some(updated) => {
                INVOICES_TOTAL.with_label_values(&["viewed"]).inc();
                Ok(updated)
            }
            None => {
                let current = self.get_invoice(user_id, invoice_id).await?;
                Err(transition_conflict(TransitionError {
                    from: current.status,
                    transition: Transition::View,
                }))
            }
        }
    }

    /// Settles an invoice: credits the ledger first, then marks it paid.
    ///
    /// Safe to repeat. An invoice that is already paid is returned unchanged;
    /// a retry after a failed status write finds the existing ledger entry and
    /// only flips the status.
    #[instrument(skip(self))]
    pub async fn mark_paid(&self, user_id: &str, invoice_id: &str) -> Result<Settlement, AppError> {
        let invoice = self.get_invoice(user_id, invoice_id).await?;
        if invoice.status.is_paid() {
            return Ok(Settlement {
                invoice,
                entry: None,
                newly_credited: false,
            });
        }

        let (entry, newly_credited) = self.ledger.credit_invoice(&invoice).await?;

        let change = StatusChange::paid(Utc::now());
        let invoice = match self
            .invoices
            .apply_status_change(user_id, invoice_id, &change)
            .await?
        {
            Some(updated) => {
                INVOICES_TOTAL.with_label_values(&["paid"]).inc();
                updated
            }
            // Only a concurrent settlement can get here first
            None => self.get_invoice(user_id, invoice_id).await?,
        };

        tracing::info!(
            invoice_number = %invoice.invoice_number,
            entry_id = %entry.entry_id,
            newly_credited,
            "Invoice settled"
        );

        Ok(Settlement {
            invoice,
            entry: Some(entry),
            newly_credited,
        })
    }

    /// Delivery attempts recorded for an invoice, oldest first.
    #[instrument(skip(self))]
    pub async fn delivery_history(
        &self,
        user_id: &str,
        invoice_id: &str,
    ) -> Result<Vec<EmailLog>, AppError> {
        let invoice = self.get_invoice(user_id, invoice_id).await?;
        self.email_logs
            .list_for_invoice(user_id, &invoice.invoice_id)
            .await
    }
}
