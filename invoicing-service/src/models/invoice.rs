//! Invoice model for invoicing-service.

use super::CompanyProfile;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Invoice status.
///
/// Lifecycle is forward-only: `draft → sent → viewed → paid`. `pending` is a
/// legacy alias of `draft`; it is accepted when read back but never assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Viewed,
    Paid,
    Pending,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::Viewed => "viewed",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Pending => "pending",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(InvoiceStatus::Draft),
            "sent" => Some(InvoiceStatus::Sent),
            "viewed" => Some(InvoiceStatus::Viewed),
            "paid" => Some(InvoiceStatus::Paid),
            "pending" => Some(InvoiceStatus::Pending),
            _ => None,
        }
    }

    pub fn is_paid(&self) -> bool {
        matches!(self, InvoiceStatus::Paid)
    }

    /// Status after applying `transition`, or why it is not allowed.
    pub fn apply(self, transition: Transition) -> Result<InvoiceStatus, TransitionError> {
        if transition.allowed_from().contains(&self) {
            Ok(transition.target())
        } else {
            Err(TransitionError {
                from: self,
                transition,
            })
        }
    }
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Workflow operations that move an invoice along its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Send,
    View,
    Pay,
}

impl Transition {
    /// Statuses this transition may start from. Stores use this list as the
    /// guard of their conditional update.
    pub fn allowed_from(&self) -> &'static [InvoiceStatus] {
        match self {
            // Re-sending a sent invoice refreshes the link and timestamp.
            Transition::Send => &[
                InvoiceStatus::Draft,
                InvoiceStatus::Pending,
                InvoiceStatus::Sent,
            ],
            Transition::View => &[InvoiceStatus::Sent],
            Transition::Pay => &[
                InvoiceStatus::Draft,
                InvoiceStatus::Pending,
                InvoiceStatus::Sent,
                InvoiceStatus::Viewed,
            ],
        }
    }

    pub fn target(&self) -> InvoiceStatus {
        match self {
            Transition::Send => InvoiceStatus::Sent,
            Transition::View => InvoiceStatus::Viewed,
            Transition::Pay => InvoiceStatus::Paid,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Transition::Send => "send",
            Transition::View => "mark viewed",
            Transition::Pay => "mark paid",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot {} an invoice that is {from}", transition.as_str())]
pub struct TransitionError {
    pub from: InvoiceStatus,
    pub transition: Transition,
}

/// Line item as submitted by the client, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItemInput {
    #[serde(default)]
    pub description: String,
    pub quantity: Decimal,
    pub rate: Decimal,
}

/// Raised when a money amount cannot be held at cent precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("amount is too large")]
pub struct AmountOverflow;

/// Rounds half away from zero and fixes the scale at two decimals.
pub fn to_cents(amount: Decimal) -> Result<Decimal, AmountOverflow> {
    let mut cents = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    cents.rescale(2);
    if cents.scale() == 2 {
        Ok(cents)
    } else {
        Err(AmountOverflow)
    }
}

/// Line item on an invoice. `amount` is `quantity × rate` to the cent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub description: String,
    pub quantity: Decimal,
    pub rate: Decimal,
    pub amount: Decimal,
}

impl LineItem {
    pub fn new(
        description: impl Into<String>,
        quantity: Decimal,
        rate: Decimal,
    ) -> Result<Self, AmountOverflow> {
        let amount = quantity.checked_mul(rate).ok_or(AmountOverflow)?;
        Ok(Self {
            description: description.into(),
            quantity,
            rate,
            amount: to_cents(amount)?,
        })
    }

    /// Items without a description or with a non-positive amount are dropped
    /// before totals are computed.
    pub fn is_billable(&self) -> bool {
        !self.description.trim().is_empty() && self.amount > Decimal::ZERO
    }
}

impl TryFrom<LineItemInput> for LineItem {
    type Error = AmountOverflow;

    fn try_from(input: LineItemInput) -> Result<Self, Self::Error> {
        LineItem::new(input.description.trim(), input.quantity, input.rate)
    }
}

/// Amount with exactly two decimals, e.g. `108.00`.
pub fn format_amount(amount: Decimal) -> String {
    format!(
        "{:.2}",
        amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    )
}

/// Money totals of an invoice, computed together and persisted together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceTotals {
    pub subtotal: Decimal,
    pub tax_rate: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

impl InvoiceTotals {
    /// `tax = subtotal × tax_rate / 100`, rounded to the cent. Every amount
    /// carries exactly two decimals.
    pub fn compute(items: &[LineItem], tax_rate: Decimal) -> Result<Self, AmountOverflow> {
        let subtotal = items.iter().try_fold(Decimal::ZERO, |sum, item| {
            sum.checked_add(item.amount).ok_or(AmountOverflow)
        })?;
        let subtotal = to_cents(subtotal)?;
        let tax = subtotal
            .checked_mul(tax_rate)
            .and_then(|t| t.checked_div(Decimal::ONE_HUNDRED))
            .ok_or(AmountOverflow)
            .and_then(to_cents)?;
        let total = subtotal
            .checked_add(tax)
            .ok_or(AmountOverflow)
            .and_then(to_cents)?;

        Ok(Self {
            subtotal,
            tax_rate,
            tax,
            total,
        })
    }
}

/// Copy of the issuing company's profile taken when the invoice is created.
/// Later profile edits never reach existing invoices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanySnapshot {
    pub company_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand_color: Option<String>,
}

impl From<&CompanyProfile> for CompanySnapshot {
    fn from(profile: &CompanyProfile) -> Self {
        Self {
            company_name: profile.company_name.clone(),
            email: profile.email.clone(),
            phone: profile.phone.clone(),
            address: profile.address.clone(),
            brand_color: profile.brand_color.clone(),
        }
    }
}

/// Invoice document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub invoice_id: String,
    pub user_id: String,
    pub invoice_number: String,
    pub client_name: String,
    pub client_email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_address: Option<String>,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub items: Vec<LineItem>,
    pub subtotal: Decimal,
    pub tax_rate: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub terms: String,
    pub status: InvoiceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_link: Option<String>,
    pub company_profile: CompanySnapshot,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Invoice {
    pub fn totals(&self) -> InvoiceTotals {
        InvoiceTotals {
            subtotal: self.subtotal,
            tax_rate: self.tax_rate,
            tax: self.tax,
            total: self.total,
        }
    }

    /// Apply a status change in memory, stamping the matching timestamp.
    /// Stores persist the same fields in a single update.
    pub fn apply_status_change(&mut self, change: &StatusChange) {
        self.status = change.transition.target();
        self.updated_at = Some(change.at);
        match change.transition {
            Transition::Send => {
                self.sent_at = Some(change.at);
                self.payment_link = change.payment_link.clone();
            }
            Transition::View => self.viewed_at = Some(change.at),
            Transition::Pay => self.paid_at = Some(change.at),
        }
    }
}

/// Fields written by one lifecycle transition.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub transition: Transition,
    pub at: DateTime<Utc>,
    /// Only carried by `Send`.
    pub payment_link: Option<String>,
}

impl StatusChange {
    pub fn sent(payment_link: String, at: DateTime<Utc>) -> Self {
        Self {
            transition: Transition::Send,
            at,
            payment_link: Some(payment_link),
        }
    }

    pub fn viewed(at: DateTime<Utc>) -> Self {
        Self {
            transition: Transition::View,
            at,
            payment_link: None,
        }
    }

    pub fn paid(at: DateTime<Utc>) -> Self {
        Self {
            transition: Transition::Pay,
            at,
            payment_link: None,
        }
    }
}

/// Input for creating an invoice.
#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub client_name: String,
    pub client_email: String,
    pub client_address: Option<String>,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub items: Vec<LineItemInput>,
    pub notes: Option<String>,
    pub terms: Option<String>,
}

/// Filter parameters for listing invoices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InvoiceFilter {
    #[default]
    All,
    /// Everything not yet paid.
    Outstanding,
    Paid,
    Status(InvoiceStatus),
}

impl InvoiceFilter {
    pub fn matches(&self, status: InvoiceStatus) -> bool {
        match self {
            InvoiceFilter::All => true,
            InvoiceFilter::Outstanding => !status.is_paid(),
            InvoiceFilter::Paid => status.is_paid(),
            InvoiceFilter::Status(wanted) => *wanted == status,
        }
    }
}
