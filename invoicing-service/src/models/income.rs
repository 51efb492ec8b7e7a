use super::invoice::Invoice;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncomeCategory {
    #[default]
    Service,
    Product,
    Consulting,
    Other,
}

impl std::fmt::Display for IncomeCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IncomeCategory::Service => write!(f, "service"),
            IncomeCategory::Product => write!(f, "product"),
            IncomeCategory::Consulting => write!(f, "consulting"),
            IncomeCategory::Other => write!(f, "other"),
        }
    }
}

/// A ledger entry. Entries are never edited once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomeEntry {
    pub entry_id: String,
    pub user_id: String,
    pub amount: Decimal,
    pub description: String,
    pub date: NaiveDate,
    pub category: IncomeCategory,
    /// Invoice number of the invoice this entry settles, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewIncomeEntry {
    pub amount: Decimal,
    #[serde(default)]
    pub description: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub category: IncomeCategory,
}

impl IncomeEntry {
    /// Manual entry. Never carries an invoice reference.
    pub fn new(user_id: &str, entry: NewIncomeEntry) -> Self {
        Self {
            entry_id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            amount: entry.amount,
            description: entry.description,
            date: entry.date,
            category: entry.category,
            invoice_reference: None,
            created_at: Utc::now(),
        }
    }

    /// Settlement entry crediting the invoice total as service income.
    pub fn settlement(invoice: &Invoice, date: NaiveDate) -> Self {
        Self {
            entry_id: uuid::Uuid::new_v4().to_string(),
            user_id: invoice.user_id.clone(),
            amount: invoice.total,
            description: format!("Invoice {} - {}", invoice.invoice_number, invoice.client_name),
            date,
            category: IncomeCategory::Service,
            invoice_reference: Some(invoice.invoice_number.clone()),
            created_at: Utc::now(),
        }
    }
}

/// Most recent entries and the sum of their amounts.
#[derive(Debug, Clone, Serialize)]
pub struct IncomeSummary {
    pub entries: Vec<IncomeEntry>,
    pub total: Decimal,
}

impl IncomeSummary {
    pub fn from_entries(entries: Vec<IncomeEntry>) -> Self {
        let total = entries.iter().map(|e| e.amount).sum();
        Self { entries, total }
    }
}
