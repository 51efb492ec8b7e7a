use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

pub const DEFAULT_INVOICE_PREFIX: &str = "INV";
pub const DEFAULT_TERMS: &str = "Payment due within 30 days";

/// Company profile, one per user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub user_id: String,
    pub company_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand_color: Option<String>,
    #[serde(default)]
    pub tax_percent: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_prefix: Option<String>,
    #[serde(default)]
    pub default_notes: String,
    #[serde(default = "default_terms")]
    pub default_terms: String,
    pub updated_at: DateTime<Utc>,
}

fn default_terms() -> String {
    DEFAULT_TERMS.to_string()
}

impl CompanyProfile {
    /// Prefix used when numbering invoices; blank prefixes fall back to `INV`.
    pub fn prefix(&self) -> &str {
        self.invoice_prefix
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or(DEFAULT_INVOICE_PREFIX)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CompanyProfileRequest {
    #[validate(length(min = 1, max = 200))]
    pub company_name: String,
    #[validate(email)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub brand_color: Option<String>,
    #[serde(default)]
    pub tax_percent: Decimal,
    #[serde(default)]
    #[validate(length(max = 16))]
    pub invoice_prefix: Option<String>,
    #[serde(default)]
    pub default_notes: String,
    #[serde(default)]
    pub default_terms: Option<String>,
}

impl CompanyProfileRequest {
    pub fn into_profile(self, user_id: &str) -> CompanyProfile {
        CompanyProfile {
            user_id: user_id.to_string(),
            company_name: self.company_name.trim().to_string(),
            email: self.email,
            phone: self.phone,
            address: self.address,
            brand_color: self.brand_color.filter(|c| !c.trim().is_empty()),
            tax_percent: self.tax_percent,
            invoice_prefix: self.invoice_prefix,
            default_notes: self.default_notes,
            default_terms: self
                .default_terms
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(default_terms),
            updated_at: Utc::now(),
        }
    }
}
