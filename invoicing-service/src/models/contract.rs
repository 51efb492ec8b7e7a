use chrono::NaiveDate;
use serde::Deserialize;
use validator::Validate;

/// Agreement rendered as a PDF. Contracts are not persisted.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ContractRequest {
    #[validate(length(min = 1))]
    pub contract_number: String,
    #[validate(length(min = 1))]
    pub client_name: String,
    #[serde(default)]
    #[validate(email)]
    pub client_email: Option<String>,
    pub issue_date: NaiveDate,
    #[validate(length(min = 1))]
    pub scope_of_work: String,
    /// Free-form compensation line, e.g. "$85/hour, billed monthly".
    #[validate(length(min = 1))]
    pub rate_label: String,
    #[serde(default)]
    pub terms: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}
