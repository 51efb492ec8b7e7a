use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailLogStatus {
    Sent,
    Failed,
}

impl std::fmt::Display for EmailLogStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmailLogStatus::Sent => write!(f, "sent"),
            EmailLogStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Audit record of one delivery attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailLog {
    pub invoice_id: String,
    pub invoice_number: String,
    pub user_id: String,
    pub client_email: String,
    pub client_name: String,
    pub status: EmailLogStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub sent_at: DateTime<Utc>,
}
