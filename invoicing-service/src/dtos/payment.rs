use serde::Deserialize;

/// Query string of a payment link: `/pay?invoice=<id>&amount=<total>`.
#[derive(Debug, Deserialize)]
pub struct PaymentLinkParams {
    #[serde(default)]
    pub invoice: String,
    pub amount: Option<String>,
}
