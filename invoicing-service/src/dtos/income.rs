use crate::services::ledger::DEFAULT_RECENT_LIMIT;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct IncomeListParams {
    pub limit: Option<usize>,
}

impl IncomeListParams {
    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_RECENT_LIMIT)
    }
}
