use crate::handlers::pdf_attachment;
use crate::middleware::UserId;
use crate::models::{CompanySnapshot, ContractRequest};
use crate::startup::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use service_core::error::AppError;
use validator::Validate;

/// Renders an agreement under the caller's company profile. Nothing is stored.
pub async fn contract_pdf(
    State(state): State<AppState>,
    user_id: UserId,
    Json(request): Json<ContractRequest>,
) -> Result<impl IntoResponse, AppError> {
    request.validate()?;

    let profile = state
        .repositories
        .profiles
        .get(&user_id.0)
        .await?
        .ok_or_else(|| AppError::missing_field("company profile"))?;

    let pdf = state
        .workflow
        .pdf()
        .render_contract(&request, &CompanySnapshot::from(&profile))?;

    tracing::info!(contract_number = %request.contract_number, "Contract rendered");

    Ok(pdf_attachment(
        &format!("{}.pdf", request.contract_number),
        pdf,
    ))
}
