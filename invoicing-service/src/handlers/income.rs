use crate::dtos::IncomeListParams;
use crate::middleware::UserId;
use crate::models::NewIncomeEntry;
use crate::startup::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

pub async fn list_income(
    State(state): State<AppState>,
    user_id: UserId,
    Query(params): Query<IncomeListParams>,
) -> Result<impl IntoResponse, AppError> {
    let summary = state
        .workflow
        .ledger()
        .recent(&user_id.0, params.limit())
        .await?;
    Ok(Json(summary))
}

pub async fn record_income(
    State(state): State<AppState>,
    user_id: UserId,
    Json(entry): Json<NewIncomeEntry>,
) -> Result<impl IntoResponse, AppError> {
    let entry = state.workflow.ledger().record(&user_id.0, entry).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}
