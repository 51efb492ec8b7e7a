//! Public payment page routes. These carry no `X-User-ID`; the invoice id in
//! the link is the only handle.

use crate::dtos::PaymentLinkParams;
use crate::services::payment::PaymentRequest;
use crate::startup::AppState;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

pub async fn payment_summary(
    State(state): State<AppState>,
    Query(params): Query<PaymentLinkParams>,
) -> Result<impl IntoResponse, AppError> {
    let summary = state
        .payments
        .summary(&params.invoice, params.amount.as_deref())
        .await?;
    Ok(Json(summary))
}

pub async fn submit_payment(
    State(state): State<AppState>,
    Json(request): Json<PaymentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let receipt = state.payments.pay(request).await?;
    Ok(Json(receipt))
}
