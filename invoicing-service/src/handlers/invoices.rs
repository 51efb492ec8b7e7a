use crate::dtos::{
    CreateInvoiceRequest, InvoiceListParams, InvoiceListResponse, SendInvoiceRequest,
    SendInvoiceResponse,
};
use crate::handlers::pdf_attachment;
use crate::middleware::UserId;
use crate::startup::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use service_core::error::AppError;

pub async fn create_invoice(
    State(state): State<AppState>,
    user_id: UserId,
    Json(request): Json<CreateInvoiceRequest>,
) -> Result<impl IntoResponse, AppError> {
    let new_invoice = request.into_new_invoice(Utc::now().date_naive());
    let invoice = state.workflow.create_invoice(&user_id.0, new_invoice).await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

pub async fn list_invoices(
    State(state): State<AppState>,
    user_id: UserId,
    Query(params): Query<InvoiceListParams>,
) -> Result<impl IntoResponse, AppError> {
    let invoices = state
        .workflow
        .list_invoices(&user_id.0, params.filter()?)
        .await?;
    Ok(Json(InvoiceListResponse {
        total: invoices.len(),
        invoices,
    }))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    user_id: UserId,
    Path(invoice_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let invoice = state.workflow.get_invoice(&user_id.0, &invoice_id).await?;
    Ok(Json(invoice))
}

pub async fn invoice_pdf(
    State(state): State<AppState>,
    user_id: UserId,
    Path(invoice_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let (invoice, pdf) = state.workflow.invoice_pdf(&user_id.0, &invoice_id).await?;
    Ok(pdf_attachment(
        &format!("{}.pdf", invoice.invoice_number),
        pdf,
    ))
}

pub async fn send_invoice(
    State(state): State<AppState>,
    user_id: UserId,
    Path(invoice_id): Path<String>,
    request: Option<Json<SendInvoiceRequest>>,
) -> Result<impl IntoResponse, AppError> {
    let options = request.map(|Json(r)| r).unwrap_or_default().into();
    let outcome = state
        .workflow
        .send_invoice(&user_id.0, &invoice_id, options)
        .await?;
    Ok(Json(SendInvoiceResponse {
        invoice: outcome.invoice,
        email_id: outcome.email_id,
    }))
}

pub async fn mark_viewed(
    State(state): State<AppState>,
    user_id: UserId,
    Path(invoice_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let invoice = state.workflow.mark_viewed(&user_id.0, &invoice_id).await?;
    Ok(Json(invoice))
}

pub async fn mark_paid(
    State(state): State<AppState>,
    user_id: UserId,
    Path(invoice_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let settlement = state.workflow.mark_paid(&user_id.0, &invoice_id).await?;
    Ok(Json(settlement))
}

pub async fn email_history(
    State(state): State<AppState>,
    user_id: UserId,
    Path(invoice_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let logs = state
        .workflow
        .delivery_history(&user_id.0, &invoice_id)
        .await?;
    Ok(Json(logs))
}
