use crate::middleware::UserId;
use crate::models::CompanyProfileRequest;
use crate::services::pdf::Rgb;
use crate::startup::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use service_core::error::AppError;
use validator::Validate;

pub async fn get_profile(
    State(state): State<AppState>,
    user_id: UserId,
) -> Result<impl IntoResponse, AppError> {
    let profile = state
        .repositories
        .profiles
        .get(&user_id.0)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Company profile not found")))?;
    Ok(Json(profile))
}

pub async fn put_profile(
    State(state): State<AppState>,
    user_id: UserId,
    Json(request): Json<CompanyProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    request.validate()?;
    if let Some(color) = request.brand_color.as_deref().filter(|c| !c.trim().is_empty()) {
        if Rgb::from_hex(color).is_none() {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "brand_color must look like #rrggbb, got '{}'",
                color
            )));
        }
    }

    let profile = request.into_profile(&user_id.0);
    state.repositories.profiles.upsert(&profile).await?;

    tracing::info!(user_id = %user_id.0, company = %profile.company_name, "Company profile saved");

    Ok(Json(profile))
}
