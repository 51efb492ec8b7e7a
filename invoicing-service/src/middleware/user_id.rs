use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use service_core::error::AppError;

pub const USER_ID_HEADER: &str = "X-User-ID";

/// Caller identity for `/api/*` routes.
///
/// The gateway in front of this service authenticates the user and forwards
/// the id in `X-User-ID`. Every stored record is scoped by it.
#[derive(Debug, Clone)]
pub struct UserId(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for UserId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AppError::AuthError(anyhow::anyhow!("Missing X-User-ID header")))?;

        tracing::Span::current().record("user_id", user_id);

        Ok(UserId(user_id.to_string()))
    }
}
