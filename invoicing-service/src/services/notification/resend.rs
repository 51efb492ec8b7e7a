use super::{EmailMessage, EmailProvider, ProviderError, ProviderResponse};
use crate::config::ResendConfig;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::{Client, StatusCode};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Delivers email through the Resend HTTP API.
pub struct ResendProvider {
    config: ResendConfig,
    client: Client,
}

#[derive(Debug, Serialize)]
struct ResendRequest<'a> {
    from: &'a str,
    to: Vec<&'a str>,
    subject: &'a str,
    html: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attachments: Vec<ResendAttachment<'a>>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    headers: HashMap<&'a str, &'a str>,
}

#[derive(Debug, Serialize)]
struct ResendAttachment<'a> {
    filename: &'a str,
    /// Base64 encoded file content.
    content: String,
}

#[derive(Debug, Deserialize)]
struct ResendResponse {
    id: Option<String>,
}

impl ResendProvider {
    pub fn new(config: ResendConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    fn request<'a>(email: &'a EmailMessage) -> ResendRequest<'a> {
        ResendRequest {
            from: &email.from,
            to: vec![email.to.as_str()],
            subject: &email.subject,
            html: &email.body_html,
            text: &email.body_text,
            attachments: email
                .attachments
                .iter()
                .map(|a| ResendAttachment {
                    filename: &a.filename,
                    content: BASE64.encode(&a.content),
                })
                .collect(),
            headers: email
                .headers
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect(),
        }
    }
}

#[async_trait]
impl EmailProvider for ResendProvider {
    async fn send(&self, email: &EmailMessage) -> Result<ProviderResponse, ProviderError> {
        let url = format!("{}/emails", self.config.api_url.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.config.api_key.expose_secret())
            .json(&Self::request(email))
            .send()
            .await
            .map_err(|e| {
                ProviderError::Connection(format!("Failed to connect to Resend: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    ProviderError::Authentication(format!("Resend rejected API key: {}", body))
                }
                StatusCode::UNPROCESSABLE_ENTITY => ProviderError::InvalidRecipient(body),
                _ => ProviderError::SendFailed(format!(
                    "Resend API returned error status {}: {}",
                    status, body
                )),
            });
        }

        let parsed: ResendResponse = response.json().await.map_err(|e| {
            ProviderError::SendFailed(format!("Failed to parse Resend response: {}", e))
        })?;

        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            email_id = ?parsed.id,
            "Email sent successfully via Resend"
        );

        Ok(ProviderResponse::success(parsed.id))
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        if self.config.api_key.expose_secret().is_empty() {
            return Err(ProviderError::Configuration(
                "Resend API key is not configured".to_string(),
            ));
        }
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "resend"
    }
}
