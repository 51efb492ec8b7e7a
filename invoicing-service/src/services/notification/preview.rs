use super::{EmailMessage, EmailProvider, ProviderError, ProviderResponse};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Development delivery: logs the message and keeps it in memory instead of
/// sending it. Nothing leaves the process.
#[derive(Default)]
pub struct PreviewEmailProvider {
    sent: AtomicU64,
    outbox: DashMap<String, EmailMessage>,
}

impl PreviewEmailProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// A previously previewed message by its `preview-<n>` id.
    pub fn get(&self, email_id: &str) -> Option<EmailMessage> {
        self.outbox.get(email_id).map(|m| m.clone())
    }

    pub fn len(&self) -> usize {
        self.outbox.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outbox.is_empty()
    }
}

#[async_trait]
impl EmailProvider for PreviewEmailProvider {
    async fn send(&self, email: &EmailMessage) -> Result<ProviderResponse, ProviderError> {
        let n = self.sent.fetch_add(1, Ordering::SeqCst) + 1;
        let email_id = format!("preview-{}", n);

        tracing::info!(
            email_id = %email_id,
            from = %email.from,
            to = %email.to,
            subject = %email.subject,
            attachments = email.attachments.len(),
            "[PREVIEW] Email not sent, kept for preview"
        );
        tracing::debug!(body = %email.body_text, "[PREVIEW] Email body");

        self.outbox.insert(email_id.clone(), email.clone());
        Ok(ProviderResponse::success(Some(email_id)))
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "preview"
    }
}
