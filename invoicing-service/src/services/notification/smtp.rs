use super::{EmailMessage, EmailProvider, ProviderError, ProviderResponse};
use crate::config::SmtpConfig;
use async_trait::async_trait;
use lettre::{
    message::{
        header::{ContentType, HeaderName, HeaderValue},
        Attachment, Mailbox, MultiPart, SinglePart,
    },
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use secrecy::ExposeSecret;

pub struct SmtpProvider {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpProvider {
    pub fn new(config: &SmtpConfig) -> Result<Self, ProviderError> {
        let creds = Credentials::new(
            config.user.clone(),
            config.password.expose_secret().clone(),
        );

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| {
                ProviderError::Configuration(format!("Failed to create SMTP relay: {}", e))
            })?
            .port(config.port)
            .credentials(creds)
            .build();

        Ok(Self { transport })
    }

    fn build_message(email: &EmailMessage) -> Result<Message, ProviderError> {
        let from_mailbox: Mailbox = email
            .from
            .parse()
            .map_err(|e| ProviderError::Configuration(format!("Invalid from address: {}", e)))?;

        let to = match &email.to_name {
            Some(name) => format!("\"{}\" <{}>", name.replace('"', ""), email.to),
            None => email.to.clone(),
        };
        let to_mailbox: Mailbox = to
            .parse()
            .map_err(|e| ProviderError::InvalidRecipient(format!("Invalid recipient: {}", e)))?;

        let mut message_builder = Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(&email.subject);

        for (name, value) in &email.headers {
            let header_name = HeaderName::new_from_ascii(name.clone()).map_err(|e| {
                ProviderError::SendFailed(format!("Invalid header name {}: {}", name, e))
            })?;
            message_builder =
                message_builder.raw_header(HeaderValue::new(header_name, value.clone()));
        }

        let bodies = MultiPart::alternative()
            .singlepart(
                SinglePart::builder()
                    .header(ContentType::TEXT_PLAIN)
                    .body(email.body_text.clone()),
            )
            .singlepart(
                SinglePart::builder()
                    .header(ContentType::TEXT_HTML)
                    .body(email.body_html.clone()),
            );

        let mut mixed = MultiPart::mixed().multipart(bodies);
        for attachment in &email.attachments {
            let content_type = ContentType::parse(&attachment.content_type).map_err(|e| {
                ProviderError::SendFailed(format!(
                    "Invalid attachment content type {}: {}",
                    attachment.content_type, e
                ))
            })?;
            mixed = mixed.singlepart(
                Attachment::new(attachment.filename.clone())
                    .body(attachment.content.clone(), content_type),
            );
        }

        message_builder
            .multipart(mixed)
            .map_err(|e| ProviderError::SendFailed(format!("Failed to build message: {}", e)))
    }
}

#[async_trait]
impl EmailProvider for SmtpProvider {
    async fn send(&self, email: &EmailMessage) -> Result<ProviderResponse, ProviderError> {
        let message = Self::build_message(email)?;

        let response = self
            .transport
            .send(message)
            .await
            .map_err(|e| ProviderError::SendFailed(format!("Failed to send email: {}", e)))?;

        let provider_id = response.message().next().map(|s| s.to_string());

        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            "Email sent successfully"
        );

        Ok(ProviderResponse::success(provider_id))
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        self.transport.test_connection().await.map_err(|e| {
            ProviderError::Connection(format!("SMTP connection test failed: {}", e))
        })?;
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "smtp"
    }
}
