//! Outbound certificate email.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::config::MailConfig;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("could not build message: {0}")]
    Message(String),

    #[error("smtp delivery failed: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("attachment unreadable: {0}")]
    Attachment(#[from] std::io::Error),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_certificate_email(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
        attachment: &Path,
    ) -> Result<(), MailError>;
}

/// Build the configured mailer; without `SMTP_HOST` messages are only logged.
pub fn from_config(config: &MailConfig) -> Result<Arc<dyn Mailer>, MailError> {
    match &config.smtp_host {
        Some(host) => Ok(Arc::new(SmtpMailer::new(config, host)?)),
        None => {
            tracing::warn!("SMTP_HOST not set, certificate emails will only be logged");
            Ok(Arc::new(LogMailer))
        }
    }
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig, host: &str) -> Result<Self, MailError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(host)?;
        if let (Some(username), Some(password)) = (&config.smtp_username, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from: config.from.parse()?,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_certificate_email(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
        attachment: &Path,
    ) -> Result<(), MailError> {
        let content = tokio::fs::read(attachment).await?;
        let filename = attachment
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("certificate.pdf")
            .to_string();
        let content_type = ContentType::parse(
            mime_guess::from_path(attachment)
                .first_raw()
                .unwrap_or("application/octet-stream"),
        )
        .map_err(|e| MailError::Message(e.to_string()))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(recipient.parse()?)
            .subject(subject)
            .multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::plain(body.to_string()))
                    .singlepart(Attachment::new(filename).body(content, content_type)),
            )
            .map_err(|e| MailError::Message(e.to_string()))?;

        self.transport.send(message).await?;
        info!("Certificate email sent to {}", recipient);
        Ok(())
    }
}

pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_certificate_email(
        &self,
        recipient: &str,
        subject: &str,
        _body: &str,
        attachment: &Path,
    ) -> Result<(), MailError> {
        info!(
            "Mail delivery disabled; would send {:?} to {} with {}",
            subject,
            recipient,
            attachment.display()
        );
        Ok(())
    }
}
