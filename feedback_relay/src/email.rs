//! E-mail channel: self-addressed SMTP delivery over implicit TLS

use crate::channel::DeliveryChannel;
use crate::error::{DeliveryError, Result};
use crate::payload::FeedbackPayload;
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Mailbox, Message};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use tracing::info;

pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
pub const DEFAULT_SMTP_PORT: u16 = 465;

const SENDER_NAME: &str = "Forecast Feedback";

/// SMTP account used both as sender and recipient
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub address: String,
    pub app_password: String,
}

impl EmailConfig {
    pub fn new(address: impl Into<String>, app_password: impl Into<String>) -> Self {
        Self {
            smtp_host: DEFAULT_SMTP_HOST.to_string(),
            smtp_port: DEFAULT_SMTP_PORT,
            address: address.into(),
            app_password: app_password.into(),
        }
    }

    pub fn with_relay(mut self, host: impl Into<String>, port: u16) -> Self {
        self.smtp_host = host.into();
        self.smtp_port = port;
        self
    }
}

/// Compose the self-addressed feedback message
pub fn build_message(mailbox: &Mailbox, payload: &FeedbackPayload) -> Result<Message> {
    Message::builder()
        .from(mailbox.clone())
        .to(mailbox.clone())
        .subject(payload.email_subject())
        .header(ContentType::TEXT_PLAIN)
        .body(payload.email_body())
        .map_err(|e| DeliveryError::InvalidPayload(format!("cannot build e-mail: {}", e)))
}

/// Sends one message per submission to the configured inbox
pub struct EmailChannel {
    mailbox: Mailbox,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl EmailChannel {
    pub fn new(config: EmailConfig) -> Result<Self> {
        if config.app_password.trim().is_empty() {
            return Err(DeliveryError::Config("missing SMTP app password".to_string()));
        }

        let address: Address = config.address.parse()?;
        let mailbox = Mailbox::new(Some(SENDER_NAME.to_string()), address);

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(Credentials::new(config.address, config.app_password))
            .build();

        Ok(Self { mailbox, transport })
    }

    pub fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }
}

#[async_trait]
impl DeliveryChannel for EmailChannel {
    fn name(&self) -> &str {
        "email"
    }

    async fn deliver(&self, payload: &FeedbackPayload) -> Result<()> {
        let message = build_message(&self.mailbox, payload)?;
        self.transport.send(message).await?;

        info!(
            to = %self.mailbox.email,
            session = %payload.session_id,
            "feedback e-mail sent"
        );
        Ok(())
    }
}
