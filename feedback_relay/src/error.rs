//! Error types for feedback delivery

use thiserror::Error;

/// Failure of a single delivery channel
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Credentials rejected or could not be produced
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Target document, sheet or mailbox does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Transport-level failure
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Remote service answered with an error status
    #[error("Rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// SMTP submission failed
    #[error("SMTP error: {0}")]
    Smtp(String),

    /// Channel is misconfigured
    #[error("Configuration error: {0}")]
    Config(String),

    /// Payload failed validation
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Local file access (credential files)
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, DeliveryError>;

impl From<jsonwebtoken::errors::Error> for DeliveryError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        DeliveryError::Auth(err.to_string())
    }
}

impl From<lettre::transport::smtp::Error> for DeliveryError {
    fn from(err: lettre::transport::smtp::Error) -> Self {
        DeliveryError::Smtp(err.to_string())
    }
}

impl From<lettre::address::AddressError> for DeliveryError {
    fn from(err: lettre::address::AddressError) -> Self {
        DeliveryError::Config(format!("invalid e-mail address: {}", err))
    }
}
