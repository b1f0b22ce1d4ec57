//! Ordered fallback delivery of feedback submissions

use crate::channel::DeliveryChannel;
use crate::payload::FeedbackPayload;
use serde::Serialize;
use std::fmt;
use tracing::{error, info, warn};

/// Final result of one submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// The first channel accepted the submission
    DeliveredPrimary { channel: String },
    /// A later channel accepted it after earlier ones failed
    DeliveredFallback { channel: String },
    /// Every channel failed; `reason` is the last error
    Failed { reason: String },
}

impl DispatchOutcome {
    pub fn is_delivered(&self) -> bool {
        !matches!(self, DispatchOutcome::Failed { .. })
    }

    /// Status line shown to the respondent
    pub fn user_message(&self) -> String {
        match self {
            DispatchOutcome::DeliveredPrimary { .. } => {
                "Thank you! Your feedback has been recorded.".to_string()
            }
            DispatchOutcome::DeliveredFallback { .. } => {
                "Thank you! Your feedback has been sent by e-mail.".to_string()
            }
            DispatchOutcome::Failed { reason } => {
                format!("Your feedback could not be delivered: {}", reason)
            }
        }
    }
}

impl fmt::Display for DispatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchOutcome::DeliveredPrimary { channel } => write!(f, "delivered-primary ({})", channel),
            DispatchOutcome::DeliveredFallback { channel } => write!(f, "delivered-fallback ({})", channel),
            DispatchOutcome::Failed { reason } => write!(f, "failed: {}", reason),
        }
    }
}

/// Tries each channel once, in order, until one succeeds
#[derive(Default)]
pub struct FeedbackDispatcher {
    channels: Vec<Box<dyn DeliveryChannel>>,
}

impl FeedbackDispatcher {
    pub fn new(channels: Vec<Box<dyn DeliveryChannel>>) -> Self {
        Self { channels }
    }

    /// Append a channel after the existing ones
    pub fn with_channel<C: DeliveryChannel + 'static>(mut self, channel: C) -> Self {
        self.channels.push(Box::new(channel));
        self
    }

    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Deliver `payload`. Channel errors are logged and never propagated.
    pub async fn dispatch(&self, payload: &FeedbackPayload) -> DispatchOutcome {
        let mut last_error = None;

        for (index, channel) in self.channels.iter().enumerate() {
            match channel.deliver(payload).await {
                Ok(()) => {
                    let channel = channel.name().to_string();
                    info!(%channel, session = %payload.session_id, "feedback delivered");
                    return if index == 0 {
                        DispatchOutcome::DeliveredPrimary { channel }
                    } else {
                        DispatchOutcome::DeliveredFallback { channel }
                    };
                }
                Err(e) => {
                    warn!(
                        channel = channel.name(),
                        session = %payload.session_id,
                        error = %e,
                        "feedback channel failed"
                    );
                    last_error = Some(e.to_string());
                }
            }
        }

        let reason = last_error.unwrap_or_else(|| "no delivery channels configured".to_string());
        error!(session = %payload.session_id, %reason, "feedback not delivered");
        DispatchOutcome::Failed { reason }
    }
}

impl fmt::Debug for FeedbackDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeedbackDispatcher")
            .field("channels", &self.channel_names())
            .finish()
    }
}
