//! Delivery channel abstraction

use crate::error::Result;
use crate::payload::FeedbackPayload;
use async_trait::async_trait;

/// A destination that can persist one feedback submission.
///
/// Implementations make a single attempt per call; the dispatcher decides
/// what happens after a failure.
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    /// Short name used in logs and outcomes
    fn name(&self) -> &str;

    /// Deliver the payload once
    async fn deliver(&self, payload: &FeedbackPayload) -> Result<()>;
}
