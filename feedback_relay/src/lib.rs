//! # Feedback Relay
//!
//! Delivery of expert feedback on forecast quality through an ordered list of
//! channels: a remote spreadsheet first, e-mail as the fallback.
//!
//! ```no_run
//! use feedback_relay::{
//!     EmailChannel, EmailConfig, FeedbackDispatcher, FeedbackPayload, SessionId, SheetsChannel,
//!     SheetsConfig, TrustedModel,
//! };
//!
//! # async fn run() -> feedback_relay::Result<()> {
//! let sheets = SheetsChannel::from_key_file(
//!     SheetsConfig::new("Steel Forecast Feedback", "Responses"),
//!     "service_account.json",
//! )?;
//! let email = EmailChannel::new(EmailConfig::new("analyst@example.com", "app-password"))?;
//!
//! let dispatcher = FeedbackDispatcher::default()
//!     .with_channel(sheets)
//!     .with_channel(email);
//!
//! let payload = FeedbackPayload::new(
//!     SessionId::new(),
//!     "2024-05".parse().expect("valid period"),
//!     TrustedModel::Lstm,
//!     70,
//!     "LSTM caught the turn",
//! )?;
//! let outcome = dispatcher.dispatch(&payload).await;
//! println!("{}", outcome.user_message());
//! # Ok(())
//! # }
//! ```

pub mod channel;
pub mod dispatcher;
pub mod email;
pub mod error;
pub mod payload;
pub mod sheets;

pub use crate::channel::DeliveryChannel;
pub use crate::dispatcher::{DispatchOutcome, FeedbackDispatcher};
pub use crate::email::{EmailChannel, EmailConfig};
pub use crate::error::{DeliveryError, Result};
pub use crate::payload::{FeedbackPayload, SessionId, TrustedModel, DEFAULT_CONFIDENCE};
pub use crate::sheets::{ServiceAccountKey, SheetsChannel, SheetsConfig};
