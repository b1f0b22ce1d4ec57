//! Feedback submitted from the dashboard form

use crate::error::{DeliveryError, Result};
use chrono::{DateTime, Utc};
use forecast_eval::Period;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Format used for the timestamp column and e-mail body
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Default slider position on the feedback form
pub const DEFAULT_CONFIDENCE: u8 = 50;

/// Identifier of one user session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// Which model's forecast the respondent trusts more
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrustedModel {
    #[serde(rename = "LSTM")]
    Lstm,
    #[serde(rename = "ARIMA")]
    Arima,
    #[serde(rename = "Both equally", alias = "Both")]
    Both,
    #[serde(rename = "Neither")]
    Neither,
}

impl TrustedModel {
    /// Form choices, in display order
    pub const ALL: [TrustedModel; 4] = [
        TrustedModel::Lstm,
        TrustedModel::Arima,
        TrustedModel::Both,
        TrustedModel::Neither,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            TrustedModel::Lstm => "LSTM",
            TrustedModel::Arima => "ARIMA",
            TrustedModel::Both => "Both equally",
            TrustedModel::Neither => "Neither",
        }
    }
}

impl fmt::Display for TrustedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One feedback submission
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackPayload {
    pub session_id: SessionId,
    pub selected_period: Period,
    pub trusted_model: TrustedModel,
    pub confidence: u8,
    pub comment: String,
    pub timestamp: DateTime<Utc>,
}

impl FeedbackPayload {
    /// Create a payload stamped with the current time.
    pub fn new(
        session_id: SessionId,
        selected_period: Period,
        trusted_model: TrustedModel,
        confidence: u8,
        comment: impl Into<String>,
    ) -> Result<Self> {
        if confidence > 100 {
            return Err(DeliveryError::InvalidPayload(format!(
                "confidence must be between 0 and 100, got {}",
                confidence
            )));
        }

        Ok(Self {
            session_id,
            selected_period,
            trusted_model,
            confidence,
            comment: comment.into().trim().to_string(),
            timestamp: Utc::now(),
        })
    }

    /// Replace the submission time
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn formatted_timestamp(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }

    /// Spreadsheet row: timestamp, period, trusted model, confidence, comment
    pub fn sheet_row(&self) -> [String; 5] {
        [
            self.formatted_timestamp(),
            self.selected_period.to_string(),
            self.trusted_model.label().to_string(),
            self.confidence.to_string(),
            self.comment.clone(),
        ]
    }

    pub fn email_subject(&self) -> String {
        format!(
            "Forecast feedback: {} trusted (session {})",
            self.trusted_model, self.session_id
        )
    }

    pub fn email_body(&self) -> String {
        let comment = if self.comment.is_empty() {
            "(none)"
        } else {
            self.comment.as_str()
        };

        format!(
            "Session: {}\nTimestamp: {}\nPrediction month: {}\nTrusted model: {}\nConfidence: {}\nComment: {}\n",
            self.session_id,
            self.formatted_timestamp(),
            self.selected_period,
            self.trusted_model,
            self.confidence,
            comment
        )
    }
}
