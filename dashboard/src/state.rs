//! Shared application state and its construction from settings

use crate::assistant::{ChatAssistant, OpenAiAssistant, UnavailableAssistant};
use crate::config::{EmailSettings, Settings, SheetsSettings};
use crate::error::StartupError;
use crate::session::SessionRegistry;
use feedback_relay::{
    DeliveryChannel, EmailChannel, EmailConfig, FeedbackDispatcher, SheetsChannel, SheetsConfig,
};
use forecast_eval::{DataLoader, ForecastStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ForecastStore>,
    pub dispatcher: Arc<FeedbackDispatcher>,
    pub assistant: Arc<dyn ChatAssistant>,
    pub sessions: Arc<SessionRegistry>,
    pub trend_window: usize,
}

impl AppState {
    pub fn new(
        store: ForecastStore,
        dispatcher: FeedbackDispatcher,
        assistant: Arc<dyn ChatAssistant>,
        sessions: SessionRegistry,
        trend_window: usize,
    ) -> Self {
        Self {
            store: Arc::new(store),
            dispatcher: Arc::new(dispatcher),
            assistant,
            sessions: Arc::new(sessions),
            trend_window,
        }
    }

    /// Load the forecast store and wire up delivery channels and the assistant.
    ///
    /// Only an unreadable forecast file is fatal; channels or an assistant
    /// lacking credentials are left out and logged.
    pub fn from_settings(settings: &Settings) -> Result<Self, StartupError> {
        let store = DataLoader::from_csv(&settings.data.forecast_csv)?;
        if store.is_empty() {
            warn!(path = %settings.data.forecast_csv.display(), "forecast store has no usable rows");
        }

        let dispatcher = FeedbackDispatcher::new(delivery_channels(settings));
        info!(channels = ?dispatcher.channel_names(), "feedback dispatcher ready");

        let assistant: Arc<dyn ChatAssistant> = match OpenAiAssistant::new(&settings.chat) {
            Ok(assistant) => Arc::new(assistant),
            Err(e) => {
                warn!(error = %e, "chat assistant disabled");
                Arc::new(UnavailableAssistant)
            }
        };

        Ok(Self::new(
            store,
            dispatcher,
            assistant,
            SessionRegistry::new(Duration::from_secs(settings.session.idle_ttl_secs)),
            settings.data.trend_window,
        ))
    }
}

/// Channels in delivery order: spreadsheet first, then e-mail
pub fn delivery_channels(settings: &Settings) -> Vec<Box<dyn DeliveryChannel>> {
    let mut channels: Vec<Box<dyn DeliveryChannel>> = Vec::new();

    if let Some(channel) = sheets_channel(&settings.sheets) {
        channels.push(Box::new(channel));
    }
    if let Some(channel) = email_channel(&settings.email) {
        channels.push(Box::new(channel));
    }

    if channels.is_empty() {
        warn!("no feedback delivery channel configured; submissions will be reported as failed");
    }
    channels
}

fn sheets_channel(settings: &SheetsSettings) -> Option<SheetsChannel> {
    if !settings.enabled {
        return None;
    }
    let Some(path) = settings.credentials_file.as_ref() else {
        warn!("spreadsheet channel disabled: no service account file");
        return None;
    };

    let config = SheetsConfig::new(&settings.spreadsheet_name, &settings.worksheet);
    SheetsChannel::from_key_file(config, path)
        .map_err(|e| warn!(error = %e, "spreadsheet channel disabled"))
        .ok()
}

fn email_channel(settings: &EmailSettings) -> Option<EmailChannel> {
    if !settings.enabled {
        return None;
    }
    let (Some(address), Some(password)) = (&settings.address, &settings.app_password) else {
        warn!("e-mail channel disabled: address or app password missing");
        return None;
    };

    let config = EmailConfig::new(address, password).with_relay(&settings.smtp_host, settings.smtp_port);
    EmailChannel::new(config)
        .map_err(|e| warn!(error = %e, "e-mail channel disabled"))
        .ok()
}
