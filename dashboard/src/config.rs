//! Service configuration.
//!
//! Settings come from a TOML file (`dashboard.toml` by default, or the path in
//! `DASHBOARD_CONFIG`); secrets and deployment specifics are overridden from
//! the environment after `.env` has been loaded.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable naming the config file
pub const CONFIG_PATH_ENV: &str = "DASHBOARD_CONFIG";

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerConfig,
    pub data: DataConfig,
    pub sheets: SheetsSettings,
    pub email: EmailSettings,
    pub chat: ChatSettings,
    pub session: SessionSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Prebuilt front end served at `/`
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            static_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub forecast_csv: PathBuf,
    pub trend_window: usize,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            forecast_csv: PathBuf::from("data/LSTM_ARIMA_ActualPrice.csv"),
            trend_window: forecast_eval::DEFAULT_TREND_WINDOW,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetsSettings {
    pub enabled: bool,
    pub spreadsheet_name: String,
    pub worksheet: String,
    pub credentials_file: Option<PathBuf>,
}

impl Default for SheetsSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            spreadsheet_name: "Steel Forecast Feedback".to_string(),
            worksheet: "Responses".to_string(),
            credentials_file: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailSettings {
    pub enabled: bool,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub address: Option<String>,
    #[serde(skip_serializing)]
    pub app_password: Option<String>,
}

impl Default for EmailSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            smtp_host: feedback_relay::email::DEFAULT_SMTP_HOST.to_string(),
            smtp_port: feedback_relay::email::DEFAULT_SMTP_PORT,
            address: None,
            app_password: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSettings {
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            timeout_secs: 30,
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Sessions idle longer than this are torn down
    pub idle_ttl_secs: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self { idle_ttl_secs: 3600 }
    }
}

impl Settings {
    /// Load configuration from a file path.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        Ok(settings)
    }

    /// Load from `DASHBOARD_CONFIG` or `./dashboard.toml`, then apply
    /// environment overrides. A missing file falls back to defaults.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| Self::default_path());

        let settings = if path.exists() {
            Self::load(&path)?
        } else {
            tracing::info!(path = %path.display(), "no config file, using defaults");
            Self::default()
        };

        settings.with_overrides(|key| std::env::var(key).ok())
    }

    /// Get the default config file path.
    pub fn default_path() -> PathBuf {
        PathBuf::from("dashboard.toml")
    }

    /// Apply overrides from a key lookup (the process environment in production).
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = port.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "PORT".to_string(),
                value: port.clone(),
            })?;
        }
        if let Some(path) = lookup("FORECAST_CSV") {
            self.data.forecast_csv = PathBuf::from(path);
        }
        if let Some(path) = lookup("GOOGLE_SERVICE_ACCOUNT_FILE") {
            self.sheets.credentials_file = Some(PathBuf::from(path));
        }
        if let Some(address) = lookup("FEEDBACK_EMAIL_ADDRESS") {
            self.email.address = Some(address);
        }
        if let Some(password) = lookup("FEEDBACK_EMAIL_APP_PASSWORD") {
            self.email.app_password = Some(password);
        }
        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.chat.api_key = Some(key);
        }

        if self.data.trend_window == 0 {
            return Err(ConfigError::InvalidValue {
                key: "data.trend_window".to_string(),
                value: "0".to_string(),
            });
        }

        Ok(self)
    }

    /// Socket address string for the listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
