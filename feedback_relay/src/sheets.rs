//! Spreadsheet channel: appends feedback rows to a named Google Sheet

use crate::channel::DeliveryChannel;
use crate::error::{DeliveryError, Result};
use crate::payload::FeedbackPayload;
use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::{Client, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info};

pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
pub const DRIVE_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/drive.readonly";

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const DEFAULT_SHEETS_BASE: &str = "https://sheets.googleapis.com";
const DEFAULT_DRIVE_BASE: &str = "https://www.googleapis.com";
const SPREADSHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// Service-account credential as downloaded from the cloud console
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl ServiceAccountKey {
    /// Read a JSON key file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| DeliveryError::Config(format!("invalid service account key: {}", e)))
    }
}

/// Target document and API endpoints
#[derive(Debug, Clone)]
pub struct SheetsConfig {
    pub spreadsheet_name: String,
    pub worksheet: String,
    pub sheets_base_url: String,
    pub drive_base_url: String,
    pub timeout: Duration,
}

impl SheetsConfig {
    pub fn new(spreadsheet_name: impl Into<String>, worksheet: impl Into<String>) -> Self {
        Self {
            spreadsheet_name: spreadsheet_name.into(),
            worksheet: worksheet.into(),
            sheets_base_url: DEFAULT_SHEETS_BASE.to_string(),
            drive_base_url: DEFAULT_DRIVE_BASE.to_string(),
            timeout: Duration::from_secs(15),
        }
    }

    pub fn with_base_urls(mut self, sheets: impl Into<String>, drive: impl Into<String>) -> Self {
        self.sheets_base_url = sheets.into();
        self.drive_base_url = drive.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: String,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
}

#[derive(Debug)]
struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Map an unsuccessful HTTP status to a delivery error
pub fn status_error(status: StatusCode, body: String) -> DeliveryError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            DeliveryError::Auth(format!("{}: {}", status, body))
        }
        StatusCode::NOT_FOUND => DeliveryError::NotFound(body),
        _ => DeliveryError::Rejected {
            status: status.as_u16(),
            body,
        },
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(status_error(status, body))
}

/// Drive search expression matching a spreadsheet by exact name
pub fn drive_query(spreadsheet_name: &str) -> String {
    let escaped = spreadsheet_name.replace('\\', "\\\\").replace('\'', "\\'");
    format!(
        "name = '{}' and mimeType = '{}' and trashed = false",
        escaped, SPREADSHEET_MIME
    )
}

/// A1 range addressing the first cell of a worksheet
pub fn worksheet_range(worksheet: &str) -> String {
    format!("'{}'!A1", worksheet.replace('\'', "''"))
}

/// Appends one row per submission to a worksheet of a named spreadsheet
pub struct SheetsChannel {
    config: SheetsConfig,
    key: ServiceAccountKey,
    http: Client,
    token: Mutex<Option<CachedToken>>,
}

impl SheetsChannel {
    pub fn new(config: SheetsConfig, key: ServiceAccountKey) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("feedback_relay/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            config,
            key,
            http,
            token: Mutex::new(None),
        })
    }

    /// Build a channel from a service-account key file
    pub fn from_key_file<P: AsRef<Path>>(config: SheetsConfig, path: P) -> Result<Self> {
        Self::new(config, ServiceAccountKey::from_file(path)?)
    }

    pub fn config(&self) -> &SheetsConfig {
        &self.config
    }

    /// Signed JWT for the bearer grant
    fn assertion(&self) -> Result<String> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            iss: &self.key.client_email,
            scope: format!("{} {}", SHEETS_SCOPE, DRIVE_READONLY_SCOPE),
            aud: &self.key.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };
        let key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())?;
        Ok(encode(&Header::new(Algorithm::RS256), &claims, &key)?)
    }

    async fn access_token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() {
                return Ok(token.value.clone());
            }
        }

        let assertion = self.assertion()?;
        let response = self
            .http
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Auth(format!(
                "token exchange failed with {}: {}",
                status, body
            )));
        }

        let token: TokenResponse = response.json().await?;
        let lifetime = Duration::from_secs(token.expires_in.unwrap_or(3600))
            .saturating_sub(TOKEN_REFRESH_MARGIN);
        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });
        debug!("obtained spreadsheet access token");

        Ok(token.access_token)
    }

    async fn resolve_spreadsheet_id(&self, token: &str) -> Result<String> {
        let url = format!("{}/drive/v3/files", self.config.drive_base_url);
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .query(&[
                ("q", drive_query(&self.config.spreadsheet_name)),
                ("fields", "files(id,name)".to_string()),
            ])
            .send()
            .await?;

        let list: FileList = check_status(response).await?.json().await?;
        list.files.into_iter().next().map(|f| f.id).ok_or_else(|| {
            DeliveryError::NotFound(format!("spreadsheet '{}'", self.config.spreadsheet_name))
        })
    }

    /// `values:append` endpoint for the configured worksheet
    pub fn append_url(&self, spreadsheet_id: &str) -> Result<Url> {
        let mut url = Url::parse(&self.config.sheets_base_url)
            .map_err(|e| DeliveryError::Config(format!("invalid sheets base url: {}", e)))?;
        let target = format!("{}:append", worksheet_range(&self.config.worksheet));

        url.path_segments_mut()
            .map_err(|_| DeliveryError::Config("sheets base url cannot hold a path".to_string()))?
            .pop_if_empty()
            .extend(&["v4", "spreadsheets", spreadsheet_id, "values", target.as_str()]);
        url.query_pairs_mut()
            .append_pair("valueInputOption", "USER_ENTERED")
            .append_pair("insertDataOption", "INSERT_ROWS");

        Ok(url)
    }

    async fn append_row(&self, token: &str, spreadsheet_id: &str, row: &[String]) -> Result<()> {
        let body = serde_json::json!({
            "majorDimension": "ROWS",
            "values": [row],
        });

        let response = self
            .http
            .post(self.append_url(spreadsheet_id)?)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}

#[async_trait]
impl DeliveryChannel for SheetsChannel {
    fn name(&self) -> &str {
        "spreadsheet"
    }

    async fn deliver(&self, payload: &FeedbackPayload) -> Result<()> {
        let token = self.access_token().await?;
        let spreadsheet_id = self.resolve_spreadsheet_id(&token).await?;
        self.append_row(&token, &spreadsheet_id, &payload.sheet_row())
            .await?;

        info!(
            spreadsheet = %self.config.spreadsheet_name,
            worksheet = %self.config.worksheet,
            session = %payload.session_id,
            "feedback row appended"
        );
        Ok(())
    }
}
