use crate::client::HttpDictionaryClient;
use crate::pronunciation::{DEFAULT_PHONETICS_URL, PhoneticLookup};
use crate::theme::default_preferences_path;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:5000";
pub const DEFAULT_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid listen address {value:?}: {source}")]
    InvalidAddr {
        value: String,
        source: std::net::AddrParseError,
    },
    #[error("invalid origin {0:?} (expected an http:// or https:// URL)")]
    InvalidOrigin(String),
    #[error("invalid SOZLUK_HTTP_TIMEOUT_SECS {0:?}")]
    InvalidTimeout(String),
    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Runtime settings, read from `SOZLUK_*` variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub backend_url: String,
    pub addr: SocketAddr,
    pub phonetics_url: String,
    pub http_timeout: Duration,
    pub speech_command: String,
    pub audio_command: String,
    pub preferences_path: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            phonetics_url: DEFAULT_PHONETICS_URL.to_string(),
            http_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            speech_command: "espeak-ng".to_string(),
            audio_command: "mpv".to_string(),
            preferences_path: default_preferences_path(),
        }
    }
}

impl AppConfig {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        if let Some(url) = var("SOZLUK_BACKEND_URL").or_else(|| var("NEXT_PUBLIC_BACKEND_URL")) {
            config.backend_url = origin(&url)?;
        }
        if let Some(addr) = var("SOZLUK_ADDR") {
            config.addr = parse_addr(&addr)?;
        }
        if let Some(url) = var("SOZLUK_PHONETICS_URL") {
            config.phonetics_url = origin(&url)?;
        }
        if let Some(secs) = var("SOZLUK_HTTP_TIMEOUT_SECS") {
            let secs: u64 = secs
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidTimeout(secs.clone()))?;
            config.http_timeout = Duration::from_secs(secs);
        }
        if let Some(command) = var("SOZLUK_SPEECH_COMMAND") {
            config.speech_command = command;
        }
        if let Some(command) = var("SOZLUK_AUDIO_COMMAND") {
            config.audio_command = command;
        }
        if let Some(path) = var("SOZLUK_PREFERENCES") {
            config.preferences_path = PathBuf::from(path);
        }
        Ok(config)
    }

    pub fn with_backend(mut self, url: &str) -> Result<Self, ConfigError> {
        self.backend_url = origin(url)?;
        Ok(self)
    }

    pub fn with_addr(mut self, addr: &str) -> Result<Self, ConfigError> {
        self.addr = parse_addr(addr)?;
        Ok(self)
    }

    pub fn http_client(&self) -> Result<reqwest::Client, ConfigError> {
        Ok(reqwest::Client::builder()
            .timeout(self.http_timeout)
            .user_agent(concat!("sozluk-rs/", env!("CARGO_PKG_VERSION")))
            .build()?)
    }

    pub fn gateway(&self) -> Result<HttpDictionaryClient, ConfigError> {
        Ok(HttpDictionaryClient::with_client(
            self.backend_url.clone(),
            self.http_client()?,
        ))
    }

    pub fn phonetics(&self) -> Result<PhoneticLookup, ConfigError> {
        Ok(PhoneticLookup::new(
            self.phonetics_url.clone(),
            self.http_client()?,
        ))
    }
}

fn origin(value: &str) -> Result<String, ConfigError> {
    let trimmed = value.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Ok(trimmed.to_string())
    } else {
        Err(ConfigError::InvalidOrigin(value.to_string()))
    }
}

fn parse_addr(value: &str) -> Result<SocketAddr, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|source| ConfigError::InvalidAddr {
            value: value.to_string(),
            source,
        })
}
