use crate::model::{Language, NewWord, Suggestion, WordEntry, WordSummary};
use async_trait::async_trait;
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const AUTOCOMPLETE_PATH: &str = "/api/dictionary/autocomplete";
pub const SEARCH_PATH: &str = "/api/dictionary/search";
pub const WORDS_PATH: &str = "/api/dictionary/words";
pub const CREATE_PATH: &str = "/api/dictionary";

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("upstream returned HTTP {status}{}", detail_suffix(.message))]
    Status { status: u16, message: Option<String> },
    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ClientError {
    /// Error carrying an already user-facing message, as the proxy endpoints emit.
    pub fn upstream(message: impl Into<String>) -> Self {
        ClientError::Status {
            status: 500,
            message: Some(message.into()),
        }
    }

    /// Message suitable for display: the envelope message when there is one.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ClientError::Status {
                message: Some(message),
                ..
            } if !message.trim().is_empty() => message.clone(),
            _ => fallback.to_string(),
        }
    }
}

fn detail_suffix(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|message| format!(": {message}"))
        .unwrap_or_default()
}

/// One page of a (possibly letter-filtered) listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    pub language: Language,
    /// Lower-cased initial letter; `None` lists every word.
    pub letter: Option<String>,
    /// 1-based.
    pub page: u32,
    pub limit: usize,
}

impl PageQuery {
    pub fn path(&self) -> String {
        words_path(self.letter.as_deref())
    }
}

pub fn words_path(letter: Option<&str>) -> String {
    match letter {
        Some(letter) => format!("{WORDS_PATH}/{}", encode_segment(letter)),
        None => WORDS_PATH.to_string(),
    }
}

pub fn encode_segment(value: &str) -> String {
    utf8_percent_encode(value, NON_ALPHANUMERIC).to_string()
}

/// The dictionary endpoints shared by the backend and the same-origin proxy.
#[async_trait]
pub trait DictionaryApi: Send + Sync {
    async fn autocomplete(
        &self,
        query: &str,
        language: Language,
        limit: usize,
    ) -> Result<Vec<Suggestion>, ClientError>;

    async fn search(&self, query: &str, language: Language) -> Result<WordEntry, ClientError>;

    async fn words(&self, query: &PageQuery) -> Result<Vec<WordSummary>, ClientError>;

    async fn add_word(&self, word: &NewWord) -> Result<WordEntry, ClientError>;
}

/// JSON-over-HTTP client for the dictionary endpoints rooted at `base_url`.
#[derive(Clone, Debug)]
pub struct HttpDictionaryClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpDictionaryClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(base_url, client))
    }

    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, client }
    }

    pub async fn get_json<T>(&self, path: &str, query: &[(&str, String)]) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
    {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .header(reqwest::header::ACCEPT, "application/json")
            .query(query)
            .send()
            .await?;
        decode(response).await
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .header(reqwest::header::ACCEPT, "application/json")
            .json(body)
            .send()
            .await?;
        decode(response).await
    }
}

#[async_trait]
impl DictionaryApi for HttpDictionaryClient {
    async fn autocomplete(
        &self,
        query: &str,
        language: Language,
        limit: usize,
    ) -> Result<Vec<Suggestion>, ClientError> {
        let params = [
            ("q", query.to_string()),
            ("lang", language.code().to_string()),
            ("limit", limit.to_string()),
        ];
        self.get_json(AUTOCOMPLETE_PATH, &params).await
    }

    async fn search(&self, query: &str, language: Language) -> Result<WordEntry, ClientError> {
        let params = [("q", query.to_string()), ("lang", language.code().to_string())];
        self.get_json(SEARCH_PATH, &params).await
    }

    async fn words(&self, query: &PageQuery) -> Result<Vec<WordSummary>, ClientError> {
        let params = [
            ("lang", query.language.code().to_string()),
            ("page", query.page.to_string()),
            ("limit", query.limit.to_string()),
        ];
        self.get_json(&query.path(), &params).await
    }

    async fn add_word(&self, word: &NewWord) -> Result<WordEntry, ClientError> {
        self.post_json(CREATE_PATH, word).await
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: Option<String>,
    message: Option<String>,
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
    let status = response.status();
    let bytes = response.bytes().await?;
    if !status.is_success() {
        let message = serde_json::from_slice::<ErrorEnvelope>(&bytes)
            .ok()
            .and_then(|envelope| envelope.error.or(envelope.message));
        return Err(ClientError::Status {
            status: status.as_u16(),
            message,
        });
    }
    Ok(serde_json::from_slice(&bytes)?)
}
