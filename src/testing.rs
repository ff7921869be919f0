//! Test doubles shared by the module test suites.

use crate::client::{ClientError, DictionaryApi, PageQuery};
use crate::model::{
    Difficulty, Language, NewWord, Suggestion, Translation, TranslationSummary, WordEntry,
    WordSummary,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Notify;

pub fn summaries(words: &[&str]) -> Vec<WordSummary> {
    words
        .iter()
        .map(|word| WordSummary {
            word: word.to_string(),
            translations: vec![TranslationSummary {
                word: format!("{word}-tr"),
                part_of_speech: "noun".to_string(),
            }],
        })
        .collect()
}

pub fn numbered(prefix: &str, count: usize) -> Vec<WordSummary> {
    let words: Vec<String> = (0..count).map(|i| format!("{prefix}{i:02}")).collect();
    let refs: Vec<&str> = words.iter().map(String::as_str).collect();
    summaries(&refs)
}

pub fn entry(word: &str, language: Language, translation: &str) -> WordEntry {
    WordEntry {
        word: word.to_string(),
        language,
        difficulty: Difficulty::B1,
        translations: vec![Translation {
            word: translation.to_string(),
            part_of_speech: "noun".to_string(),
            definitions: vec![format!("meaning of {word}")],
            examples: Vec::new(),
        }],
    }
}

pub fn page_key(language: Language, letter: Option<&str>, page: u32) -> String {
    format!("{}:{}:{}", language, letter.unwrap_or("*"), page)
}

/// Scripted in-process [`DictionaryApi`]; every call is recorded and any call can be held open.
#[derive(Default)]
pub struct ScriptedApi {
    pages: Mutex<HashMap<String, Result<Vec<WordSummary>, String>>>,
    entries: Mutex<HashMap<String, WordEntry>>,
    suggestions: Mutex<HashMap<String, Vec<Suggestion>>>,
    failing_autocomplete: Mutex<bool>,
    holds: Mutex<HashMap<String, Arc<Notify>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedApi {
    pub fn page(&self, language: Language, letter: Option<&str>, page: u32, words: Vec<WordSummary>) {
        self.pages
            .lock()
            .insert(page_key(language, letter, page), Ok(words));
    }

    pub fn failing_page(&self, language: Language, letter: Option<&str>, page: u32) {
        self.pages.lock().insert(
            page_key(language, letter, page),
            Err("Failed to fetch words".to_string()),
        );
    }

    pub fn entry(&self, entry: WordEntry) {
        self.entries.lock().insert(entry.word.clone(), entry);
    }

    pub fn suggestions(&self, query: &str, suggestions: Vec<Suggestion>) {
        self.suggestions
            .lock()
            .insert(query.to_string(), suggestions);
    }

    pub fn fail_autocomplete(&self) {
        *self.failing_autocomplete.lock() = true;
    }

    /// Holds the next call named `call` until the returned handle is notified.
    pub fn hold(&self, call: &str) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.holds
            .lock()
            .insert(call.to_string(), Arc::clone(&notify));
        notify
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    /// Yields until a call named `call` has been recorded.
    pub async fn arrived(&self, call: &str) {
        for _ in 0..1000 {
            if self.calls.lock().iter().any(|c| c == call) {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("call {call:?} never arrived; saw {:?}", self.calls());
    }

    async fn record(&self, call: String) {
        self.calls.lock().push(call.clone());
        let hold = self.holds.lock().remove(&call);
        if let Some(notify) = hold {
            notify.notified().await;
        }
    }
}

#[async_trait]
impl DictionaryApi for ScriptedApi {
    async fn autocomplete(
        &self,
        query: &str,
        language: Language,
        _limit: usize,
    ) -> Result<Vec<Suggestion>, ClientError> {
        self.record(format!("autocomplete:{language}:{query}")).await;
        if *self.failing_autocomplete.lock() {
            return Err(ClientError::upstream("Failed to fetch suggestions"));
        }
        Ok(self
            .suggestions
            .lock()
            .get(query)
            .cloned()
            .unwrap_or_default())
    }

    async fn search(&self, query: &str, language: Language) -> Result<WordEntry, ClientError> {
        self.record(format!("search:{language}:{query}")).await;
        self.entries
            .lock()
            .get(query)
            .cloned()
            .ok_or_else(|| ClientError::upstream("Failed to fetch word details"))
    }

    async fn words(&self, query: &PageQuery) -> Result<Vec<WordSummary>, ClientError> {
        let key = page_key(query.language, query.letter.as_deref(), query.page);
        self.record(format!("words:{key}")).await;
        match self.pages.lock().get(&key).cloned() {
            Some(Ok(words)) => Ok(words),
            Some(Err(message)) => Err(ClientError::upstream(message)),
            None => Ok(Vec::new()),
        }
    }

    async fn add_word(&self, word: &NewWord) -> Result<WordEntry, ClientError> {
        self.record(format!("add:{}", word.word)).await;
        let entry = WordEntry {
            word: word.word.clone(),
            language: word.language,
            difficulty: word.difficulty,
            translations: word.translations.clone(),
        };
        self.entry(entry.clone());
        Ok(entry)
    }
}

#[cfg(feature = "web")]
pub use self::gateway::{FakeGateway, FakePhonetics};

#[cfg(feature = "web")]
mod gateway {
    use super::*;
    use axum::extract::{Path, Query, State};
    use axum::http::{StatusCode, Uri};
    use axum::response::{IntoResponse, Response};
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::net::TcpListener;

    async fn listen(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    /// In-memory stand-in for the dictionary backend.
    #[derive(Clone, Default)]
    pub struct FakeGateway {
        inner: Arc<GatewayState>,
    }

    #[derive(Default)]
    struct GatewayState {
        entries: Mutex<Vec<WordEntry>>,
        requests: Mutex<Vec<String>>,
        down: AtomicBool,
    }

    type Params = Query<HashMap<String, String>>;

    impl FakeGateway {
        pub fn with_words(language: Language, words: &[&str]) -> Self {
            let gateway = Self::default();
            for word in words {
                gateway.insert(entry(word, language, &format!("{word}-tr")));
            }
            gateway
        }

        pub fn insert(&self, entry: WordEntry) {
            self.inner.entries.lock().push(entry);
        }

        pub fn take_down(&self) {
            self.inner.down.store(true, Ordering::SeqCst);
        }

        pub fn requests(&self) -> Vec<String> {
            self.inner.requests.lock().clone()
        }

        pub async fn spawn(&self) -> String {
            let router = Router::new()
                .route("/api/dictionary", axum::routing::post(create))
                .route("/api/dictionary/autocomplete", get(autocomplete))
                .route("/api/dictionary/search", get(search))
                .route("/api/dictionary/words", get(words))
                .route("/api/dictionary/words/:letter", get(words_by_letter))
                .with_state(self.clone());
            listen(router).await
        }

        fn record(&self, method: &str, uri: &Uri) -> Option<Response> {
            let target = uri
                .path_and_query()
                .map(|pq| pq.as_str().to_string())
                .unwrap_or_default();
            self.inner.requests.lock().push(format!("{method} {target}"));
            if self.inner.down.load(Ordering::SeqCst) {
                return Some(
                    (
                        StatusCode::SERVICE_UNAVAILABLE,
                        Json(json!({ "error": "database offline" })),
                    )
                        .into_response(),
                );
            }
            None
        }

        fn page(&self, params: &HashMap<String, String>, letter: Option<&str>) -> Vec<WordEntry> {
            let lang = params.get("lang").map(String::as_str).unwrap_or("en");
            let page: usize = params.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
            let limit: usize = params.get("limit").and_then(|l| l.parse().ok()).unwrap_or(12);
            let mut rows: Vec<WordEntry> = self
                .inner
                .entries
                .lock()
                .iter()
                .filter(|entry| entry.language.code() == lang)
                .filter(|entry| letter.is_none_or(|l| entry.word.to_lowercase().starts_with(l)))
                .cloned()
                .collect();
            rows.sort_by(|a, b| a.word.cmp(&b.word));
            rows.into_iter()
                .skip(page.saturating_sub(1) * limit)
                .take(limit)
                .collect()
        }
    }

    async fn autocomplete(State(gw): State<FakeGateway>, uri: Uri, Query(params): Params) -> Response {
        if let Some(response) = gw.record("GET", &uri) {
            return response;
        }
        let q = params.get("q").cloned().unwrap_or_default().to_lowercase();
        let lang = params.get("lang").cloned().unwrap_or_else(|| "en".into());
        let limit: usize = params.get("limit").and_then(|l| l.parse().ok()).unwrap_or(10);
        let rows: Vec<Suggestion> = gw
            .inner
            .entries
            .lock()
            .iter()
            .filter(|entry| entry.language.code() == lang && entry.word.starts_with(&q))
            .take(limit)
            .map(|entry| Suggestion {
                word: entry.word.clone(),
                translation: entry
                    .translations
                    .first()
                    .map(|t| t.word.clone())
                    .unwrap_or_default(),
            })
            .collect();
        Json(rows).into_response()
    }

    async fn search(State(gw): State<FakeGateway>, uri: Uri, Query(params): Params) -> Response {
        if let Some(response) = gw.record("GET", &uri) {
            return response;
        }
        let q = params.get("q").cloned().unwrap_or_default();
        let lang = params.get("lang").cloned().unwrap_or_else(|| "en".into());
        let found = gw
            .inner
            .entries
            .lock()
            .iter()
            .find(|entry| entry.language.code() == lang && entry.word.eq_ignore_ascii_case(&q))
            .cloned();
        match found {
            Some(entry) => Json(entry).into_response(),
            None => (
                StatusCode::NOT_FOUND,
                Json(json!({ "message": "Word not found" })),
            )
                .into_response(),
        }
    }

    async fn words(State(gw): State<FakeGateway>, uri: Uri, Query(params): Params) -> Response {
        if let Some(response) = gw.record("GET", &uri) {
            return response;
        }
        Json(gw.page(&params, None)).into_response()
    }

    async fn words_by_letter(
        State(gw): State<FakeGateway>,
        Path(letter): Path<String>,
        uri: Uri,
        Query(params): Params,
    ) -> Response {
        if let Some(response) = gw.record("GET", &uri) {
            return response;
        }
        Json(gw.page(&params, Some(&letter))).into_response()
    }

    async fn create(State(gw): State<FakeGateway>, uri: Uri, Json(word): Json<NewWord>) -> Response {
        if let Some(response) = gw.record("POST", &uri) {
            return response;
        }
        let entry = WordEntry {
            word: word.word,
            language: word.language,
            difficulty: word.difficulty,
            translations: word.translations,
        };
        gw.insert(entry.clone());
        (StatusCode::CREATED, Json(entry)).into_response()
    }

    /// Stand-in for the phonetic lookup API; `word -> audio urls` in lookup order.
    #[derive(Clone, Default)]
    pub struct FakePhonetics {
        audio: Arc<Mutex<HashMap<String, Vec<String>>>>,
        lookups: Arc<Mutex<Vec<String>>>,
    }

    impl FakePhonetics {
        pub fn with_audio(word: &str, audio: &[&str]) -> Self {
            let fake = Self::default();
            fake.audio.lock().insert(
                word.to_string(),
                audio.iter().map(|a| a.to_string()).collect(),
            );
            fake
        }

        pub fn lookups(&self) -> Vec<String> {
            self.lookups.lock().clone()
        }

        pub async fn spawn(&self) -> String {
            let router = Router::new()
                .route("/api/v2/entries/en/:word", get(phonetics))
                .with_state(self.clone());
            listen(router).await
        }
    }

    async fn phonetics(State(fake): State<FakePhonetics>, Path(word): Path<String>) -> Response {
        fake.lookups.lock().push(word.clone());
        match fake.audio.lock().get(&word) {
            Some(audio) => {
                let phonetics: Vec<_> = audio
                    .iter()
                    .map(|url| json!({ "text": "/wɜːd/", "audio": url }))
                    .collect();
                Json(json!([{ "word": word, "phonetics": phonetics }])).into_response()
            }
            None => (
                StatusCode::NOT_FOUND,
                Json(json!({ "title": "No Definitions Found" })),
            )
                .into_response(),
        }
    }
}
