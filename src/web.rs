use crate::client::{
    AUTOCOMPLETE_PATH, CREATE_PATH, ClientError, DictionaryApi, HttpDictionaryClient, PageQuery,
    SEARCH_PATH, WORDS_PATH, encode_segment, words_path,
};
use crate::config::{AppConfig, ConfigError};
use crate::list::{ListController, ListState};
use crate::model::{
    Difficulty, Language, NewWord, PAGE_SIZE, SUGGESTION_LIMIT, Suggestion, WORD_TYPES, WordEntry,
    WordForm, WordSummary,
};
use crate::pronunciation::{PhoneticLookup, PronunciationError, PronunciationPlan};
use crate::search::{AUTOCOMPLETE_DEBOUNCE, SearchController, SearchState};
use crate::theme::{DARK_MODE_KEY, PreferenceStore, Theme, ThemeContext};
use askama::Html as HtmlEscaper;
use askama::{MarkupDisplay, Template};
use async_trait::async_trait;
use axum::{
    Form, Json, Router,
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, Uri, header},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use cookie::{Cookie, CookieJar};
use serde::Deserialize;
use serde_json::{Value, json};
use std::fmt;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::compression::CompressionLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{info, warn};

type SharedState = Arc<AppState>;
const MAX_PAGES: u32 = 50;

const QUERY_REQUIRED: &str = "Query parameter is required";
const SUGGESTIONS_FAILED: &str = "Failed to fetch suggestions";
const DETAILS_FAILED: &str = "Failed to fetch word details";
const WORDS_FAILED: &str = "Failed to fetch words";
const DATA_FAILED: &str = "Failed to fetch data. Please try again later.";
const ADD_FAILED: &str = "Failed to add word. Please try again later.";
const PRONUNCIATION_FAILED: &str = "Failed to fetch pronunciation";
const WORD_ADDED: &str = "Word added successfully!";

#[derive(Clone)]
pub struct AppState {
    pub gateway: HttpDictionaryClient,
    pub phonetics: PhoneticLookup,
    views: Arc<ProxiedGateway>,
}

impl AppState {
    pub fn new(gateway: HttpDictionaryClient, phonetics: PhoneticLookup) -> Self {
        let views = Arc::new(ProxiedGateway {
            gateway: gateway.clone(),
        });
        Self {
            gateway,
            phonetics,
            views,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(config.gateway()?, config.phonetics()?))
    }
}

#[derive(Debug, Clone, Copy)]
struct Chrome {
    html_class: &'static str,
    body_class: &'static str,
    button_class: &'static str,
    input_class: &'static str,
    label_class: &'static str,
    toggle_label: &'static str,
}

impl Chrome {
    fn new(theme: Theme) -> Self {
        Self {
            html_class: theme.css_class(),
            body_class: "bg-gray-50 text-gray-900 dark:bg-gray-900 dark:text-gray-100",
            button_class: "inline-flex items-center px-4 py-2 border border-transparent text-sm font-medium rounded-md text-white bg-blue-600 hover:bg-blue-700 focus:outline-none focus:ring-2 focus:ring-offset-2 focus:ring-blue-500 transition-colors duration-200",
            input_class: "px-4 py-2 rounded-lg border border-gray-300 dark:border-gray-600 bg-white dark:bg-gray-700 text-gray-900 dark:text-white focus:outline-none focus:ring-2 focus:ring-blue-500 placeholder-gray-500 dark:placeholder-gray-400",
            label_class: "block text-sm font-medium text-gray-700 dark:text-gray-300 mb-1",
            toggle_label: if theme.is_dark() { "Light mode" } else { "Dark mode" },
        }
    }
}

#[derive(Debug)]
pub enum WebError {
    Io(std::io::Error),
    Config(ConfigError),
}

impl fmt::Display for WebError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebError::Io(err) => write!(f, "io error: {err}"),
            WebError::Config(err) => write!(f, "configuration error: {err}"),
        }
    }
}

impl std::error::Error for WebError {}

impl From<std::io::Error> for WebError {
    fn from(value: std::io::Error) -> Self {
        WebError::Io(value)
    }
}

impl From<ConfigError> for WebError {
    fn from(value: ConfigError) -> Self {
        WebError::Config(value)
    }
}

pub async fn serve(config: AppConfig) -> Result<(), WebError> {
    let state = Arc::new(AppState::from_config(&config)?);
    let router = build_router(state);
    info!(
        addr = %config.addr,
        backend = %config.backend_url,
        phonetics = %config.phonetics_url,
        "Binding HTTP listener"
    );
    let listener = TcpListener::bind(config.addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("HTTP server exited");
    Ok(())
}

/// JSON error envelope. The legacy combined endpoint reports under `message`, the rest under `error`.
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    field: &'static str,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            field: "error",
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            field: "error",
            message: message.into(),
        }
    }

    fn upstream(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            field: "error",
            message: message.into(),
        }
    }

    fn legacy(message: impl Into<String>) -> Self {
        Self {
            field: "message",
            ..Self::upstream(message)
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut payload = serde_json::Map::new();
        payload.insert(self.field.to_string(), Value::String(self.message));
        (self.status, Json(Value::Object(payload))).into_response()
    }
}

pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/words", post(add_word))
        .route("/theme", post(toggle_theme))
        .route("/healthz", get(health))
        .route("/api/dictionary", get(legacy_lookup).post(legacy_create))
        .route("/api/dictionary/autocomplete", get(api_autocomplete))
        .route("/api/dictionary/search", get(api_search))
        .route("/api/dictionary/words", get(api_words))
        .route("/api/dictionary/words/:letter", get(api_words_by_letter))
        .route("/api/pronunciation", get(api_pronunciation))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
        .layer(CompressionLayer::new())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        if let Ok(mut stream) = signal(SignalKind::terminate()) {
            let _ = stream.recv().await;
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok", "service": "sozluk-web" }))
}

/// Query string of the proxy endpoints. Values are forwarded as given; empty means absent.
#[derive(Debug, Default, Deserialize)]
struct ProxyParams {
    q: Option<String>,
    lang: Option<String>,
    page: Option<String>,
    limit: Option<String>,
}

impl ProxyParams {
    fn query(&self) -> Option<String> {
        self.q.clone().filter(|q| !q.is_empty())
    }

    fn required_query(&self) -> Result<String, ApiError> {
        self.query()
            .ok_or_else(|| ApiError::bad_request(QUERY_REQUIRED))
    }

    fn lang(&self) -> String {
        or_default(&self.lang, "en")
    }

    fn page(&self) -> String {
        or_default(&self.page, "1")
    }

    fn limit(&self, default: usize) -> String {
        or_default(&self.limit, &default.to_string())
    }

    fn listing(&self) -> [(&'static str, String); 3] {
        [
            ("lang", self.lang()),
            ("page", self.page()),
            ("limit", self.limit(PAGE_SIZE)),
        ]
    }
}

fn or_default(value: &Option<String>, default: &str) -> String {
    value
        .as_deref()
        .filter(|value| !value.is_empty())
        .unwrap_or(default)
        .to_string()
}

async fn relay(
    gateway: &HttpDictionaryClient,
    path: &str,
    query: &[(&str, String)],
) -> Result<Json<Value>, ClientError> {
    gateway.get_json::<Value>(path, query).await.map(Json)
}

fn gateway_failure(err: ClientError, message: &'static str) -> ApiError {
    warn!(error = %err, "{}", message);
    ApiError::upstream(message)
}

fn legacy_failure(err: ClientError, message: &'static str) -> ApiError {
    warn!(error = %err, "{}", message);
    ApiError::legacy(message)
}

async fn api_autocomplete(
    State(state): State<SharedState>,
    Query(params): Query<ProxyParams>,
) -> Result<Json<Value>, ApiError> {
    let query = [
        ("q", params.required_query()?),
        ("lang", params.lang()),
        ("limit", params.limit(SUGGESTION_LIMIT)),
    ];
    relay(&state.gateway, AUTOCOMPLETE_PATH, &query)
        .await
        .map_err(|err| gateway_failure(err, SUGGESTIONS_FAILED))
}

async fn api_search(
    State(state): State<SharedState>,
    Query(params): Query<ProxyParams>,
) -> Result<Json<Value>, ApiError> {
    let query = [("q", params.required_query()?), ("lang", params.lang())];
    relay(&state.gateway, SEARCH_PATH, &query)
        .await
        .map_err(|err| gateway_failure(err, DETAILS_FAILED))
}

async fn api_words(
    State(state): State<SharedState>,
    Query(params): Query<ProxyParams>,
) -> Result<Json<Value>, ApiError> {
    relay(&state.gateway, WORDS_PATH, &params.listing())
        .await
        .map_err(|err| gateway_failure(err, WORDS_FAILED))
}

async fn api_words_by_letter(
    State(state): State<SharedState>,
    Path(letter): Path<String>,
    Query(params): Query<ProxyParams>,
) -> Result<Json<Value>, ApiError> {
    let path = words_path(Some(&letter.to_lowercase()));
    relay(&state.gateway, &path, &params.listing())
        .await
        .map_err(|err| gateway_failure(err, WORDS_FAILED))
}

async fn legacy_lookup(
    State(state): State<SharedState>,
    Query(params): Query<ProxyParams>,
) -> Result<Json<Value>, ApiError> {
    let relayed = match params.query() {
        Some(q) => relay(&state.gateway, SEARCH_PATH, &[("q", q), ("lang", params.lang())]).await,
        None => relay(&state.gateway, WORDS_PATH, &params.listing()).await,
    };
    relayed.map_err(|err| legacy_failure(err, DATA_FAILED))
}

async fn legacy_create(
    State(state): State<SharedState>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let payload: Value = serde_json::from_slice(&body).map_err(|err| {
        warn!(error = %err, "rejecting malformed word body");
        ApiError::legacy(ADD_FAILED)
    })?;
    state
        .gateway
        .post_json::<Value, Value>(CREATE_PATH, &payload)
        .await
        .map(Json)
        .map_err(|err| legacy_failure(err, ADD_FAILED))
}

#[derive(Debug, Deserialize)]
struct PronunciationParams {
    word: Option<String>,
    lang: Option<String>,
}

async fn api_pronunciation(
    State(state): State<SharedState>,
    Query(params): Query<PronunciationParams>,
) -> Result<Json<PronunciationPlan>, ApiError> {
    let word = params
        .word
        .filter(|word| !word.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request(QUERY_REQUIRED))?;
    let language = match params.lang.as_deref().filter(|lang| !lang.is_empty()) {
        Some(code) => code
            .parse::<Language>()
            .map_err(|err| ApiError::bad_request(err.to_string()))?,
        None => Language::En,
    };
    match state.phonetics.resolve(&word, language).await {
        Ok(plan) => Ok(Json(plan)),
        Err(PronunciationError::Unavailable) => Err(ApiError::not_found(
            PronunciationError::Unavailable.to_string(),
        )),
        Err(err) => {
            warn!(error = %err, %word, "pronunciation lookup failed");
            Err(ApiError::upstream(PRONUNCIATION_FAILED))
        }
    }
}

/// The proxy endpoints as seen from the server-rendered views: same gateway calls, same
/// normalized failure messages.
struct ProxiedGateway {
    gateway: HttpDictionaryClient,
}

fn normalized(err: ClientError, message: &'static str) -> ClientError {
    warn!(error = %err, "{}", message);
    ClientError::upstream(message)
}

#[async_trait]
impl DictionaryApi for ProxiedGateway {
    async fn autocomplete(
        &self,
        query: &str,
        language: Language,
        limit: usize,
    ) -> Result<Vec<Suggestion>, ClientError> {
        self.gateway
            .autocomplete(query, language, limit)
            .await
            .map_err(|err| normalized(err, SUGGESTIONS_FAILED))
    }

    async fn search(&self, query: &str, language: Language) -> Result<WordEntry, ClientError> {
        self.gateway
            .search(query, language)
            .await
            .map_err(|err| normalized(err, DETAILS_FAILED))
    }

    async fn words(&self, query: &PageQuery) -> Result<Vec<WordSummary>, ClientError> {
        self.gateway
            .words(query)
            .await
            .map_err(|err| normalized(err, WORDS_FAILED))
    }

    async fn add_word(&self, word: &NewWord) -> Result<WordEntry, ClientError> {
        self.gateway
            .add_word(word)
            .await
            .map_err(|err| normalized(err, ADD_FAILED))
    }
}

/// Dark-mode preference carried in the `darkMode` cookie.
struct CookiePreferences {
    jar: CookieJar,
}

impl CookiePreferences {
    fn from_headers(headers: &HeaderMap) -> Self {
        let mut jar = CookieJar::new();
        for value in headers.get_all(header::COOKIE) {
            let Ok(value) = value.to_str() else {
                continue;
            };
            for cookie in Cookie::split_parse(value).flatten() {
                jar.add_original(cookie.into_owned());
            }
        }
        Self { jar }
    }

    fn write_to(&self, headers: &mut HeaderMap) {
        for cookie in self.jar.delta() {
            match HeaderValue::from_str(&cookie.to_string()) {
                Ok(value) => {
                    headers.append(header::SET_COOKIE, value);
                }
                Err(err) => warn!(error = %err, "dropping unencodable cookie"),
            }
        }
    }
}

impl PreferenceStore for CookiePreferences {
    fn load(&self) -> Option<bool> {
        self.jar
            .get(DARK_MODE_KEY)
            .and_then(|cookie| cookie.value().parse().ok())
    }

    fn save(&mut self, dark: bool) {
        self.jar.add(
            Cookie::build((DARK_MODE_KEY, dark.to_string()))
                .path("/")
                .max_age(cookie::time::Duration::days(365)),
        );
    }
}

fn request_theme(headers: &HeaderMap) -> Theme {
    ThemeContext::load(CookiePreferences::from_headers(headers)).theme()
}

async fn toggle_theme(headers: HeaderMap) -> Response {
    let mut context = ThemeContext::load(CookiePreferences::from_headers(&headers));
    context.toggle();
    let mut response = Redirect::to(&back_path(&headers)).into_response();
    context.into_store().write_to(response.headers_mut());
    response
}

/// Same-site path of the `Referer`, or `/`.
fn back_path(headers: &HeaderMap) -> String {
    headers
        .get(header::REFERER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<Uri>().ok())
        .and_then(|uri| uri.path_and_query().map(|pq| pq.as_str().to_string()))
        .filter(|path| path.starts_with('/') && !path.starts_with("//"))
        .unwrap_or_else(|| "/".to_string())
}

#[derive(Debug, Default, Deserialize)]
struct HomeParams {
    q: Option<String>,
    lang: Option<String>,
    letter: Option<String>,
    pages: Option<String>,
    tab: Option<String>,
    added: Option<String>,
}

impl HomeParams {
    fn query(&self) -> &str {
        self.q.as_deref().unwrap_or_default()
    }

    fn language(&self) -> Language {
        self.lang
            .as_deref()
            .and_then(|code| code.parse().ok())
            .unwrap_or_default()
    }

    fn letter(&self) -> Option<&str> {
        self.letter.as_deref().filter(|letter| !letter.is_empty())
    }

    fn pages(&self) -> u32 {
        self.pages
            .as_deref()
            .and_then(|pages| pages.trim().parse().ok())
            .unwrap_or(1)
            .clamp(1, MAX_PAGES)
    }

    fn tab(&self) -> usize {
        self.tab
            .as_deref()
            .and_then(|tab| tab.trim().parse().ok())
            .unwrap_or(0)
    }

    fn flash(&self) -> Option<&'static str> {
        (self.added.as_deref() == Some("1")).then_some(WORD_ADDED)
    }
}

async fn home(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Query(params): Query<HomeParams>,
) -> Html<String> {
    let theme = request_theme(&headers);
    let page = HomePage::load(&state, &params).await;
    Html(page.render(theme, &params, FormView::blank(params.language())))
}

#[derive(Debug, Default, Deserialize)]
struct AddWordFields {
    #[serde(default)]
    word: String,
    #[serde(default)]
    language: String,
    #[serde(default, rename = "type")]
    part_of_speech: String,
    #[serde(default)]
    difficulty: String,
    #[serde(default)]
    translation: String,
    #[serde(default)]
    definition: String,
    #[serde(default)]
    examples: String,
}

impl AddWordFields {
    fn into_form(self) -> WordForm {
        let part_of_speech = if WORD_TYPES.contains(&self.part_of_speech.as_str()) {
            self.part_of_speech
        } else {
            WORD_TYPES[0].to_string()
        };
        WordForm {
            word: self.word,
            language: self.language.parse().unwrap_or_default(),
            part_of_speech,
            difficulty: self.difficulty.parse().unwrap_or_default(),
            translation: self.translation,
            definition: self.definition,
            examples: self.examples.lines().map(str::to_string).collect(),
        }
    }
}

async fn add_word(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Form(fields): Form<AddWordFields>,
) -> Response {
    let form = fields.into_form();
    let (status, message) = match form.clone().into_new_word() {
        Ok(word) => match state.views.add_word(&word).await {
            Ok(created) => {
                info!(word = %created.word, language = %created.language, "word added");
                return Redirect::to("/?added=1").into_response();
            }
            Err(err) => (StatusCode::BAD_GATEWAY, err.user_message(ADD_FAILED)),
        },
        Err(err) => (StatusCode::UNPROCESSABLE_ENTITY, err.to_string()),
    };
    let params = HomeParams {
        lang: Some(form.language.code().to_string()),
        ..HomeParams::default()
    };
    let page = HomePage::load(&state, &params).await;
    let html = page.render(
        request_theme(&headers),
        &params,
        FormView::from_form(&form, Some(message)),
    );
    (status, Html(html)).into_response()
}

/// Controller state for one rendering of the home page.
struct HomePage {
    search: SearchState,
    list: ListState,
}

impl HomePage {
    async fn load(state: &AppState, params: &HomeParams) -> Self {
        let language = params.language();
        let search = SearchController::new(Arc::clone(&state.views), language);
        let (_, list) = tokio::join!(
            search.submit(params.query()),
            load_list(&state.views, language, params.letter(), params.pages()),
        );
        Self {
            search: search.snapshot(),
            list: list.snapshot(),
        }
    }

    fn render(&self, theme: Theme, params: &HomeParams, form: FormView) -> String {
        let list = &self.list;
        let link = HomeLink {
            query: params.query(),
            language: list.language,
            letter: &list.selected_letter,
            pages: list.page,
            tab: params.tab(),
        };
        let letters = list
            .language
            .alphabet()
            .iter()
            .map(|&letter| LetterLink {
                label: letter,
                href: link.with_letter(letter).href(),
                class: if letter == list.selected_letter {
                    "bg-blue-600 text-white"
                } else {
                    "bg-gray-100 dark:bg-gray-700 text-gray-700 dark:text-gray-300 hover:bg-gray-200 dark:hover:bg-gray-600"
                },
            })
            .collect();
        let words = list
            .words
            .iter()
            .map(|summary| WordCardView {
                word: summary.word.clone(),
                translations: summary.translation_line(),
                href: link.with_query(&summary.word).href(),
            })
            .collect();
        let load_more_href = (list.has_more && list.error.is_none())
            .then(|| link.with_pages(list.page + 1).href());
        let modal_class = if form.error.is_some() {
            "fixed inset-0 z-20 flex items-center justify-center bg-black/50 p-4"
        } else {
            "fixed inset-0 z-20 hidden target:flex items-center justify-center bg-black/50 p-4"
        };
        let template = HomeTemplate {
            chrome: Chrome::new(theme),
            query: params.query().to_string(),
            languages: language_options(list.language),
            debounce_ms: AUTOCOMPLETE_DEBOUNCE.as_millis(),
            search_error: self.search.error.clone(),
            result: self
                .search
                .result
                .as_ref()
                .map(|entry| ResultView::new(entry, &link)),
            letters,
            words,
            list_error: list.error.clone(),
            load_more_href,
            exhausted: !list.has_more && !list.words.is_empty(),
            empty: list.words.is_empty(),
            flash: params.flash(),
            form,
            modal_class,
        };
        template
            .render()
            .unwrap_or_else(|err| render_error_page(theme, err.to_string()))
    }
}

async fn load_list<A>(
    api: &Arc<A>,
    language: Language,
    letter: Option<&str>,
    pages: u32,
) -> ListController<A>
where
    A: DictionaryApi + ?Sized,
{
    let list = ListController::open(Arc::clone(api), language, letter).await;
    for _ in 1..pages {
        if !list.load_more().await || list.snapshot().error.is_some() {
            break;
        }
    }
    list
}

/// A home page URL; the `with_*` builders derive links to neighbouring states.
#[derive(Debug, Clone, Copy)]
struct HomeLink<'a> {
    query: &'a str,
    language: Language,
    letter: &'a str,
    pages: u32,
    tab: usize,
}

impl<'a> HomeLink<'a> {
    fn with_query(self, query: &'a str) -> Self {
        Self { query, tab: 0, ..self }
    }

    fn with_letter(self, letter: &'a str) -> Self {
        Self {
            letter,
            pages: 1,
            ..self
        }
    }

    fn with_pages(self, pages: u32) -> Self {
        Self { pages, ..self }
    }

    fn with_tab(self, tab: usize) -> Self {
        Self { tab, ..self }
    }

    fn href(&self) -> String {
        let mut parts = Vec::new();
        if !self.query.is_empty() {
            parts.push(format!("q={}", encode_segment(self.query)));
        }
        parts.push(format!("lang={}", self.language.code()));
        if self.language.letter_filter(self.letter).is_some() {
            parts.push(format!("letter={}", encode_segment(self.letter)));
        }
        if self.pages > 1 {
            parts.push(format!("pages={}", self.pages));
        }
        if self.tab > 0 {
            parts.push(format!("tab={}", self.tab));
        }
        format!("/?{}", parts.join("&"))
    }
}

#[derive(Debug, Clone)]
struct SelectOption {
    value: &'static str,
    label: &'static str,
    selected: bool,
}

fn language_options(selected: Language) -> Vec<SelectOption> {
    Language::ALL
        .into_iter()
        .map(|language| SelectOption {
            value: language.code(),
            label: language.label(),
            selected: language == selected,
        })
        .collect()
}

#[derive(Debug, Clone)]
struct LetterLink {
    label: &'static str,
    href: String,
    class: &'static str,
}

#[derive(Debug, Clone)]
struct WordCardView {
    word: String,
    translations: String,
    href: String,
}

#[derive(Debug, Clone)]
struct TabLink {
    label: String,
    href: String,
    class: &'static str,
}

#[derive(Debug, Clone)]
struct ActiveTranslation {
    word: String,
    part_of_speech: String,
    definitions: Vec<String>,
    examples: Vec<String>,
}

#[derive(Debug, Clone)]
struct ResultView {
    word: String,
    language: &'static str,
    difficulty: &'static str,
    badge_class: &'static str,
    tabs: Vec<TabLink>,
    active: Option<ActiveTranslation>,
}

impl ResultView {
    fn new(entry: &WordEntry, link: &HomeLink<'_>) -> Self {
        let tabs = entry
            .translations
            .iter()
            .enumerate()
            .map(|(index, translation)| TabLink {
                label: translation.part_of_speech.clone(),
                href: link.with_tab(index).href(),
                class: if index == link.tab {
                    "border-blue-500 text-blue-600 dark:text-blue-400"
                } else {
                    "border-transparent text-gray-500 dark:text-gray-400 hover:text-gray-700 dark:hover:text-gray-300"
                },
            })
            .collect();
        let active = entry
            .translations
            .get(link.tab)
            .map(|translation| ActiveTranslation {
                word: translation.word.clone(),
                part_of_speech: translation.part_of_speech.clone(),
                definitions: translation.definitions.clone(),
                examples: translation.examples.clone(),
            });
        Self {
            word: entry.word.clone(),
            language: entry.language.code(),
            difficulty: entry.difficulty.as_str(),
            badge_class: entry.difficulty.badge_class(),
            tabs,
            active,
        }
    }
}

/// Add-word modal contents, echoed back after a rejected submission.
#[derive(Debug, Clone)]
struct FormView {
    word: String,
    translation: String,
    definition: String,
    examples: String,
    languages: Vec<SelectOption>,
    types: Vec<SelectOption>,
    difficulties: Vec<SelectOption>,
    error: Option<String>,
}

impl FormView {
    fn blank(language: Language) -> Self {
        Self::from_form(
            &WordForm {
                language,
                ..WordForm::default()
            },
            None,
        )
    }

    fn from_form(form: &WordForm, error: Option<String>) -> Self {
        Self {
            word: form.word.clone(),
            translation: form.translation.clone(),
            definition: form.definition.clone(),
            examples: form.examples.join("\n"),
            languages: language_options(form.language),
            types: WORD_TYPES
                .iter()
                .map(|&kind| SelectOption {
                    value: kind,
                    label: kind,
                    selected: kind == form.part_of_speech,
                })
                .collect(),
            difficulties: Difficulty::ALL
                .into_iter()
                .map(|level| SelectOption {
                    value: level.as_str(),
                    label: level.as_str(),
                    selected: level == form.difficulty,
                })
                .collect(),
            error,
        }
    }
}

fn render_error_page(theme: Theme, message: impl Into<String>) -> String {
    let chrome = Chrome::new(theme);
    let message = MarkupDisplay::new_unsafe(message.into(), HtmlEscaper);
    format!(
        r#"<!DOCTYPE html>
<html lang="en" class="{html_class}">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>English-Turkish Dictionary • Error</title>
    <script src="https://cdn.jsdelivr.net/npm/@tailwindcss/browser@4"></script>
  </head>
  <body class="{body_class}">
    <main class="min-h-screen flex flex-col items-center justify-center gap-4 px-4">
      <h1 class="text-3xl font-bold">Something went wrong</h1>
      <p class="text-lg">{message}</p>
      <a href="/" class="{button_class}">Back to home</a>
    </main>
  </body>
</html>"#,
        html_class = chrome.html_class,
        body_class = chrome.body_class,
        button_class = chrome.button_class,
        message = message,
    )
}

#[derive(Template)]
#[template(
    source = r##"<!DOCTYPE html>
<html lang="en" class="{{ chrome.html_class }}">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>English-Turkish Dictionary</title>
    <script src="https://cdn.jsdelivr.net/npm/@tailwindcss/browser@4"></script>
    <style type="text/tailwindcss">
      @custom-variant dark (&:where(.dark, .dark *));
    </style>
  </head>
  <body class="{{ chrome.body_class }}">
    <main class="min-h-screen bg-gradient-to-b from-gray-50 to-gray-100 dark:from-gray-900 dark:to-gray-800">
      <div class="container mx-auto px-4 py-8">
        <div class="flex justify-between items-center mb-8">
          <div class="text-center flex-1">
            <h1 class="text-4xl font-bold text-gray-900 dark:text-white mb-4">English-Turkish Dictionary</h1>
            <p class="text-lg text-gray-600 dark:text-gray-300 mb-4">Search words in English or Turkish</p>
            <a href="#add-word" class="{{ chrome.button_class }}">+ Add New Word</a>
          </div>
          <form method="post" action="/theme" class="flex-none">
            <button type="submit" class="px-3 py-2 rounded-lg bg-gray-200 text-gray-800 hover:bg-gray-300 dark:bg-gray-700 dark:text-gray-200 dark:hover:bg-gray-600" aria-label="Toggle dark mode">{{ chrome.toggle_label }}</button>
          </form>
        </div>

        {% if flash.is_some() %}
        <p class="max-w-2xl mx-auto mb-6 rounded-md bg-green-50 p-4 text-sm text-green-700 dark:bg-green-900 dark:text-green-200">{{ flash.as_ref().unwrap() }}</p>
        {% endif %}

        <div class="max-w-2xl mx-auto mb-8">
          <form method="get" action="/" class="w-full relative" autocomplete="off">
            <div class="flex flex-col sm:flex-row gap-4">
              <div class="flex-1 relative">
                <input id="search-input" type="text" name="q" value="{{ query }}" placeholder="Search for a word..." class="w-full {{ chrome.input_class }}">
                <div id="suggestions" class="hidden absolute z-10 w-full mt-1 bg-white dark:bg-gray-700 rounded-lg shadow-lg border border-gray-200 dark:border-gray-600"></div>
              </div>
              <div class="flex gap-2">
                <select id="search-lang" name="lang" class="{{ chrome.input_class }}">
                  {% for option in languages %}
                  <option value="{{ option.value }}"{% if option.selected %} selected{% endif %}>{{ option.label }}</option>
                  {% endfor %}
                </select>
                <button type="submit" class="px-6 py-2 bg-blue-600 text-white rounded-lg hover:bg-blue-700 focus:outline-none focus:ring-2 focus:ring-blue-500 focus:ring-offset-2 transition-colors duration-200">Search</button>
              </div>
            </div>
            {% if search_error.is_some() %}
            <p class="mt-2 text-red-600 dark:text-red-400 text-sm">{{ search_error.as_ref().unwrap() }}</p>
            {% endif %}
          </form>
        </div>

        {% if result.is_some() %}
        {% let card = result.as_ref().unwrap() %}
        <div id="result" class="max-w-3xl mx-auto mb-12">
          <div class="bg-white dark:bg-gray-800 rounded-lg shadow-lg overflow-hidden">
            <div class="p-6 border-b border-gray-200 dark:border-gray-700">
              <div class="flex items-center justify-between">
                <div class="flex items-center gap-4">
                  <h2 class="text-3xl font-bold text-gray-900 dark:text-white">{{ card.word }}</h2>
                  <span class="px-2 py-1 rounded text-sm font-medium {{ card.badge_class }}">{{ card.difficulty }}</span>
                </div>
                <button type="button" data-pronounce data-word="{{ card.word }}" data-lang="{{ card.language }}" aria-label="Pronounce" class="p-2 rounded-full hover:bg-gray-100 dark:hover:bg-gray-700 focus:outline-none focus:ring-2 focus:ring-blue-500 disabled:opacity-50 disabled:cursor-not-allowed transition-colors duration-200">
                  <svg xmlns="http://www.w3.org/2000/svg" class="h-6 w-6 text-gray-600 dark:text-gray-300" fill="none" viewBox="0 0 24 24" stroke="currentColor">
                    <path stroke-linecap="round" stroke-linejoin="round" stroke-width="2" d="M15.536 8.464a5 5 0 010 7.072m2.828-9.9a9 9 0 010 12.728M5.586 15H4a1 1 0 01-1-1v-4a1 1 0 011-1h1.586l4.707-4.707C10.923 3.663 12 4.109 12 5v14c0 .891-1.077 1.337-1.707.707L5.586 15z" />
                  </svg>
                </button>
              </div>
              <p id="pronounce-error" class="mt-2 text-sm text-red-600 dark:text-red-400"></p>
            </div>
            <div class="border-b border-gray-200 dark:border-gray-700">
              <div class="flex overflow-x-auto">
                {% for tab in card.tabs %}
                <a href="{{ tab.href }}" class="px-4 py-2 text-sm font-medium border-b-2 transition-colors duration-200 {{ tab.class }}">{{ tab.label }}</a>
                {% endfor %}
              </div>
            </div>
            <div class="p-6">
              {% if card.active.is_some() %}
              {% let active = card.active.as_ref().unwrap() %}
              <div class="mb-4">
                <h3 class="text-xl font-semibold text-gray-900 dark:text-white mb-2">{{ active.word }}</h3>
                <p class="text-sm text-gray-500 dark:text-gray-400">{{ active.part_of_speech }}</p>
              </div>
              <div class="space-y-4">
                <h4 class="text-lg font-medium text-gray-900 dark:text-white">Definitions</h4>
                <ul class="list-disc list-inside space-y-2 text-gray-700 dark:text-gray-300">
                  {% for definition in active.definitions %}
                  <li>{{ definition }}</li>
                  {% endfor %}
                </ul>
              </div>
              {% if active.examples.len() > 0 %}
              <div class="mt-6 space-y-4">
                <h4 class="text-lg font-medium text-gray-900 dark:text-white">Examples</h4>
                <ul class="space-y-2">
                  {% for example in active.examples %}
                  <li class="pl-4 border-l-2 border-gray-200 dark:border-gray-700 text-gray-600 dark:text-gray-400">{{ example }}</li>
                  {% endfor %}
                </ul>
              </div>
              {% endif %}
              {% endif %}
            </div>
          </div>
        </div>
        {% endif %}

        <section id="words">
          <div class="mb-6 overflow-x-auto">
            <div class="flex flex-wrap gap-2 justify-center">
              {% for letter in letters %}
              <a href="{{ letter.href }}" class="px-3 py-1 rounded-md text-sm font-medium transition-colors duration-200 {{ letter.class }}">{{ letter.label }}</a>
              {% endfor %}
            </div>
          </div>
          {% if list_error.is_some() %}
          <div class="text-center py-8 text-red-600 dark:text-red-400">{{ list_error.as_ref().unwrap() }}</div>
          {% else %}
          <div class="grid grid-cols-1 sm:grid-cols-2 lg:grid-cols-3 gap-4">
            {% for entry in words %}
            <a href="{{ entry.href }}" class="block bg-white dark:bg-gray-800 rounded-lg shadow-md p-4 hover:shadow-lg transition-shadow duration-200">
              <h3 class="text-lg font-medium text-gray-900 dark:text-white mb-2">{{ entry.word }}</h3>
              <p class="text-sm text-gray-600 dark:text-gray-300">{{ entry.translations }}</p>
            </a>
            {% endfor %}
          </div>
          {% if load_more_href.is_some() %}
          <div class="text-center mt-8">
            <a href="{{ load_more_href.as_ref().unwrap() }}" class="px-6 py-2 bg-blue-600 text-white rounded-lg hover:bg-blue-700 focus:outline-none focus:ring-2 focus:ring-blue-500 focus:ring-offset-2 transition-colors duration-200">Load More</a>
          </div>
          {% endif %}
          {% if exhausted %}
          <p class="text-center py-8 text-gray-600 dark:text-gray-300">No more words to load.</p>
          {% endif %}
          {% if empty %}
          <p class="text-center py-8 text-gray-600 dark:text-gray-300">No words found.</p>
          {% endif %}
          {% endif %}
        </section>
      </div>
    </main>

    <div id="add-word" class="{{ modal_class }}">
      <div class="bg-white dark:bg-gray-800 rounded-lg shadow-xl max-w-2xl w-full max-h-[90vh] overflow-y-auto p-6">
        <div class="flex justify-between items-center mb-4">
          <h2 class="text-xl font-semibold text-gray-900 dark:text-white">Add New Word</h2>
          <a href="#" class="text-2xl leading-none text-gray-500 hover:text-gray-700 dark:text-gray-400 dark:hover:text-gray-200" aria-label="Close">&times;</a>
        </div>
        <form method="post" action="/words" class="space-y-4">
          {% if form.error.is_some() %}
          <div class="p-4 rounded-md bg-red-50 text-sm text-red-700 dark:bg-red-900 dark:text-red-200">{{ form.error.as_ref().unwrap() }}</div>
          {% endif %}
          <div class="grid grid-cols-1 md:grid-cols-2 gap-4">
            <label class="block">
              <span class="{{ chrome.label_class }}">Word</span>
              <input type="text" name="word" value="{{ form.word }}" required class="w-full {{ chrome.input_class }}">
            </label>
            <label class="block">
              <span class="{{ chrome.label_class }}">Language</span>
              <select name="language" class="w-full {{ chrome.input_class }}">
                {% for option in form.languages %}
                <option value="{{ option.value }}"{% if option.selected %} selected{% endif %}>{{ option.label }}</option>
                {% endfor %}
              </select>
            </label>
            <label class="block">
              <span class="{{ chrome.label_class }}">Word Type</span>
              <select name="type" class="w-full {{ chrome.input_class }}">
                {% for option in form.types %}
                <option value="{{ option.value }}"{% if option.selected %} selected{% endif %}>{{ option.label }}</option>
                {% endfor %}
              </select>
            </label>
            <label class="block">
              <span class="{{ chrome.label_class }}">Difficulty Level</span>
              <select name="difficulty" class="w-full {{ chrome.input_class }}">
                {% for option in form.difficulties %}
                <option value="{{ option.value }}"{% if option.selected %} selected{% endif %}>{{ option.label }}</option>
                {% endfor %}
              </select>
            </label>
            <label class="block md:col-span-2">
              <span class="{{ chrome.label_class }}">Translation</span>
              <input type="text" name="translation" value="{{ form.translation }}" required class="w-full {{ chrome.input_class }}">
            </label>
            <label class="block md:col-span-2">
              <span class="{{ chrome.label_class }}">Definition</span>
              <textarea name="definition" rows="3" required class="w-full {{ chrome.input_class }}">{{ form.definition }}</textarea>
            </label>
            <label class="block md:col-span-2">
              <span class="{{ chrome.label_class }}">Examples (one per line)</span>
              <textarea name="examples" rows="3" placeholder="Enter an example" class="w-full {{ chrome.input_class }}">{{ form.examples }}</textarea>
            </label>
          </div>
          <div class="flex justify-end gap-3">
            <a href="#" class="px-4 py-2 rounded-md text-sm font-medium text-gray-700 bg-gray-100 hover:bg-gray-200 dark:bg-gray-700 dark:text-gray-200">Cancel</a>
            <button type="submit" class="{{ chrome.button_class }}">Add Word</button>
          </div>
        </form>
      </div>
    </div>

    <script>
      (() => {
        const input = document.getElementById('search-input');
        const lang = document.getElementById('search-lang');
        const box = document.getElementById('suggestions');
        const delay = {{ debounce_ms }};
        let timer = null;
        let generation = 0;

        const hide = () => {
          box.classList.add('hidden');
          box.replaceChildren();
        };

        const show = (items) => {
          box.replaceChildren();
          for (const item of items) {
            const link = document.createElement('a');
            link.href = '/?q=' + encodeURIComponent(item.word) + '&lang=' + lang.value;
            link.className = 'block w-full px-4 py-2 text-left hover:bg-gray-100 dark:hover:bg-gray-600 text-gray-900 dark:text-white';
            const word = document.createElement('div');
            word.className = 'font-medium';
            word.textContent = item.word;
            link.append(word);
            if (item.translation) {
              const translation = document.createElement('div');
              translation.className = 'text-sm text-gray-500 dark:text-gray-400';
              translation.textContent = item.translation;
              link.append(translation);
            }
            box.append(link);
          }
          box.classList.toggle('hidden', items.length === 0);
        };

        const refresh = async () => {
          const text = input.value;
          if (!text.trim()) {
            hide();
            return;
          }
          const ticket = ++generation;
          try {
            const response = await fetch('/api/dictionary/autocomplete?q=' + encodeURIComponent(text) + '&lang=' + lang.value);
            if (!response.ok) {
              return;
            }
            const items = await response.json();
            if (ticket === generation) {
              show(items);
            }
          } catch (err) {
            console.error('Autocomplete error:', err);
          }
        };

        const schedule = () => {
          clearTimeout(timer);
          if (!input.value.trim()) {
            generation++;
            hide();
            return;
          }
          timer = setTimeout(refresh, delay);
        };

        input.addEventListener('input', schedule);
        input.addEventListener('focus', () => box.classList.toggle('hidden', box.children.length === 0));
        lang.addEventListener('change', schedule);
        document.addEventListener('click', (event) => {
          if (event.target !== input && !box.contains(event.target)) {
            box.classList.add('hidden');
          }
        });

        for (const button of document.querySelectorAll('[data-pronounce]')) {
          button.addEventListener('click', async () => {
            const status = document.getElementById('pronounce-error');
            status.textContent = '';
            button.disabled = true;
            try {
              const response = await fetch('/api/pronunciation?word=' + encodeURIComponent(button.dataset.word) + '&lang=' + button.dataset.lang);
              if (response.status === 404) {
                return;
              }
              const plan = await response.json();
              if (!response.ok) {
                throw new Error(plan.error || 'Failed to play pronunciation');
              }
              if (plan.mode === 'speech') {
                if (!('speechSynthesis' in window)) {
                  throw new Error('Speech synthesis not supported');
                }
                const utterance = new SpeechSynthesisUtterance(plan.text);
                utterance.lang = plan.locale;
                window.speechSynthesis.speak(utterance);
              } else {
                await new Audio(plan.url).play();
              }
            } catch (err) {
              status.textContent = err.message || 'Failed to play pronunciation';
            } finally {
              button.disabled = false;
            }
          });
        }
      })();
    </script>
  </body>
</html>"##,
    ext = "html"
)]
struct HomeTemplate {
    chrome: Chrome,
    query: String,
    languages: Vec<SelectOption>,
    debounce_ms: u128,
    search_error: Option<String>,
    result: Option<ResultView>,
    letters: Vec<LetterLink>,
    words: Vec<WordCardView>,
    list_error: Option<String>,
    load_more_href: Option<String>,
    exhausted: bool,
    empty: bool,
    flash: Option<&'static str>,
    form: FormView,
    modal_class: &'static str,
}
