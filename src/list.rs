use crate::client::{DictionaryApi, PageQuery};
use crate::model::{Language, PAGE_SIZE, WordSummary};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, warn};

const LIST_FALLBACK: &str = "Failed to load words. Please try again.";

/// Paginated word listing for one language and letter filter.
///
/// Every transition is synchronous; the fetch itself happens between
/// [`ListState::begin_fetch`] (or [`ListState::begin_next_page`]) and [`ListState::complete`].
/// Responses for a letter or language that is no longer selected are rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListState {
    pub language: Language,
    pub selected_letter: String,
    /// 1-based page most recently requested.
    pub page: u32,
    pub words: Vec<WordSummary>,
    pub has_more: bool,
    pub loading: bool,
    pub error: Option<String>,
    generation: u64,
}

/// A fetch issued by [`ListState`], tagged with the selection it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    generation: u64,
    pub query: PageQuery,
}

impl ListState {
    pub fn new(language: Language) -> Self {
        Self {
            language,
            selected_letter: language.all_letter().to_string(),
            page: 1,
            words: Vec::new(),
            has_more: true,
            loading: false,
            error: None,
            generation: 0,
        }
    }

    pub fn letter_filter(&self) -> Option<String> {
        self.language.letter_filter(&self.selected_letter)
    }

    /// Whether `language` and `letter` name the selection already shown.
    pub fn is_selected(&self, language: Language, letter: &str) -> bool {
        self.language == language && language.letter_filter(letter) == self.letter_filter()
    }

    /// Starts over for a new selection and returns the first-page request.
    pub fn reset(&mut self, language: Language, letter: &str) -> PageRequest {
        self.generation += 1;
        self.language = language;
        self.selected_letter = letter.to_string();
        self.page = 1;
        self.words.clear();
        self.has_more = true;
        self.loading = false;
        self.error = None;
        self.start()
    }

    /// Re-requests the current page; `None` while a fetch is already in flight.
    pub fn begin_fetch(&mut self) -> Option<PageRequest> {
        if self.loading {
            return None;
        }
        Some(self.start())
    }

    /// Advances to the next page; `None` while loading or once the listing is exhausted.
    pub fn begin_next_page(&mut self) -> Option<PageRequest> {
        if self.loading || !self.has_more {
            return None;
        }
        self.page += 1;
        Some(self.start())
    }

    /// Applies a fetch result. Returns `false` if the request was stale and nothing changed.
    pub fn complete(&mut self, request: &PageRequest, result: Result<Vec<WordSummary>, String>) -> bool {
        if !self.is_current(request) {
            debug!(
                letter = ?request.query.letter,
                page = request.query.page,
                "discarding stale word page"
            );
            return false;
        }
        self.loading = false;
        match result {
            Ok(words) => {
                if words.len() < request.query.limit {
                    self.has_more = false;
                }
                if self.page == 1 {
                    self.words = words;
                } else {
                    self.words.extend(words);
                }
            }
            Err(message) => {
                self.error = Some(message);
                // Let "load more" retry the page that failed.
                if self.page > 1 {
                    self.page -= 1;
                }
            }
        }
        true
    }

    /// Clears `loading` for a request whose result will never arrive.
    pub fn abandon(&mut self, request: &PageRequest) {
        if self.is_current(request) {
            self.loading = false;
            if self.page > 1 {
                self.page -= 1;
            }
        }
    }

    fn is_current(&self, request: &PageRequest) -> bool {
        request.generation == self.generation && request.query.page == self.page && self.loading
    }

    fn start(&mut self) -> PageRequest {
        self.loading = true;
        self.error = None;
        PageRequest {
            generation: self.generation,
            query: PageQuery {
                language: self.language,
                letter: self.letter_filter(),
                page: self.page,
                limit: PAGE_SIZE,
            },
        }
    }
}

/// Drives a [`ListState`] against a [`DictionaryApi`]. Clones share the same listing.
pub struct ListController<A: ?Sized> {
    api: Arc<A>,
    state: Arc<Mutex<ListState>>,
}

impl<A: ?Sized> Clone for ListController<A> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            state: Arc::clone(&self.state),
        }
    }
}

impl<A: DictionaryApi + ?Sized> ListController<A> {
    pub fn new(api: Arc<A>, language: Language) -> Self {
        Self {
            api,
            state: Arc::new(Mutex::new(ListState::new(language))),
        }
    }

    /// Builds a controller and loads the first page for `letter` (all words when `None`).
    pub async fn open(api: Arc<A>, language: Language, letter: Option<&str>) -> Self {
        let controller = Self::new(api, language);
        let letter = letter.unwrap_or(language.all_letter());
        let request = controller.state.lock().reset(language, letter);
        controller.run(request).await;
        controller
    }

    pub fn snapshot(&self) -> ListState {
        self.state.lock().clone()
    }

    /// Switches language and resets the letter filter to that language's "all" entry.
    ///
    /// Re-selecting the current language keeps the loaded pages. Returns `false` in that case.
    pub async fn set_language(&self, language: Language) -> bool {
        let request = {
            let mut state = self.state.lock();
            if state.language == language {
                return false;
            }
            state.reset(language, language.all_letter())
        };
        self.run(request).await;
        true
    }

    /// Filters by `letter`. Re-selecting the current letter keeps the loaded pages and returns `false`.
    pub async fn select_letter(&self, letter: &str) -> bool {
        let request = {
            let mut state = self.state.lock();
            let language = state.language;
            if state.is_selected(language, letter) {
                debug!(letter, "letter already selected");
                return false;
            }
            state.reset(language, letter)
        };
        self.run(request).await;
        true
    }

    /// Re-fetches the current page. Returns `false` when a fetch was already running.
    pub async fn fetch_page(&self) -> bool {
        let request = self.state.lock().begin_fetch();
        match request {
            Some(request) => {
                self.run(request).await;
                true
            }
            None => false,
        }
    }

    /// Fetches the next page. Returns `false` when nothing was requested.
    pub async fn load_more(&self) -> bool {
        let request = self.state.lock().begin_next_page();
        match request {
            Some(request) => {
                self.run(request).await;
                true
            }
            None => false,
        }
    }

    async fn run(&self, request: PageRequest) {
        let pending = PendingPage {
            state: &self.state,
            request,
            settled: false,
        };
        let result = self
            .api
            .words(&pending.request.query)
            .await
            .map_err(|err| {
                warn!(error = %err, page = pending.request.query.page, "word listing failed");
                err.user_message(LIST_FALLBACK)
            });
        pending.settle(result);
    }
}

struct PendingPage<'a> {
    state: &'a Mutex<ListState>,
    request: PageRequest,
    settled: bool,
}

impl PendingPage<'_> {
    fn settle(mut self, result: Result<Vec<WordSummary>, String>) {
        self.settled = true;
        self.state.lock().complete(&self.request, result);
    }
}

impl Drop for PendingPage<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.state.lock().abandon(&self.request);
        }
    }
}
