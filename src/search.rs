use crate::client::{ClientError, DictionaryApi};
use crate::debounce::Debouncer;
use crate::model::{Language, SUGGESTION_LIMIT, Suggestion, WordEntry};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub const AUTOCOMPLETE_DEBOUNCE: Duration = Duration::from_millis(300);
const SEARCH_FALLBACK: &str = "Failed to fetch results. Please try again.";

/// What the search box, its dropdown and the result card render from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchState {
    pub query: String,
    pub language: Language,
    pub suggestions: Vec<Suggestion>,
    pub suggestions_visible: bool,
    pub loading: bool,
    pub error: Option<String>,
    pub result: Option<WordEntry>,
}

impl SearchState {
    /// Suggestions the dropdown should currently show.
    pub fn dropdown(&self) -> &[Suggestion] {
        if self.suggestions_visible {
            &self.suggestions
        } else {
            &[]
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Blank input, nothing was sent.
    Ignored,
    /// `result` was replaced; the caller should scroll back to the top.
    ScrollToTop,
    /// `error` is set and `result` cleared.
    Failed,
    /// A later submission started before this one finished; its response was dropped.
    Superseded,
}

struct Slot {
    view: SearchState,
    suggestion_tag: u64,
    search_tag: u64,
}

struct Inner<A: ?Sized> {
    api: Arc<A>,
    slot: Mutex<Slot>,
    timer: Mutex<Debouncer>,
}

/// Search box controller: debounced autocomplete plus the single current result.
///
/// Clones share state. The debounce timer is aborted once the last clone is dropped.
pub struct SearchController<A: ?Sized> {
    inner: Arc<Inner<A>>,
}

impl<A: ?Sized> Clone for SearchController<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A> SearchController<A>
where
    A: DictionaryApi + ?Sized + 'static,
{
    pub fn new(api: Arc<A>, language: Language) -> Self {
        Self::with_debounce(api, language, AUTOCOMPLETE_DEBOUNCE)
    }

    pub fn with_debounce(api: Arc<A>, language: Language, delay: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                api,
                slot: Mutex::new(Slot {
                    view: SearchState {
                        language,
                        ..SearchState::default()
                    },
                    suggestion_tag: 0,
                    search_tag: 0,
                }),
                timer: Mutex::new(Debouncer::new(delay)),
            }),
        }
    }

    pub fn snapshot(&self) -> SearchState {
        self.inner.slot.lock().view.clone()
    }

    /// Updates the query and restarts the autocomplete quiet period.
    ///
    /// Autocomplete runs on the current tokio runtime. Without one only the query is updated.
    pub fn set_query(&self, text: impl Into<String>) {
        let text = text.into();
        let blank = text.trim().is_empty();
        {
            let mut slot = self.inner.slot.lock();
            slot.view.query = text;
            slot.view.suggestions_visible = true;
            slot.suggestion_tag += 1;
            if blank {
                slot.view.suggestions.clear();
            }
        }
        if blank {
            self.inner.timer.lock().cancel();
        } else {
            self.schedule_suggestions();
        }
    }

    /// Switches language. Query and result are kept; pending suggestions are re-requested.
    pub fn set_language(&self, language: Language) {
        let refresh = {
            let mut slot = self.inner.slot.lock();
            if slot.view.language == language {
                return;
            }
            slot.view.language = language;
            slot.suggestion_tag += 1;
            !slot.view.query.trim().is_empty()
        };
        if refresh {
            self.schedule_suggestions();
        }
    }

    pub async fn submit(&self, text: &str) -> SubmitOutcome {
        if text.trim().is_empty() {
            return SubmitOutcome::Ignored;
        }
        let (language, tag) = {
            let mut slot = self.inner.slot.lock();
            slot.view.loading = true;
            slot.view.suggestions_visible = false;
            slot.view.error = None;
            slot.search_tag += 1;
            (slot.view.language, slot.search_tag)
        };
        let pending = PendingSearch {
            inner: &self.inner,
            tag,
            settled: false,
        };
        let outcome = self.inner.api.search(text, language).await;
        pending.settle(text, outcome)
    }

    /// Picks a dropdown entry: sets the query and searches without waiting for the debounce.
    pub async fn select_suggestion(&self, word: &str) -> SubmitOutcome {
        self.set_query(word);
        self.submit(word).await
    }

    /// Waits for the pending autocomplete timer, if any, to fire and finish.
    pub async fn settle(&self) {
        let pending = self.inner.timer.lock().take();
        if let Some(handle) = pending {
            let _ = handle.await;
        }
    }

    fn schedule_suggestions(&self) {
        let inner = Arc::downgrade(&self.inner);
        self.inner.timer.lock().schedule(async move {
            if let Some(inner) = inner.upgrade() {
                inner.refresh_suggestions().await;
            }
        });
    }
}

impl<A: DictionaryApi + ?Sized> Inner<A> {
    async fn refresh_suggestions(&self) {
        let (query, language, tag) = {
            let slot = self.slot.lock();
            (slot.view.query.clone(), slot.view.language, slot.suggestion_tag)
        };
        if query.trim().is_empty() {
            return;
        }
        match self.api.autocomplete(&query, language, SUGGESTION_LIMIT).await {
            Ok(suggestions) => {
                let mut slot = self.slot.lock();
                if slot.suggestion_tag == tag {
                    slot.view.suggestions = suggestions;
                } else {
                    debug!(%query, "discarding stale suggestions");
                }
            }
            Err(err) => warn!(error = %err, %query, "autocomplete failed"),
        }
    }
}

/// Clears `loading` for its search even if the awaiting future is dropped midway.
struct PendingSearch<'a, A: ?Sized> {
    inner: &'a Inner<A>,
    tag: u64,
    settled: bool,
}

impl<A: ?Sized> PendingSearch<'_, A> {
    fn settle(mut self, query: &str, outcome: Result<WordEntry, ClientError>) -> SubmitOutcome {
        self.settled = true;
        let mut slot = self.inner.slot.lock();
        if slot.search_tag != self.tag {
            debug!(%query, "discarding superseded search response");
            return SubmitOutcome::Superseded;
        }
        slot.view.loading = false;
        match outcome {
            Ok(entry) => {
                slot.view.result = Some(entry);
                SubmitOutcome::ScrollToTop
            }
            Err(err) => {
                warn!(error = %err, %query, "search failed");
                slot.view.error = Some(err.user_message(SEARCH_FALLBACK));
                slot.view.result = None;
                SubmitOutcome::Failed
            }
        }
    }
}

impl<A: ?Sized> Drop for PendingSearch<'_, A> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut slot = self.inner.slot.lock();
        if slot.search_tag == self.tag {
            slot.view.loading = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedApi, entry};

    fn suggestion(word: &str) -> Suggestion {
        Suggestion {
            word: word.to_string(),
            translation: format!("{word}-tr"),
        }
    }

    fn controller() -> (Arc<ScriptedApi>, SearchController<ScriptedApi>) {
        let api = Arc::new(ScriptedApi::default());
        let controller = SearchController::new(Arc::clone(&api), Language::En);
        (api, controller)
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_typing_fetches_once_for_latest_query() {
        let (api, search) = controller();
        api.suggestions("abc", vec![suggestion("abcess")]);
        search.set_query("a");
        tokio::time::sleep(Duration::from_millis(50)).await;
        search.set_query("ab");
        tokio::time::sleep(Duration::from_millis(50)).await;
        search.set_query("abc");
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(api.calls(), vec!["autocomplete:en:abc".to_string()]);
        let state = search.snapshot();
        assert_eq!(state.suggestions, vec![suggestion("abcess")]);
        assert!(state.suggestions_visible);
    }

    #[test]
    fn typing_outside_a_runtime_keeps_the_query() {
        let (api, search) = controller();
        search.set_query("kit");
        let state = search.snapshot();
        assert_eq!(state.query, "kit");
        assert!(state.dropdown().is_empty());
        assert_eq!(api.count("autocomplete"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_is_fetched_before_the_quiet_period() {
        let (api, search) = controller();
        search.set_query("kit");
        tokio::time::sleep(Duration::from_millis(299)).await;
        assert_eq!(api.count("autocomplete"), 0);
        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(api.count("autocomplete"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn blank_query_clears_suggestions_immediately() {
        let (api, search) = controller();
        api.suggestions("ca", vec![suggestion("cat")]);
        search.set_query("ca");
        search.settle().await;
        assert_eq!(search.snapshot().suggestions.len(), 1);

        search.set_query("   ");
        assert!(search.snapshot().suggestions.is_empty());
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(api.count("autocomplete"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn autocomplete_failure_is_silent() {
        let (api, search) = controller();
        api.suggestions("do", vec![suggestion("dog")]);
        search.set_query("do");
        search.settle().await;
        api.fail_autocomplete();
        search.set_query("dog");
        search.settle().await;
        let state = search.snapshot();
        assert_eq!(state.suggestions, vec![suggestion("dog")]);
        assert_eq!(state.error, None);
    }

    #[tokio::test(start_paused = true)]
    async fn late_suggestions_never_overwrite_newer_query() {
        let (api, search) = controller();
        api.suggestions("ab", vec![suggestion("about")]);
        api.suggestions("abc", vec![suggestion("abc")]);
        let held = api.hold("autocomplete:en:ab");
        search.set_query("ab");
        tokio::time::sleep(Duration::from_millis(350)).await;
        api.arrived("autocomplete:en:ab").await;
        search.set_query("abc");
        search.settle().await;
        held.notify_one();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(search.snapshot().suggestions, vec![suggestion("abc")]);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_controller_never_fires() {
        let (api, search) = controller();
        search.set_query("gone");
        drop(search);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(api.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn language_switch_applies_to_next_requests() {
        let (api, search) = controller();
        api.entry(entry("ev", Language::Tr, "house"));
        search.set_query("ev");
        search.set_language(Language::Tr);
        search.settle().await;
        assert_eq!(api.calls(), vec!["autocomplete:tr:ev".to_string()]);
        assert_eq!(search.snapshot().query, "ev");
        assert_eq!(search.submit("ev").await, SubmitOutcome::ScrollToTop);
        assert!(api.calls().contains(&"search:tr:ev".to_string()));
    }

    #[tokio::test]
    async fn blank_submit_is_ignored() {
        let (api, search) = controller();
        assert_eq!(search.submit("  ").await, SubmitOutcome::Ignored);
        assert!(api.calls().is_empty());
        assert!(!search.snapshot().loading);
    }

    #[tokio::test]
    async fn successful_search_replaces_result_and_hides_dropdown() {
        let (api, search) = controller();
        api.entry(entry("run", Language::En, "koşmak"));
        search.set_query("run");
        assert_eq!(search.submit("run").await, SubmitOutcome::ScrollToTop);
        let state = search.snapshot();
        assert!(!state.loading);
        assert!(!state.suggestions_visible);
        assert!(state.dropdown().is_empty());
        assert_eq!(state.result.unwrap().translations[0].word, "koşmak");
    }

    #[tokio::test]
    async fn failed_search_clears_stale_result() {
        let (api, search) = controller();
        api.entry(entry("run", Language::En, "koşmak"));
        search.submit("run").await;
        assert_eq!(search.submit("nothing").await, SubmitOutcome::Failed);
        let state = search.snapshot();
        assert_eq!(state.result, None);
        assert_eq!(state.error.as_deref(), Some("Failed to fetch word details"));
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn loading_is_visible_while_search_is_in_flight() {
        let (api, search) = controller();
        api.entry(entry("sun", Language::En, "güneş"));
        let held = api.hold("search:en:sun");
        let task = tokio::spawn({
            let search = search.clone();
            async move { search.submit("sun").await }
        });
        api.arrived("search:en:sun").await;
        assert!(search.snapshot().loading);
        held.notify_one();
        assert_eq!(task.await.unwrap(), SubmitOutcome::ScrollToTop);
        assert!(!search.snapshot().loading);
    }

    #[tokio::test]
    async fn abandoned_search_still_clears_loading() {
        let (api, search) = controller();
        let _held = api.hold("search:en:moon");
        let task = tokio::spawn({
            let search = search.clone();
            async move { search.submit("moon").await }
        });
        api.arrived("search:en:moon").await;
        task.abort();
        let _ = task.await;
        assert!(!search.snapshot().loading);
    }

    #[tokio::test]
    async fn older_search_response_is_superseded() {
        let (api, search) = controller();
        api.entry(entry("old", Language::En, "eski"));
        api.entry(entry("new", Language::En, "yeni"));
        let held = api.hold("search:en:old");
        let first = tokio::spawn({
            let search = search.clone();
            async move { search.submit("old").await }
        });
        api.arrived("search:en:old").await;
        assert_eq!(search.submit("new").await, SubmitOutcome::ScrollToTop);
        held.notify_one();
        assert_eq!(first.await.unwrap(), SubmitOutcome::Superseded);
        assert_eq!(search.snapshot().result.unwrap().word, "new");
    }

    #[tokio::test]
    async fn selecting_a_suggestion_searches_immediately() {
        let (api, search) = controller();
        api.entry(entry("river", Language::En, "nehir"));
        let outcome = search.select_suggestion("river").await;
        assert_eq!(outcome, SubmitOutcome::ScrollToTop);
        assert_eq!(api.calls(), vec!["search:en:river".to_string()]);
        let state = search.snapshot();
        assert_eq!(state.query, "river");
        assert!(!state.suggestions_visible);
    }
}
