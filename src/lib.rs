//! English-Turkish dictionary browser.
//!
//! The library holds the interaction controllers (search with debounced
//! autocomplete, paginated letter-filtered listing), the client for the
//! dictionary backend, pronunciation and theme handling. With the `web`
//! feature it also serves the same-origin proxy and the server-rendered pages.

pub mod client;
pub mod config;
pub mod debounce;
pub mod list;
pub mod model;
pub mod pronunciation;
pub mod search;
pub mod theme;
#[cfg(feature = "web")]
pub mod web;

#[cfg(test)]
mod testing;

pub use client::{ClientError, DictionaryApi, HttpDictionaryClient, PageQuery};
pub use config::{AppConfig, ConfigError};
pub use debounce::Debouncer;
pub use list::{ListController, ListState};
pub use model::{
    Difficulty, FormError, Language, NewWord, PAGE_SIZE, SUGGESTION_LIMIT, Suggestion,
    Translation, TranslationSummary, WORD_TYPES, WordEntry, WordForm, WordSummary,
};
pub use pronunciation::{
    CommandVoice, PhoneticLookup, PronunciationError, PronunciationPlan, PronunciationStatus,
    Pronouncer, Voice,
};
pub use search::{SearchController, SearchState, SubmitOutcome};
pub use theme::{FilePreferences, PreferenceStore, Theme, ThemeContext};
