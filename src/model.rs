use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of words requested per listing page.
pub const PAGE_SIZE: usize = 12;
/// Default number of autocomplete suggestions.
pub const SUGGESTION_LIMIT: usize = 10;

const ENGLISH_LETTERS: &[&str] = &[
    "All", "A", "B", "C", "D", "E", "F", "G", "H", "I", "J", "K", "L", "M", "N", "O", "P", "Q", "R",
    "S", "T", "U", "V", "W", "X", "Y", "Z",
];
const TURKISH_LETTERS: &[&str] = &[
    "Tümü", "A", "B", "C", "Ç", "D", "E", "F", "G", "Ğ", "H", "I", "İ", "J", "K", "L", "M", "N", "O",
    "Ö", "P", "R", "S", "Ş", "T", "U", "Ü", "V", "Y", "Z",
];

pub const WORD_TYPES: &[&str] = &[
    "noun",
    "verb",
    "adjective",
    "adverb",
    "pronoun",
    "preposition",
    "conjunction",
    "interjection",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Tr,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::En, Language::Tr];

    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Tr => "tr",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Tr => "Turkish",
        }
    }

    /// The "show all" pseudo-letter. Never sent to the backend as a filter.
    pub fn all_letter(self) -> &'static str {
        self.alphabet()[0]
    }

    /// Letter bar for this language, sentinel first.
    pub fn alphabet(self) -> &'static [&'static str] {
        match self {
            Language::En => ENGLISH_LETTERS,
            Language::Tr => TURKISH_LETTERS,
        }
    }

    /// Maps a selected letter to the path segment sent upstream, `None` for the sentinel.
    pub fn letter_filter(self, letter: &str) -> Option<String> {
        if letter.is_empty() || letter == self.all_letter() {
            None
        } else {
            Some(letter.to_lowercase())
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported language {0:?} (expected `en` or `tr`)")]
pub struct ParseLanguageError(String);

impl FromStr for Language {
    type Err = ParseLanguageError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Language::En),
            "tr" => Ok(Language::Tr),
            _ => Err(ParseLanguageError(value.to_string())),
        }
    }
}

/// CEFR level attached to every entry, ordered from easiest to hardest.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum Difficulty {
    A1,
    A2,
    #[default]
    B1,
    B2,
    C1,
    C2,
}

impl Difficulty {
    pub const ALL: [Difficulty; 6] = [
        Difficulty::A1,
        Difficulty::A2,
        Difficulty::B1,
        Difficulty::B2,
        Difficulty::C1,
        Difficulty::C2,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::A1 => "A1",
            Difficulty::A2 => "A2",
            Difficulty::B1 => "B1",
            Difficulty::B2 => "B2",
            Difficulty::C1 => "C1",
            Difficulty::C2 => "C2",
        }
    }

    pub fn badge_class(self) -> &'static str {
        match self {
            Difficulty::A1 => "bg-green-100 text-green-800 dark:bg-green-900 dark:text-green-300",
            Difficulty::A2 => {
                "bg-emerald-100 text-emerald-800 dark:bg-emerald-900 dark:text-emerald-300"
            }
            Difficulty::B1 => "bg-blue-100 text-blue-800 dark:bg-blue-900 dark:text-blue-300",
            Difficulty::B2 => "bg-indigo-100 text-indigo-800 dark:bg-indigo-900 dark:text-indigo-300",
            Difficulty::C1 => "bg-purple-100 text-purple-800 dark:bg-purple-900 dark:text-purple-300",
            Difficulty::C2 => "bg-violet-100 text-violet-800 dark:bg-violet-900 dark:text-violet-300",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown difficulty {0:?} (expected A1, A2, B1, B2, C1 or C2)")]
pub struct ParseDifficultyError(String);

impl FromStr for Difficulty {
    type Err = ParseDifficultyError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = value.trim().to_ascii_uppercase();
        Difficulty::ALL
            .into_iter()
            .find(|level| level.as_str() == wanted)
            .ok_or_else(|| ParseDifficultyError(value.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translation {
    pub word: String,
    #[serde(rename = "type")]
    pub part_of_speech: String,
    #[serde(default)]
    pub definitions: Vec<String>,
    #[serde(default)]
    pub examples: Vec<String>,
}

/// A full dictionary entry as returned by the backend search endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordEntry {
    pub word: String,
    pub language: Language,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub translations: Vec<Translation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationSummary {
    pub word: String,
    #[serde(rename = "type", default)]
    pub part_of_speech: String,
}

/// The slice of an entry the listing endpoints are relied upon to return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordSummary {
    pub word: String,
    #[serde(default)]
    pub translations: Vec<TranslationSummary>,
}

impl WordSummary {
    pub fn translation_line(&self) -> String {
        self.translations
            .iter()
            .map(|translation| translation.word.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub word: String,
    #[serde(default)]
    pub translation: String,
}

/// Body of a word-creation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewWord {
    pub word: String,
    pub language: Language,
    pub difficulty: Difficulty,
    pub translations: Vec<Translation>,
}

/// Raw add-word form fields, before the required-field check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordForm {
    pub word: String,
    pub language: Language,
    pub part_of_speech: String,
    pub difficulty: Difficulty,
    pub translation: String,
    pub definition: String,
    pub examples: Vec<String>,
}

impl Default for WordForm {
    fn default() -> Self {
        Self {
            word: String::new(),
            language: Language::En,
            part_of_speech: WORD_TYPES[0].to_string(),
            difficulty: Difficulty::B1,
            translation: String::new(),
            definition: String::new(),
            examples: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    #[error("{0} is required")]
    MissingField(&'static str),
}

impl WordForm {
    /// Checks the required fields and shapes the submission. Blank examples are dropped.
    pub fn into_new_word(self) -> Result<NewWord, FormError> {
        if self.word.trim().is_empty() {
            return Err(FormError::MissingField("Word"));
        }
        if self.translation.trim().is_empty() {
            return Err(FormError::MissingField("Translation"));
        }
        if self.definition.trim().is_empty() {
            return Err(FormError::MissingField("Definition"));
        }
        let examples = self
            .examples
            .into_iter()
            .filter(|example| !example.trim().is_empty())
            .collect();
        Ok(NewWord {
            word: self.word,
            language: self.language,
            difficulty: self.difficulty,
            translations: vec![Translation {
                word: self.translation,
                part_of_speech: self.part_of_speech,
                definitions: vec![self.definition],
                examples,
            }],
        })
    }
}
