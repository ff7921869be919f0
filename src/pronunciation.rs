use crate::client::encode_segment;
use crate::model::Language;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

pub const DEFAULT_PHONETICS_URL: &str = "https://api.dictionaryapi.dev";
pub const TURKISH_LOCALE: &str = "tr-TR";

#[derive(Debug, thiserror::Error)]
pub enum PronunciationError {
    #[error("Failed to fetch pronunciation")]
    Lookup(#[from] reqwest::Error),
    #[error("No pronunciation available")]
    Unavailable,
    #[error("Speech synthesis not supported")]
    SpeechUnavailable(#[source] std::io::Error),
    #[error("Failed to play pronunciation: {0}")]
    Playback(String),
}

/// How a word should be voiced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum PronunciationPlan {
    /// A recorded clip from the phonetic lookup.
    Audio { url: String },
    /// Local speech synthesis; no network involved.
    Speech { text: String, locale: String },
}

#[derive(Deserialize)]
struct PhoneticEntry {
    #[serde(default)]
    phonetics: Vec<Phonetic>,
}

#[derive(Deserialize)]
struct Phonetic {
    #[serde(default)]
    audio: Option<String>,
}

fn first_audio(entries: &[PhoneticEntry]) -> Option<String> {
    entries
        .iter()
        .flat_map(|entry| entry.phonetics.iter())
        .filter_map(|phonetic| phonetic.audio.as_deref())
        .find(|audio| !audio.trim().is_empty())
        .map(str::to_string)
}

/// Client for the third-party English phonetics API.
#[derive(Clone, Debug)]
pub struct PhoneticLookup {
    base_url: String,
    client: reqwest::Client,
}

impl PhoneticLookup {
    pub fn new(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, client }
    }

    /// First non-empty audio URL for an English word.
    pub async fn audio_url(&self, word: &str) -> Result<String, PronunciationError> {
        let url = format!("{}/api/v2/entries/en/{}", self.base_url, encode_segment(word));
        let response = self.client.get(&url).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            debug!(%word, "phonetics lookup has no entry");
            return Err(PronunciationError::Unavailable);
        }
        let entries: Vec<PhoneticEntry> = response.error_for_status()?.json().await?;
        first_audio(&entries).ok_or(PronunciationError::Unavailable)
    }

    pub async fn resolve(
        &self,
        word: &str,
        language: Language,
    ) -> Result<PronunciationPlan, PronunciationError> {
        match language {
            Language::Tr => Ok(PronunciationPlan::Speech {
                text: word.to_string(),
                locale: TURKISH_LOCALE.to_string(),
            }),
            Language::En => Ok(PronunciationPlan::Audio {
                url: self.audio_url(word).await?,
            }),
        }
    }
}

/// Output device for a [`PronunciationPlan`].
#[async_trait]
pub trait Voice: Send + Sync {
    async fn speak(&self, text: &str, locale: &str) -> Result<(), PronunciationError>;
    async fn play(&self, url: &str) -> Result<(), PronunciationError>;
}

/// Voices plans through external programs, e.g. `espeak-ng` and `mpv`.
#[derive(Debug, Clone)]
pub struct CommandVoice {
    speech: Vec<String>,
    audio: Vec<String>,
}

impl CommandVoice {
    /// Each command is split on whitespace; the first word is the program.
    pub fn new(speech_command: &str, audio_command: &str) -> Self {
        let split = |command: &str| command.split_whitespace().map(str::to_string).collect();
        Self {
            speech: split(speech_command),
            audio: split(audio_command),
        }
    }
}

async fn run(command: &[String], args: &[&str]) -> std::io::Result<std::process::ExitStatus> {
    let Some((program, fixed)) = command.split_first() else {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "no command configured",
        ));
    };
    debug!(%program, ?args, "running voice command");
    Command::new(program)
        .args(fixed)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
}

#[async_trait]
impl Voice for CommandVoice {
    async fn speak(&self, text: &str, locale: &str) -> Result<(), PronunciationError> {
        let voice = locale
            .split('-')
            .next()
            .unwrap_or(locale)
            .to_ascii_lowercase();
        let status = run(&self.speech, &["-v", &voice, text])
            .await
            .map_err(PronunciationError::SpeechUnavailable)?;
        if status.success() {
            Ok(())
        } else {
            Err(PronunciationError::Playback(format!(
                "speech synthesis exited with {status}"
            )))
        }
    }

    async fn play(&self, url: &str) -> Result<(), PronunciationError> {
        let status = run(&self.audio, &[url])
            .await
            .map_err(|err| PronunciationError::Playback(err.to_string()))?;
        if status.success() {
            Ok(())
        } else {
            Err(PronunciationError::Playback(format!(
                "audio player exited with {status}"
            )))
        }
    }
}

/// `playing` is set only while an audio clip plays; `error` holds the last failure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PronunciationStatus {
    pub playing: bool,
    pub error: Option<String>,
}

pub struct Pronouncer<V> {
    lookup: PhoneticLookup,
    voice: V,
    status: Mutex<PronunciationStatus>,
}

impl<V: Voice> Pronouncer<V> {
    pub fn new(lookup: PhoneticLookup, voice: V) -> Self {
        Self {
            lookup,
            voice,
            status: Mutex::new(PronunciationStatus::default()),
        }
    }

    pub fn status(&self) -> PronunciationStatus {
        self.status.lock().clone()
    }

    /// Resolves and voices `word`. Failures other than a missing pronunciation are also
    /// recorded in [`Pronouncer::status`].
    pub async fn speak(
        &self,
        word: &str,
        language: Language,
    ) -> Result<PronunciationPlan, PronunciationError> {
        self.status.lock().error = None;
        let result = self.perform(word, language).await;
        match &result {
            Err(PronunciationError::Unavailable) => {
                debug!(%word, %language, "no pronunciation available");
            }
            Err(err) => {
                warn!(error = %err, %word, %language, "pronunciation failed");
                self.status.lock().error = Some(err.to_string());
            }
            Ok(_) => {}
        }
        result
    }

    async fn perform(
        &self,
        word: &str,
        language: Language,
    ) -> Result<PronunciationPlan, PronunciationError> {
        let plan = self.lookup.resolve(word, language).await?;
        match &plan {
            PronunciationPlan::Speech { text, locale } => self.voice.speak(text, locale).await?,
            PronunciationPlan::Audio { url } => {
                let _playing = Playing::start(&self.status);
                self.voice.play(url).await?;
            }
        }
        Ok(plan)
    }
}

/// Holds `playing` set until dropped, including when the playback future is cancelled.
struct Playing<'a> {
    status: &'a Mutex<PronunciationStatus>,
}

impl<'a> Playing<'a> {
    fn start(status: &'a Mutex<PronunciationStatus>) -> Self {
        status.lock().playing = true;
        Self { status }
    }
}

impl Drop for Playing<'_> {
    fn drop(&mut self) {
        self.status.lock().playing = false;
    }
}
