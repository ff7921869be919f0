use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Key the dark-mode preference is stored under, as a cookie name and as a JSON field.
pub const DARK_MODE_KEY: &str = "darkMode";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    /// Preference not read yet; nothing theme-dependent is rendered.
    #[default]
    Unknown,
    Light,
    Dark,
}

impl Theme {
    pub fn from_dark(dark: bool) -> Self {
        if dark { Theme::Dark } else { Theme::Light }
    }

    /// Class for the document root. Empty while unknown.
    pub fn css_class(self) -> &'static str {
        match self {
            Theme::Unknown => "",
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn is_dark(self) -> bool {
        self == Theme::Dark
    }

    pub fn label(self) -> &'static str {
        match self {
            Theme::Unknown => "unknown",
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

/// Where the dark-mode flag lives between runs.
pub trait PreferenceStore {
    /// `None` when nothing was stored yet.
    fn load(&self) -> Option<bool>;
    fn save(&mut self, dark: bool);
}

/// Theme state owned by the root of a view tree.
#[derive(Debug)]
pub struct ThemeContext<S> {
    store: S,
    theme: Theme,
}

impl<S: PreferenceStore> ThemeContext<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            theme: Theme::Unknown,
        }
    }

    /// Builds and initialises in one step.
    pub fn load(store: S) -> Self {
        let mut context = Self::new(store);
        context.init();
        context
    }

    /// Reads the stored preference; a missing value means light.
    pub fn init(&mut self) -> Theme {
        self.theme = Theme::from_dark(self.store.load().unwrap_or(false));
        self.theme
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn toggle(&mut self) -> Theme {
        if self.theme == Theme::Unknown {
            self.init();
        }
        let dark = !self.theme.is_dark();
        self.store.save(dark);
        self.theme = Theme::from_dark(dark);
        debug!(theme = self.theme.label(), "theme toggled");
        self.theme
    }

    pub fn into_store(self) -> S {
        self.store
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PreferenceFile {
    #[serde(rename = "darkMode", default, skip_serializing_if = "Option::is_none")]
    dark_mode: Option<bool>,
}

/// JSON file holding `{"darkMode": bool}`.
#[derive(Debug, Clone)]
pub struct FilePreferences {
    path: PathBuf,
}

impl FilePreferences {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl PreferenceStore for FilePreferences {
    fn load(&self) -> Option<bool> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
            Err(err) => {
                warn!(error = %err, path = %self.path.display(), "failed to read preferences");
                return None;
            }
        };
        match serde_json::from_slice::<PreferenceFile>(&bytes) {
            Ok(file) => file.dark_mode,
            Err(err) => {
                warn!(error = %err, path = %self.path.display(), "ignoring malformed preferences");
                None
            }
        }
    }

    fn save(&mut self, dark: bool) {
        if let Some(parent) = self.path.parent() {
            if let Err(err) = fs::create_dir_all(parent) {
                warn!(error = %err, "failed to create preferences directory");
                return;
            }
        }
        let body = match serde_json::to_vec_pretty(&PreferenceFile {
            dark_mode: Some(dark),
        }) {
            Ok(body) => body,
            Err(err) => {
                warn!(error = %err, "failed to serialize preferences");
                return;
            }
        };
        if let Err(err) = fs::write(&self.path, body) {
            warn!(error = %err, path = %self.path.display(), "failed to write preferences");
        }
    }
}

/// `$XDG_CONFIG_HOME/sozluk/preferences.json`, falling back to the working directory.
pub fn default_preferences_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sozluk")
        .join("preferences.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct MemoryStore {
        value: Option<bool>,
        writes: usize,
    }

    impl PreferenceStore for MemoryStore {
        fn load(&self) -> Option<bool> {
            self.value
        }

        fn save(&mut self, dark: bool) {
            self.value = Some(dark);
            self.writes += 1;
        }
    }

    fn scratch_file() -> PathBuf {
        static NEXT: AtomicUsize = AtomicUsize::new(0);
        std::env::temp_dir()
            .join(format!(
                "sozluk-theme-{}-{}",
                std::process::id(),
                NEXT.fetch_add(1, Ordering::SeqCst)
            ))
            .join("preferences.json")
    }

    #[test]
    fn theme_is_unknown_until_initialised() {
        let mut context = ThemeContext::new(MemoryStore {
            value: Some(true),
            writes: 0,
        });
        assert_eq!(context.theme(), Theme::Unknown);
        assert_eq!(context.theme().css_class(), "");
        assert_eq!(context.init(), Theme::Dark);
    }

    #[test]
    fn missing_preference_means_light() {
        let context = ThemeContext::load(MemoryStore::default());
        assert_eq!(context.theme(), Theme::Light);
        assert_eq!(context.into_store().writes, 0);
    }

    #[test]
    fn toggle_flips_and_persists() {
        let mut context = ThemeContext::load(MemoryStore::default());
        assert_eq!(context.toggle(), Theme::Dark);
        assert_eq!(context.toggle(), Theme::Light);
        let store = context.into_store();
        assert_eq!(store.value, Some(false));
        assert_eq!(store.writes, 2);
    }

    #[test]
    fn toggle_before_init_reads_first() {
        let mut context = ThemeContext::new(MemoryStore {
            value: Some(true),
            writes: 0,
        });
        assert_eq!(context.toggle(), Theme::Light);
    }

    #[test]
    fn file_preference_survives_reopen() {
        let path = scratch_file();
        let mut context = ThemeContext::load(FilePreferences::new(&path));
        assert_eq!(context.theme(), Theme::Light);
        context.toggle();

        let reopened = ThemeContext::load(FilePreferences::new(&path));
        assert_eq!(reopened.theme(), Theme::Dark);
        let raw: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(raw[DARK_MODE_KEY], true);
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn malformed_file_is_ignored() {
        let path = scratch_file();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"not json").unwrap();
        assert_eq!(FilePreferences::new(&path).load(), None);
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }
}
