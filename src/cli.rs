use std::error::Error;
use std::sync::Arc;

use atty::Stream;
use clap::{Parser, Subcommand};
use serde_json::json;
use sozluk_rs::{
    AppConfig, CommandVoice, Difficulty, FilePreferences, Language, ListController, ListState,
    PronunciationError, PronunciationPlan, Pronouncer, SearchController, SearchState,
    ThemeContext, WORD_TYPES, WordEntry, WordForm,
};
use sozluk_rs::{DictionaryApi, HttpDictionaryClient};
use termimad::{FmtText, MadSkin, terminal_size};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "sozluk_rs=info,tower_http=info";

#[derive(Parser, Debug)]
#[command(
    name = "sozluk-rs",
    about = "English-Turkish dictionary browser and proxy",
    version
)]
pub struct Cli {
    /// Emit JSON instead of human-readable output.
    #[arg(long, global = true)]
    json: bool,

    /// Dictionary origin to talk to (defaults to SOZLUK_BACKEND_URL).
    #[arg(long, global = true)]
    backend: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the web application.
    #[cfg(feature = "web")]
    Serve {
        /// Listen address, e.g. 127.0.0.1:3000.
        #[arg(long)]
        addr: Option<String>,
    },
    /// Look up a word and show its translations.
    Search {
        word: String,
        #[arg(short, long, default_value = "en")]
        lang: Language,
    },
    /// Show autocomplete suggestions for a partial word.
    Suggest {
        text: String,
        #[arg(short, long, default_value = "en")]
        lang: Language,
    },
    /// Browse the word list, optionally by initial letter.
    List {
        #[arg(short, long, default_value = "en")]
        lang: Language,
        /// Initial letter; omit to list every word.
        #[arg(long)]
        letter: Option<String>,
        /// Number of pages to load.
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },
    /// Add a new word with a single translation.
    Add {
        word: String,
        #[arg(long)]
        translation: String,
        #[arg(long)]
        definition: String,
        /// Word type (noun, verb, adjective, ...).
        #[arg(long = "type", default_value = "noun")]
        part_of_speech: String,
        #[arg(long, default_value = "B1")]
        difficulty: Difficulty,
        #[arg(short, long, default_value = "en")]
        lang: Language,
        /// Usage example; repeat for several.
        #[arg(long = "example")]
        examples: Vec<String>,
    },
    /// Pronounce a word through the local speech or audio program.
    Pronounce {
        word: String,
        #[arg(short, long, default_value = "en")]
        lang: Language,
    },
    /// Show or toggle the dark-mode preference.
    Theme {
        #[arg(long)]
        toggle: bool,
    },
}

pub fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing();
    let mut config = AppConfig::from_env()?;
    if let Some(backend) = &cli.backend {
        config = config.with_backend(backend)?;
    }
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(dispatch(cli, config))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn dispatch(cli: Cli, config: AppConfig) -> Result<(), Box<dyn Error>> {
    let as_json = cli.json;
    match cli.command {
        #[cfg(feature = "web")]
        Command::Serve { addr } => {
            let config = match addr {
                Some(addr) => config.with_addr(&addr)?,
                None => config,
            };
            sozluk_rs::web::serve(config).await?;
            Ok(())
        }
        Command::Search { word, lang } => {
            handle_search(gateway(&config)?, word, lang, as_json).await
        }
        Command::Suggest { text, lang } => {
            handle_suggest(gateway(&config)?, text, lang, as_json).await
        }
        Command::List {
            lang,
            letter,
            pages,
        } => handle_list(gateway(&config)?, lang, letter, pages, as_json).await,
        Command::Add {
            word,
            translation,
            definition,
            part_of_speech,
            difficulty,
            lang,
            examples,
        } => {
            if !WORD_TYPES.contains(&part_of_speech.as_str()) {
                return Err(format!(
                    "Unknown word type {part_of_speech:?} (expected one of {})",
                    WORD_TYPES.join(", ")
                )
                .into());
            }
            let form = WordForm {
                word,
                language: lang,
                part_of_speech,
                difficulty,
                translation,
                definition,
                examples,
            };
            handle_add(gateway(&config)?, form, as_json).await
        }
        Command::Pronounce { word, lang } => {
            handle_pronounce(&config, word, lang, as_json).await
        }
        Command::Theme { toggle } => handle_theme(&config, toggle, as_json),
    }
}

fn gateway(config: &AppConfig) -> Result<Arc<HttpDictionaryClient>, Box<dyn Error>> {
    Ok(Arc::new(config.gateway()?))
}

async fn handle_search(
    api: Arc<HttpDictionaryClient>,
    word: String,
    lang: Language,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    if word.trim().is_empty() {
        return Err("Search word cannot be empty".into());
    }
    let controller = SearchController::new(api, lang);
    controller.submit(&word).await;
    let SearchState { result, error, .. } = controller.snapshot();
    if let Some(message) = error {
        return Err(message.into());
    }
    let Some(entry) = result else {
        return Err(format!("No entry found for {word:?}").into());
    };
    if as_json {
        println!("{}", serde_json::to_string_pretty(&entry)?);
    } else {
        render_markdown(&entry_markdown(&entry));
    }
    Ok(())
}

async fn handle_suggest(
    api: Arc<HttpDictionaryClient>,
    text: String,
    lang: Language,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let controller = SearchController::new(api, lang);
    controller.set_query(text.as_str());
    controller.settle().await;
    let state = controller.snapshot();
    let suggestions = state.dropdown();

    if as_json {
        let payload = json!({
            "query": text,
            "lang": lang,
            "results": suggestions,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }
    if suggestions.is_empty() {
        println!("No suggestions for \"{text}\".");
        return Ok(());
    }
    let width = suggestions
        .iter()
        .map(|suggestion| suggestion.word.chars().count())
        .max()
        .unwrap_or(4)
        .max("WORD".len());
    println!("{:<width$}  {}", "WORD", "TRANSLATION", width = width);
    println!("{:-<width$}  {}", "", "-----------", width = width);
    for suggestion in suggestions {
        println!(
            "{:<width$}  {}",
            suggestion.word,
            suggestion.translation,
            width = width
        );
    }
    Ok(())
}

async fn handle_list(
    api: Arc<HttpDictionaryClient>,
    lang: Language,
    letter: Option<String>,
    pages: u32,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let controller = ListController::open(api, lang, letter.as_deref()).await;
    for _ in 1..pages.max(1) {
        if !controller.load_more().await || controller.snapshot().error.is_some() {
            break;
        }
    }
    let ListState {
        selected_letter,
        page,
        words,
        has_more,
        error,
        ..
    } = controller.snapshot();
    if let Some(message) = error {
        return Err(message.into());
    }

    if as_json {
        let payload = json!({
            "lang": lang,
            "letter": selected_letter,
            "pages": page,
            "has_more": has_more,
            "results": words,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }
    if words.is_empty() {
        println!("No words found.");
        return Ok(());
    }
    let width = words
        .iter()
        .map(|summary| summary.word.chars().count())
        .max()
        .unwrap_or(4)
        .max("WORD".len());
    println!("Words for {selected_letter} ({}):", lang.label());
    println!("{:<width$}  {}", "WORD", "TRANSLATIONS", width = width);
    println!("{:-<width$}  {}", "", "------------", width = width);
    for summary in &words {
        println!(
            "{:<width$}  {}",
            summary.word,
            summary.translation_line(),
            width = width
        );
    }
    if has_more {
        println!("\nMore words available; rerun with --pages {}.", page + 1);
    } else {
        println!("\nNo more words to load.");
    }
    Ok(())
}

async fn handle_add(
    api: Arc<HttpDictionaryClient>,
    form: WordForm,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let word = form.into_new_word()?;
    let created = api.add_word(&word).await.map_err(|err| {
        tracing::warn!(error = %err, word = %word.word, "add word failed");
        err.user_message("Failed to add word. Please try again.")
    })?;
    if as_json {
        println!("{}", serde_json::to_string_pretty(&created)?);
    } else {
        println!("Word added successfully!");
        render_markdown(&entry_markdown(&created));
    }
    Ok(())
}

async fn handle_pronounce(
    config: &AppConfig,
    word: String,
    lang: Language,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let pronouncer = Pronouncer::new(
        config.phonetics()?,
        CommandVoice::new(&config.speech_command, &config.audio_command),
    );
    let outcome = pronouncer.speak(&word, lang).await;
    let status = pronouncer.status();

    if as_json {
        let payload = json!({
            "word": word,
            "lang": lang,
            "plan": outcome.as_ref().ok(),
            "playing": status.playing,
            "error": status.error,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }
    let plan = match outcome {
        Err(PronunciationError::Unavailable) => {
            println!("No pronunciation available for \"{word}\".");
            return Ok(());
        }
        other => other?,
    };
    match plan {
        PronunciationPlan::Audio { url } => println!("Played {url}"),
        PronunciationPlan::Speech { text, locale } => println!("Spoke \"{text}\" ({locale})"),
    }
    Ok(())
}

fn handle_theme(config: &AppConfig, toggle: bool, as_json: bool) -> Result<(), Box<dyn Error>> {
    let mut context = ThemeContext::load(FilePreferences::new(&config.preferences_path));
    if toggle {
        context.toggle();
    }
    let theme = context.theme();

    if as_json {
        let payload = json!({
            "theme": theme.label(),
            "darkMode": theme.is_dark(),
            "path": config.preferences_path.display().to_string(),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!(
            "Theme: {} ({})",
            theme.label(),
            config.preferences_path.display()
        );
    }
    Ok(())
}

fn entry_markdown(entry: &WordEntry) -> String {
    let mut text = format!(
        "# {} `{}`\n\n*{}*\n",
        entry.word,
        entry.difficulty,
        entry.language.label()
    );
    for translation in &entry.translations {
        text.push_str(&format!(
            "\n## {} ({})\n\n**Definitions**\n\n",
            translation.word, translation.part_of_speech
        ));
        for definition in &translation.definitions {
            text.push_str(&format!("* {definition}\n"));
        }
        if !translation.examples.is_empty() {
            text.push_str("\n**Examples**\n\n");
            for example in &translation.examples {
                text.push_str(&format!("> {example}\n"));
            }
        }
    }
    text
}

fn stdout_is_tty() -> bool {
    atty::is(Stream::Stdout)
}

fn markdown_width() -> usize {
    let (width, _) = terminal_size();
    width.max(60) as usize
}

fn render_markdown(body: &str) {
    if stdout_is_tty() {
        let skin = MadSkin::default();
        let formatted = FmtText::from(&skin, body, Some(markdown_width()));
        println!("{formatted}");
    } else {
        println!("{body}");
    }
}
