//! CLI definitions for Agora.

use std::path::PathBuf;

use agora_config::{Config, Locale, LocaleSetting};
use clap::Parser;

const DEFAULT_TOPIC_EN: &str =
    "AI will take over most of the work of software engineers within the next 5 years";
const DEFAULT_TOPIC_ZH: &str = "AI 会在未来 5 年内取代大部分软件工程师的工作";

/// Agora CLI.
#[derive(Debug, Parser)]
#[command(name = "agora")]
#[command(about = "Let two AI chat web apps debate each other")]
#[command(version)]
pub(crate) struct Cli {
    /// Debate topic (default depends on the locale)
    pub topic: Option<String>,

    /// Number of rounds after the opening statements
    pub rounds: Option<u32>,

    /// Configuration file path
    #[arg(short, long, default_value = "agora.toml")]
    pub config: PathBuf,

    /// Transcript directory
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Output language (auto, en, zh)
    #[arg(long)]
    pub locale: Option<LocaleSetting>,

    /// Run both browsers headless
    #[arg(long)]
    pub headless: bool,
}

impl Cli {
    /// Write command-line overrides into `config`.
    pub fn apply(&self, config: &mut Config) {
        if let Some(rounds) = self.rounds {
            config.debate.rounds = rounds;
        }
        if let Some(log_dir) = &self.log_dir {
            config.debate.log_dir = log_dir.clone();
        }
        if let Some(locale) = self.locale {
            config.locale = locale;
        }
        if self.headless {
            config.browser.headless = true;
        }
    }

    pub fn topic_or_default(&self, locale: Locale) -> String {
        self.topic
            .clone()
            .unwrap_or_else(|| default_topic(locale).to_string())
    }
}

pub(crate) fn default_topic(locale: Locale) -> &'static str {
    match locale {
        Locale::En => DEFAULT_TOPIC_EN,
        Locale::Zh => DEFAULT_TOPIC_ZH,
    }
}
