//! Locale selection.
//!
//! The locale is resolved once at startup and passed explicitly to whatever
//! renders localized text.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// A supported output language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Locale {
    #[default]
    En,
    Zh,
}

impl Locale {
    /// Pick a locale from the usual POSIX variables, in `LANG`, `LC_ALL`,
    /// `LC_MESSAGES` order. The first non-empty one wins.
    pub fn from_env_vars(lang: Option<&str>, lc_all: Option<&str>, lc_messages: Option<&str>) -> Self {
        let raw = [lang, lc_all, lc_messages]
            .into_iter()
            .flatten()
            .find(|v| !v.is_empty())
            .unwrap_or("");
        if normalize_tag(raw).starts_with("zh") {
            Locale::Zh
        } else {
            Locale::En
        }
    }

    /// Detect from the process environment.
    pub fn detect() -> Self {
        let lang = std::env::var("LANG").ok();
        let lc_all = std::env::var("LC_ALL").ok();
        let lc_messages = std::env::var("LC_MESSAGES").ok();
        Self::from_env_vars(lang.as_deref(), lc_all.as_deref(), lc_messages.as_deref())
    }
}

/// `zh_CN.UTF-8` -> `zh-cn`.
fn normalize_tag(raw: &str) -> String {
    raw.split('.')
        .next()
        .unwrap_or("")
        .replace('_', "-")
        .to_lowercase()
}

/// Locale as written in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocaleSetting {
    #[default]
    Auto,
    En,
    Zh,
}

impl LocaleSetting {
    pub fn resolve(self) -> Locale {
        match self {
            LocaleSetting::Auto => Locale::detect(),
            LocaleSetting::En => Locale::En,
            LocaleSetting::Zh => Locale::Zh,
        }
    }
}

impl FromStr for LocaleSetting {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(LocaleSetting::Auto),
            "en" => Ok(LocaleSetting::En),
            "zh" => Ok(LocaleSetting::Zh),
            other => Err(ConfigError::InvalidValue {
                field: "locale".to_string(),
                message: format!("unknown locale '{}', expected auto, en or zh", other),
            }),
        }
    }
}
