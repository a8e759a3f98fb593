//! Configuration schema definitions.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::locale::LocaleSetting;

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub locale: LocaleSetting,

    #[serde(default)]
    pub debate: DebateConfig,

    #[serde(default)]
    pub browser: BrowserConfig,

    #[serde(default = "default_agents")]
    pub agents: Vec<AgentConfig>,

    #[serde(default)]
    pub timings: TimingsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            locale: LocaleSetting::default(),
            debate: DebateConfig::default(),
            browser: BrowserConfig::default(),
            agents: default_agents(),
            timings: TimingsConfig::default(),
        }
    }
}

fn default_agents() -> Vec<AgentConfig> {
    vec![
        AgentConfig::new("Claude", "https://claude.ai/new"),
        AgentConfig::new("Gemini", "https://gemini.google.com/app"),
    ]
}

/// Debate orchestration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateConfig {
    #[serde(default = "default_rounds")]
    pub rounds: u32,

    #[serde(default = "default_max_round_retries")]
    pub max_round_retries: u32,

    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
}

impl Default for DebateConfig {
    fn default() -> Self {
        Self {
            rounds: default_rounds(),
            max_round_retries: default_max_round_retries(),
            log_dir: default_log_dir(),
        }
    }
}

fn default_rounds() -> u32 {
    5
}

fn default_max_round_retries() -> u32 {
    3
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("./logs")
}

/// Browser launching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Agent `i` gets debugging port `base_port + i`.
    #[serde(default = "default_base_port")]
    pub base_port: u16,

    #[serde(default = "default_profiles_dir")]
    pub profiles_dir: PathBuf,

    #[serde(default)]
    pub headless: bool,

    #[serde(default)]
    pub chrome_path: Option<PathBuf>,

    #[serde(default = "default_window_width")]
    pub window_width: u32,

    #[serde(default = "default_window_height")]
    pub window_height: u32,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            base_port: default_base_port(),
            profiles_dir: default_profiles_dir(),
            headless: false,
            chrome_path: None,
            window_width: default_window_width(),
            window_height: default_window_height(),
        }
    }
}

fn default_base_port() -> u16 {
    9222
}

fn default_profiles_dir() -> PathBuf {
    PathBuf::from("./profiles")
}

fn default_window_width() -> u32 {
    900
}

fn default_window_height() -> u32 {
    1000
}

/// How a message is submitted once typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmitMode {
    /// Press Enter in the input.
    #[default]
    Enter,
    /// Click a visible control whose label matches `submit_labels`.
    Button,
}

/// One chat participant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub name: String,

    pub url: String,

    #[serde(default)]
    pub submit: SubmitMode,

    #[serde(default)]
    pub submit_labels: Vec<String>,
}

impl AgentConfig {
    pub fn new(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            submit: SubmitMode::Enter,
            submit_labels: Vec::new(),
        }
    }
}

/// Polling and timeout budgets for the bridge engine, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingsConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Gap between the two reads of the content-delta signal.
    #[serde(default = "default_delta_delay_ms")]
    pub delta_delay_ms: u64,

    #[serde(default = "default_discovery_attempts")]
    pub discovery_attempts: u32,

    #[serde(default = "default_discovery_interval_ms")]
    pub discovery_interval_ms: u64,

    #[serde(default = "default_settle_checks")]
    pub settle_checks: u32,

    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Wall-clock budget for a whole round.
    #[serde(default = "default_round_timeout_ms")]
    pub round_timeout_ms: u64,

    /// Budget for waiting on the first sign of a reply.
    #[serde(default = "default_start_timeout_ms")]
    pub start_timeout_ms: u64,

    /// A stop control seen earlier than this after submit may still belong
    /// to the previous round.
    #[serde(default = "default_affordance_min_elapsed_ms")]
    pub affordance_min_elapsed_ms: u64,

    /// Unchanged text with no stop control for this long counts as finished.
    #[serde(default = "default_static_grace_ms")]
    pub static_grace_ms: u64,

    #[serde(default = "default_probe_max_chars")]
    pub probe_max_chars: usize,

    /// Characters an existing sibling must grow by to signal a reply.
    #[serde(default = "default_growth_threshold")]
    pub growth_threshold: usize,
}

impl Default for TimingsConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            delta_delay_ms: default_delta_delay_ms(),
            discovery_attempts: default_discovery_attempts(),
            discovery_interval_ms: default_discovery_interval_ms(),
            settle_checks: default_settle_checks(),
            settle_delay_ms: default_settle_delay_ms(),
            round_timeout_ms: default_round_timeout_ms(),
            start_timeout_ms: default_start_timeout_ms(),
            affordance_min_elapsed_ms: default_affordance_min_elapsed_ms(),
            static_grace_ms: default_static_grace_ms(),
            probe_max_chars: default_probe_max_chars(),
            growth_threshold: default_growth_threshold(),
        }
    }
}

impl TimingsConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn delta_delay(&self) -> Duration {
        Duration::from_millis(self.delta_delay_ms)
    }

    pub fn discovery_interval(&self) -> Duration {
        Duration::from_millis(self.discovery_interval_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn round_timeout(&self) -> Duration {
        Duration::from_millis(self.round_timeout_ms)
    }

    pub fn start_timeout(&self) -> Duration {
        Duration::from_millis(self.start_timeout_ms)
    }

    pub fn affordance_min_elapsed(&self) -> Duration {
        Duration::from_millis(self.affordance_min_elapsed_ms)
    }

    pub fn static_grace(&self) -> Duration {
        Duration::from_millis(self.static_grace_ms)
    }
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_delta_delay_ms() -> u64 {
    300
}

fn default_discovery_attempts() -> u32 {
    40
}

fn default_discovery_interval_ms() -> u64 {
    500
}

fn default_settle_checks() -> u32 {
    3
}

fn default_settle_delay_ms() -> u64 {
    500
}

fn default_round_timeout_ms() -> u64 {
    300_000
}

fn default_start_timeout_ms() -> u64 {
    30_000
}

fn default_affordance_min_elapsed_ms() -> u64 {
    2_000
}

fn default_static_grace_ms() -> u64 {
    8_000
}

fn default_probe_max_chars() -> usize {
    60
}

fn default_growth_threshold() -> usize {
    5
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
