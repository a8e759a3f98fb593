//! Launcher type definitions and configuration.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::cdp::{CdpClient, CdpError};
use crate::page::CdpPage;

/// Launcher errors.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("Chrome not found. Please install Google Chrome or set browser.chrome_path.")]
    ChromeNotFound,

    #[error("Failed to launch Chrome: {0}")]
    LaunchFailed(String),

    #[error("Chrome did not open its debugging port {0} in time")]
    StartupTimeout(u16),

    #[error(transparent)]
    Cdp(#[from] CdpError),
}

/// Settings shared by every browser the launcher starts.
#[derive(Debug, Clone)]
pub struct LauncherConfig {
    /// Explicit executable; searched for when unset.
    pub chrome_path: Option<PathBuf>,
    pub headless: bool,
    pub window_width: u32,
    pub window_height: u32,
    /// Polls of the debugging endpoint, 200 ms apart, before giving up.
    pub startup_attempts: u32,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            chrome_path: None,
            headless: false,
            window_width: 900,
            window_height: 1000,
            startup_attempts: 50,
        }
    }
}

/// Where one agent's browser lives.
#[derive(Debug, Clone)]
pub struct BrowserSlot {
    pub name: String,
    pub debug_port: u16,
    /// Persistent profile, so logins survive restarts.
    pub profile_dir: PathBuf,
    /// Position from the left; windows are tiled side by side.
    pub window_index: u32,
}

impl BrowserSlot {
    /// Get the CDP endpoint URL.
    pub fn endpoint(&self) -> String {
        format!("http://localhost:{}", self.debug_port)
    }
}

/// A connected browser and the tab the agent runs in.
pub struct Browser {
    pub(super) name: String,
    pub(super) client: Arc<CdpClient>,
    pub(super) page: Arc<CdpPage>,
}

impl Browser {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn client(&self) -> &Arc<CdpClient> {
        &self.client
    }

    pub fn page(&self) -> Arc<CdpPage> {
        Arc::clone(&self.page)
    }
}
