//! BrowserLauncher: finding, launching and connecting to Chrome.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{Browser, BrowserSlot, LaunchError, LauncherConfig};
use crate::cdp::CdpClient;
use crate::page::CdpPage;

/// Launches and tracks the Chrome processes of a debate.
pub struct BrowserLauncher {
    pub(super) config: LauncherConfig,
    /// Processes this launcher started, by agent name.
    processes: Mutex<Vec<(String, Child)>>,
}

impl BrowserLauncher {
    pub fn new(config: LauncherConfig) -> Self {
        Self {
            config,
            processes: Mutex::new(Vec::new()),
        }
    }

    /// Find Chrome executable path.
    pub fn find_chrome() -> Option<PathBuf> {
        #[cfg(target_os = "macos")]
        let paths: &[&str] = &[
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
        ];

        #[cfg(target_os = "linux")]
        let paths: &[&str] = &[
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/snap/bin/chromium",
        ];

        #[cfg(target_os = "windows")]
        let paths: &[&str] = &[
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
        ];

        #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
        let paths: &[&str] = &[];

        paths.iter().map(PathBuf::from).find(|p| p.exists())
    }

    fn chrome_path(&self) -> Result<PathBuf, LaunchError> {
        match &self.config.chrome_path {
            Some(path) if path.exists() => Ok(path.clone()),
            Some(path) => {
                warn!("Configured Chrome {} does not exist, searching", path.display());
                Self::find_chrome().ok_or(LaunchError::ChromeNotFound)
            }
            None => Self::find_chrome().ok_or(LaunchError::ChromeNotFound),
        }
    }

    /// Command line for the slot's browser.
    pub fn chrome_args(&self, slot: &BrowserSlot) -> Vec<String> {
        let left = slot.window_index * self.config.window_width;
        let mut args = vec![
            format!("--remote-debugging-port={}", slot.debug_port),
            format!("--user-data-dir={}", slot.profile_dir.display()),
            format!(
                "--window-size={},{}",
                self.config.window_width, self.config.window_height
            ),
            format!("--window-position={},0", left),
            "--no-first-run".to_string(),
            "--no-default-browser-check".to_string(),
            "--disable-sync".to_string(),
            "--disable-translate".to_string(),
        ];
        if self.config.headless {
            args.push("--headless=new".to_string());
        }
        args
    }

    /// Check if a browser already listens on the slot's port.
    async fn is_running(slot: &BrowserSlot) -> bool {
        reqwest::get(&format!("{}/json/version", slot.endpoint()))
            .await
            .is_ok()
    }

    async fn spawn(&self, slot: &BrowserSlot) -> Result<Child, LaunchError> {
        let chrome_path = self.chrome_path()?;

        if let Err(e) = std::fs::create_dir_all(&slot.profile_dir) {
            warn!("Failed to create profile directory: {}", e);
        }

        info!(
            "[{}] Launching Chrome on port {} with profile {}",
            slot.name,
            slot.debug_port,
            slot.profile_dir.display()
        );

        let child = Command::new(&chrome_path)
            .args(self.chrome_args(slot))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| LaunchError::LaunchFailed(e.to_string()))?;

        debug!("[{}] Chrome launched with PID: {:?}", slot.name, child.id());
        Ok(child)
    }

    /// Start (or reuse) the slot's browser, connect, and attach to its first
    /// regular tab, opening one if there is none.
    pub async fn launch(&self, slot: &BrowserSlot) -> Result<Browser, LaunchError> {
        if Self::is_running(slot).await {
            info!("[{}] Chrome already running on port {}", slot.name, slot.debug_port);
        } else {
            let child = self.spawn(slot).await?;
            self.processes.lock().await.push((slot.name.clone(), child));

            let mut attempts = 0;
            loop {
                tokio::time::sleep(std::time::Duration::from_millis(200)).await;
                if Self::is_running(slot).await {
                    break;
                }
                attempts += 1;
                if attempts >= self.config.startup_attempts {
                    return Err(LaunchError::StartupTimeout(slot.debug_port));
                }
            }
        }

        let client = CdpClient::connect(&slot.endpoint()).await?;
        let tab = client.list_pages().await?.into_iter().find(|p| p.is_tab());
        let session = match tab {
            Some(tab) => {
                debug!("[{}] Attaching to existing tab {}", slot.name, tab.url);
                client.attach_page(&tab.id).await?
            }
            None => client.new_page(None).await?,
        };
        if let Err(e) = session.bring_to_front().await {
            debug!("[{}] Could not focus tab: {}", slot.name, e);
        }

        info!("[{}] Connected to Chrome at {}", slot.name, slot.endpoint());
        Ok(Browser {
            name: slot.name.clone(),
            client: Arc::new(client),
            page: Arc::new(CdpPage::new(session)),
        })
    }

    /// Number of browsers this launcher started itself.
    pub async fn launched(&self) -> usize {
        self.processes.lock().await.len()
    }

    /// Kill every browser this launcher started. Browsers that were already
    /// running are left alone.
    pub async fn shutdown(&self) {
        let mut processes = self.processes.lock().await;
        for (name, mut child) in processes.drain(..) {
            info!("[{}] Shutting down Chrome...", name);
            if let Err(e) = child.kill().await {
                warn!("[{}] Failed to kill Chrome: {}", name, e);
            }
        }
    }
}
