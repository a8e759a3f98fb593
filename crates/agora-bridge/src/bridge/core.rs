//! Bridge struct, shared state and counterpart wiring.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use agora_config::{AgentConfig, TimingsConfig};
use agora_protocols::{BridgeError, DomNodeRef, NavigationEvent, Page};
use parking_lot::Mutex;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::monitor::StreamingMonitor;
use crate::probe::select_probe;
use crate::region::discard;
use crate::templates::PromptTemplates;

/// Handles cached across rounds.
#[derive(Debug, Default)]
pub(super) struct BridgeState {
    pub(super) round: u32,
    pub(super) input: Option<DomNodeRef>,
    /// Scroll container of the conversation, resolved after round one.
    pub(super) scroll_root: Option<DomNodeRef>,
    /// Container of the last completed reply.
    pub(super) previous: Option<DomNodeRef>,
}

impl BridgeState {
    /// Drop every cached handle; the next round rediscovers from scratch.
    pub(super) async fn reset(&mut self, page: &dyn Page) {
        for node in [
            self.input.take(),
            self.scroll_root.take(),
            self.previous.take(),
        ]
        .into_iter()
        .flatten()
        {
            discard(page, node).await;
        }
    }

    /// Forget the conversation containers if they left the document.
    pub(super) async fn validate(&mut self, page: &dyn Page) {
        let mut stale = false;
        for node in [self.scroll_root.as_ref(), self.previous.as_ref()]
            .into_iter()
            .flatten()
        {
            stale |= !page.is_attached(node).await.unwrap_or(false);
        }
        if stale {
            debug!("Cached conversation containers are stale, rediscovering");
            for node in [self.scroll_root.take(), self.previous.take()]
                .into_iter()
                .flatten()
            {
                discard(page, node).await;
            }
        }
    }
}

/// Clears an [`AtomicBool`] flag when dropped.
pub(super) struct FlagGuard<'a>(&'a AtomicBool);

impl<'a> FlagGuard<'a> {
    pub(super) fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for FlagGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// One chat participant: a page plus the turn protocol that drives it.
///
/// A bridge may have a target bridge. While a reply streams in, every new
/// partial text is mirrored into the target's input box, and the finished
/// reply is handed over with a turn prompt naming the target.
pub struct AgentBridge {
    pub(super) agent: AgentConfig,
    pub(super) page: Arc<dyn Page>,
    pub(super) timings: TimingsConfig,
    pub(super) templates: PromptTemplates,
    pub(super) monitor: StreamingMonitor,
    pub(super) state: tokio::sync::Mutex<BridgeState>,
    navigations: Mutex<broadcast::Receiver<NavigationEvent>>,
    /// A `send` is in flight.
    pub(super) sending: AtomicBool,
    /// An `update_input` is in flight.
    mirroring: AtomicBool,
    mirrored: Mutex<Option<String>>,
    target: Mutex<Option<Weak<AgentBridge>>>,
}

impl AgentBridge {
    pub fn new(
        agent: AgentConfig,
        page: Arc<dyn Page>,
        timings: TimingsConfig,
        templates: PromptTemplates,
    ) -> Self {
        let monitor = StreamingMonitor::new(templates.locale(), timings.delta_delay());
        let navigations = Mutex::new(page.navigations());
        Self {
            agent,
            page,
            timings,
            templates,
            monitor,
            state: tokio::sync::Mutex::new(BridgeState::default()),
            navigations,
            sending: AtomicBool::new(false),
            mirroring: AtomicBool::new(false),
            mirrored: Mutex::new(None),
            target: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.agent.name
    }

    pub fn page(&self) -> &Arc<dyn Page> {
        &self.page
    }

    /// Bridge that receives this bridge's replies; `None` stops mirroring.
    pub fn set_target_bridge(&self, target: Option<&Arc<AgentBridge>>) {
        *self.target.lock() = target.map(Arc::downgrade);
    }

    pub(super) fn target(&self) -> Option<Arc<AgentBridge>> {
        self.target.lock().as_ref().and_then(Weak::upgrade)
    }

    /// Text most recently mirrored into this bridge by its counterpart.
    pub fn last_mirrored(&self) -> Option<String> {
        self.mirrored.lock().clone()
    }

    /// Submit `message`, or the last mirrored text when `None`, and wait for
    /// the complete reply.
    pub async fn send(&self, message: Option<&str>) -> Result<String, BridgeError> {
        let Some(_sending) = FlagGuard::acquire(&self.sending) else {
            return Err(BridgeError::Busy);
        };
        let message = match message {
            Some(message) => message.to_string(),
            None => self.last_mirrored().ok_or(BridgeError::NoContent)?,
        };
        let message = message.replace("\r\n", "\n");
        let probe = select_probe(&message, self.timings.probe_max_chars)
            .ok_or(BridgeError::NoContent)?;

        let mut state = self.state.lock().await;
        self.sync_navigation(&mut state).await;
        state.validate(self.page.as_ref()).await;
        state.round += 1;
        let round = state.round;
        info!(
            "[{}] Round {}: sending {} chars",
            self.name(),
            round,
            message.chars().count()
        );

        let result = self.run_round(&mut state, &message, &probe).await;
        match &result {
            Ok(reply) => info!(
                "[{}] Round {} complete ({} chars)",
                self.name(),
                round,
                reply.chars().count()
            ),
            Err(e) => {
                warn!("[{}] Round {} failed: {}", self.name(), round, e);
                if !matches!(e, BridgeError::NoInputFound) {
                    state.reset(self.page.as_ref()).await;
                }
            }
        }
        result
    }

    /// Mirror `text` into this bridge's input box. Best effort: skipped while
    /// this bridge is sending or another mirror write is running, and
    /// failures are only logged.
    pub async fn update_input(&self, text: &str) {
        if self.sending.load(Ordering::Acquire) {
            debug!("[{}] Round in flight, not mirroring", self.name());
            return;
        }
        *self.mirrored.lock() = Some(text.to_string());

        let Some(_mirroring) = FlagGuard::acquire(&self.mirroring) else {
            debug!("[{}] Mirror write already running, skipping update", self.name());
            return;
        };
        let Ok(mut state) = self.state.try_lock() else {
            debug!("[{}] Bridge state busy, skipping mirror write", self.name());
            return;
        };
        self.sync_navigation(&mut state).await;
        if let Err(e) = self.write_input(&mut state, text).await {
            warn!("[{}] Failed to mirror counterpart text: {}", self.name(), e);
        }
    }

    /// Forward the page's console output to the debug log.
    pub fn spawn_console_forwarder(&self) -> JoinHandle<()> {
        let mut messages = self.page.console_messages();
        let name = self.agent.name.clone();
        tokio::spawn(async move {
            loop {
                match messages.recv().await {
                    Ok(msg) => debug!("[{}] console.{}: {}", name, msg.level, msg.text),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        debug!("[{}] Skipped {} console messages", name, n)
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    /// Whether the page navigated since the last check.
    pub(super) fn navigated(&self) -> bool {
        let mut navigations = self.navigations.lock();
        let mut navigated = false;
        loop {
            match navigations.try_recv() {
                Ok(event) => {
                    info!("[{}] Page navigated to {}", self.name(), event.url);
                    navigated = true;
                }
                Err(TryRecvError::Lagged(_)) => navigated = true,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        navigated
    }

    pub(super) async fn sync_navigation(&self, state: &mut BridgeState) {
        if self.navigated() {
            state.reset(self.page.as_ref()).await;
        }
    }
}
