//! Core session struct and CDP command dispatch.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use agora_protocols::{ConsoleMessage, NavigationEvent};
use futures::SinkExt;
use serde_json::Value;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, trace};

use crate::cdp::client::{CALL_TIMEOUT_SECS, Pending, PendingRequest, WsSink};
use crate::cdp::error::CdpError;
use crate::cdp::protocol::{CdpRequest, CdpResponse};

use super::events::pump_events;

/// Buffered notifications per subscriber before it starts lagging.
const EVENT_CAPACITY: usize = 64;

/// A session attached to a single page/target.
pub struct PageSession {
    pub(super) target_id: String,
    pub(super) session_id: String,
    /// WebSocket sender (shared with client).
    pub(super) ws_tx: Arc<tokio::sync::Mutex<WsSink>>,
    /// Pending requests (shared with client).
    pub(super) pending: Pending,
    /// Request ID counter (shared with client).
    pub(super) request_id: Arc<AtomicU64>,
    navigations: broadcast::Sender<NavigationEvent>,
    console: broadcast::Sender<ConsoleMessage>,
    event_task: JoinHandle<()>,
}

impl PageSession {
    /// Create a session and start pumping its events.
    pub(crate) fn new(
        target_id: String,
        session_id: String,
        ws_tx: Arc<tokio::sync::Mutex<WsSink>>,
        pending: Pending,
        request_id: Arc<AtomicU64>,
        event_rx: mpsc::UnboundedReceiver<CdpResponse>,
    ) -> Self {
        let (navigations, _) = broadcast::channel(EVENT_CAPACITY);
        let (console, _) = broadcast::channel(EVENT_CAPACITY);
        let event_task = tokio::spawn(pump_events(
            event_rx,
            navigations.clone(),
            console.clone(),
        ));
        Self {
            target_id,
            session_id,
            ws_tx,
            pending,
            request_id,
            navigations,
            console,
            event_task,
        }
    }

    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Main-frame navigations of this tab.
    pub fn navigations(&self) -> broadcast::Receiver<NavigationEvent> {
        self.navigations.subscribe()
    }

    /// Console output of this tab.
    pub fn console_messages(&self) -> broadcast::Receiver<ConsoleMessage> {
        self.console.subscribe()
    }

    /// Send a CDP command to this page session.
    pub async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, CdpError> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);

        let request = CdpRequest {
            id,
            method: method.to_string(),
            params,
            session_id: Some(self.session_id.clone()),
        };

        let json = serde_json::to_string(&request)?;
        trace!("CDP session send: {}", json);

        let (tx, rx) = tokio::sync::oneshot::channel();
        self.pending.lock().insert(id, PendingRequest { tx });

        {
            let mut ws = self.ws_tx.lock().await;
            ws.send(Message::Text(json.into())).await?;
        }

        match tokio::time::timeout(std::time::Duration::from_secs(CALL_TIMEOUT_SECS), rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(CdpError::SessionClosed),
            Err(_) => {
                self.pending.lock().remove(&id);
                Err(CdpError::Timeout(format!("Request {} timed out", method)))
            }
        }
    }

    /// Enable the domains whose events the session pumps.
    pub(crate) async fn enable_domains(&self) -> Result<(), CdpError> {
        self.call("Page.enable", None).await?;
        self.call("Runtime.enable", None).await?;

        debug!("Enabled CDP domains for session {}", self.session_id);
        Ok(())
    }
}

impl Drop for PageSession {
    fn drop(&mut self) {
        self.event_task.abort();
    }
}
