//! Event pump: turns raw CDP events of a session into page notifications.

use agora_protocols::{ConsoleMessage, NavigationEvent};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, trace};

use crate::cdp::protocol::{CdpResponse, ConsoleApiCalled, FrameNavigated, RemoteObject};

/// A CDP event the page capability cares about.
#[derive(Debug, PartialEq, Eq)]
pub(super) enum PageEvent {
    Navigated(NavigationEvent),
    Console(ConsoleMessage),
}

/// Decode one event. Sub-frame navigations and unrelated methods yield `None`.
pub(super) fn decode_event(event: &CdpResponse) -> Option<PageEvent> {
    let params = event.params.clone()?;
    match event.method.as_deref()? {
        "Page.frameNavigated" => {
            let navigated: FrameNavigated = serde_json::from_value(params).ok()?;
            navigated.frame.is_main().then(|| {
                PageEvent::Navigated(NavigationEvent {
                    url: navigated.frame.url,
                })
            })
        }
        "Runtime.consoleAPICalled" => {
            let called: ConsoleApiCalled = serde_json::from_value(params).ok()?;
            let text = called
                .args
                .iter()
                .map(RemoteObject::display)
                .collect::<Vec<_>>()
                .join(" ");
            Some(PageEvent::Console(ConsoleMessage {
                level: called.call_type,
                text,
            }))
        }
        _ => None,
    }
}

/// Forward decoded events until the client drops the session's channel.
pub(super) async fn pump_events(
    mut events: mpsc::UnboundedReceiver<CdpResponse>,
    navigations: broadcast::Sender<NavigationEvent>,
    console: broadcast::Sender<ConsoleMessage>,
) {
    while let Some(event) = events.recv().await {
        match decode_event(&event) {
            Some(PageEvent::Navigated(nav)) => {
                debug!("Main frame navigated to {}", nav.url);
                // No subscribers is fine.
                let _ = navigations.send(nav);
            }
            Some(PageEvent::Console(msg)) => {
                let _ = console.send(msg);
            }
            None => trace!("Ignoring CDP event {:?}", event.method),
        }
    }
    debug!("Session event stream ended");
}
