//! [`Page`] over a CDP session.
//!
//! DOM access goes through `page_script.js`, evaluated in front of every
//! call. The script installs `window.__agora` once per document and keeps a
//! registry from handle id to element; [`DomNodeRef`] ids are registry keys.
//! A navigation replaces the document and with it the registry, so every
//! handle issued before it resolves to [`PageError::StaleNode`].

use agora_protocols::{
    ConsoleMessage, Control, DomNodeRef, KeyPress, NavigationEvent, NodeInfo, Page, PageError,
    TextNode,
};
use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::sync::broadcast;
use tracing::debug;

use crate::cdp::{KeyEvent, PageSession};

const HELPER_SCRIPT: &str = include_str!("page_script.js");

/// Outcome of one helper call, as returned by `window.__agora.call`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
enum HelperReply {
    Ok(Value),
    Stale(u64),
    Missing(String),
    Error(String),
}

fn decode_reply(reply: Value) -> Result<Value, PageError> {
    match serde_json::from_value::<HelperReply>(reply)? {
        HelperReply::Ok(value) => Ok(value),
        HelperReply::Stale(id) => Err(PageError::StaleNode(id)),
        HelperReply::Missing(what) => Err(PageError::NotFound(what)),
        HelperReply::Error(msg) => Err(PageError::Script(msg)),
    }
}

fn helper_expression(op: &str, args: &Value) -> String {
    format!("{}\nwindow.__agora.call({}, {})", HELPER_SCRIPT, json!(op), args)
}

/// CDP key event for a simulated press. Enter and unmodified printable
/// keys carry text so the page sees a real keystroke; everything else is a
/// raw key down.
fn key_event(press: &KeyPress) -> KeyEvent {
    let mods = press.modifiers;
    let text = if press.is_enter() {
        Some("\r".to_string())
    } else if press.key.chars().count() == 1 && !mods.ctrl && !mods.meta && !mods.alt {
        Some(press.key.clone())
    } else {
        None
    };
    KeyEvent {
        key: press.key.clone(),
        code: press.code.clone(),
        key_code: press.key_code,
        modifiers: mods.bits(),
        text,
        commands: press.commands.clone(),
    }
}

#[derive(Debug, Deserialize)]
struct Point {
    x: f64,
    y: f64,
}

/// A live Chrome tab as a [`Page`].
pub struct CdpPage {
    session: PageSession,
}

impl CdpPage {
    pub fn new(session: PageSession) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &PageSession {
        &self.session
    }

    /// Navigate the tab and wait for the new document.
    pub async fn open(&self, url: &str) -> Result<(), PageError> {
        self.session.navigate(url).await?;
        Ok(())
    }

    /// Registry entries the page still holds, for leak diagnostics.
    pub async fn live_handles(&self) -> Result<usize, PageError> {
        self.invoke_as("liveHandles", json!([])).await
    }

    async fn invoke(&self, op: &str, args: Value) -> Result<Value, PageError> {
        let reply = self.session.evaluate(&helper_expression(op, &args)).await?;
        decode_reply(reply)
    }

    async fn invoke_as<T: DeserializeOwned>(&self, op: &str, args: Value) -> Result<T, PageError> {
        let value = self.invoke(op, args).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn invoke_node(&self, op: &str, args: Value) -> Result<DomNodeRef, PageError> {
        let id: u64 = self.invoke_as(op, args).await?;
        Ok(DomNodeRef::from_raw(id))
    }

    async fn invoke_nodes(&self, op: &str, args: Value) -> Result<Vec<DomNodeRef>, PageError> {
        let ids: Vec<u64> = self.invoke_as(op, args).await?;
        Ok(ids.into_iter().map(DomNodeRef::from_raw).collect())
    }
}

#[async_trait]
impl Page for CdpPage {
    async fn body(&self) -> Result<DomNodeRef, PageError> {
        self.invoke_node("body", json!([])).await
    }

    async fn parent(&self, node: &DomNodeRef) -> Result<Option<DomNodeRef>, PageError> {
        let id: Option<u64> = self.invoke_as("parent", json!([node.id()])).await?;
        Ok(id.map(DomNodeRef::from_raw))
    }

    async fn children(&self, node: &DomNodeRef) -> Result<Vec<DomNodeRef>, PageError> {
        self.invoke_nodes("children", json!([node.id()])).await
    }

    async fn index_in_parent(&self, node: &DomNodeRef) -> Result<Option<usize>, PageError> {
        self.invoke_as("indexInParent", json!([node.id()])).await
    }

    async fn describe(&self, node: &DomNodeRef) -> Result<NodeInfo, PageError> {
        self.invoke_as("describe", json!([node.id()])).await
    }

    async fn snapshot(&self, node: &DomNodeRef) -> Result<TextNode, PageError> {
        self.invoke_as("snapshot", json!([node.id()])).await
    }

    async fn is_attached(&self, node: &DomNodeRef) -> Result<bool, PageError> {
        self.invoke_as("isAttached", json!([node.id()])).await
    }

    async fn duplicate(&self, node: &DomNodeRef) -> Result<DomNodeRef, PageError> {
        self.invoke_node("duplicate", json!([node.id()])).await
    }

    async fn release(&self, node: DomNodeRef) -> Result<(), PageError> {
        match self.invoke("release", json!([node.id()])).await {
            Ok(_) => Ok(()),
            Err(PageError::Closed) => Err(PageError::Closed),
            // A torn-down document took the registry entry with it.
            Err(e) => {
                debug!("Release of node {} skipped: {}", node.id(), e);
                Ok(())
            }
        }
    }

    async fn mark_children_seen(&self, node: &DomNodeRef) -> Result<usize, PageError> {
        self.invoke_as("markSeen", json!([node.id()])).await
    }

    async fn scroll_to_end(&self, node: &DomNodeRef) -> Result<(), PageError> {
        self.invoke("scrollToEnd", json!([node.id()])).await?;
        Ok(())
    }

    async fn controls(&self) -> Result<Vec<Control>, PageError> {
        self.invoke_as("controls", json!([])).await
    }

    async fn click_control(&self, index: usize) -> Result<(), PageError> {
        let point: Point = self.invoke_as("controlPoint", json!([index])).await?;
        self.session.click(point.x, point.y).await?;
        Ok(())
    }

    async fn editable_candidates(&self) -> Result<Vec<DomNodeRef>, PageError> {
        self.invoke_nodes("editables", json!([])).await
    }

    async fn focus(&self, node: &DomNodeRef) -> Result<(), PageError> {
        self.invoke("focus", json!([node.id()])).await?;
        Ok(())
    }

    async fn input_text(&self, node: &DomNodeRef) -> Result<String, PageError> {
        self.invoke_as("inputText", json!([node.id()])).await
    }

    async fn insert_text(&self, text: &str) -> Result<(), PageError> {
        self.session.type_text(text).await?;
        Ok(())
    }

    async fn press_key(&self, key: KeyPress) -> Result<(), PageError> {
        self.session.dispatch_key(&key_event(&key)).await?;
        Ok(())
    }

    fn navigations(&self) -> broadcast::Receiver<NavigationEvent> {
        self.session.navigations()
    }

    fn console_messages(&self) -> broadcast::Receiver<ConsoleMessage> {
        self.session.console_messages()
    }
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
