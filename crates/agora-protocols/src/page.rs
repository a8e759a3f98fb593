//! The page capability.
//!
//! Everything the bridge engine knows about a browser tab goes through
//! [`Page`]. Implementations exist for a live Chrome tab (over CDP) and for an
//! in-memory DOM used in tests.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::dom::{ConsoleMessage, Control, KeyPress, NavigationEvent, NodeInfo, TextNode};
use crate::error::PageError;

/// Handle to a DOM node living inside a page.
///
/// Handles are issued by a [`Page`] and reference browser-side state. They
/// cannot be cloned; the owner ends a handle's life with [`Page::release`].
/// After a navigation every outstanding handle is stale and every operation
/// on it fails with [`PageError::StaleNode`].
#[must_use = "DOM handles hold browser-side references and must be released"]
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct DomNodeRef {
    id: u64,
}

impl DomNodeRef {
    /// Wrap a page-issued handle id. Only page implementations call this.
    pub fn from_raw(id: u64) -> Self {
        Self { id }
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Abstract interface over a live browser tab.
#[async_trait]
pub trait Page: Send + Sync {
    /// Handle to `<body>`.
    async fn body(&self) -> Result<DomNodeRef, PageError>;

    /// Parent element, or `None` at the document root.
    async fn parent(&self, node: &DomNodeRef) -> Result<Option<DomNodeRef>, PageError>;

    /// Element children in document order.
    async fn children(&self, node: &DomNodeRef) -> Result<Vec<DomNodeRef>, PageError>;

    /// Position of the node among its parent's element children.
    async fn index_in_parent(&self, node: &DomNodeRef) -> Result<Option<usize>, PageError>;

    async fn describe(&self, node: &DomNodeRef) -> Result<NodeInfo, PageError>;

    /// Structural text snapshot of the subtree rooted at `node`.
    async fn snapshot(&self, node: &DomNodeRef) -> Result<TextNode, PageError>;

    /// Whether the node is still part of the live document.
    async fn is_attached(&self, node: &DomNodeRef) -> Result<bool, PageError>;

    /// A second, independently released handle to the same node.
    async fn duplicate(&self, node: &DomNodeRef) -> Result<DomNodeRef, PageError>;

    /// Drop the browser-side reference behind the handle. Releasing a handle
    /// that a navigation already invalidated succeeds.
    async fn release(&self, node: DomNodeRef) -> Result<(), PageError>;

    /// Tag every current child with the seen marker. Returns how many
    /// children were not marked before.
    async fn mark_children_seen(&self, node: &DomNodeRef) -> Result<usize, PageError>;

    /// Scroll the node's content to its end.
    async fn scroll_to_end(&self, node: &DomNodeRef) -> Result<(), PageError>;

    /// Currently visible interactive controls.
    async fn controls(&self) -> Result<Vec<Control>, PageError>;

    async fn click_control(&self, index: usize) -> Result<(), PageError>;

    /// Visible editable regions (textarea, text input, contenteditable).
    async fn editable_candidates(&self) -> Result<Vec<DomNodeRef>, PageError>;

    async fn focus(&self, node: &DomNodeRef) -> Result<(), PageError>;

    /// Logical text of an editable region, lines joined with `\n`.
    async fn input_text(&self, node: &DomNodeRef) -> Result<String, PageError>;

    /// Insert text at the caret of the focused element.
    async fn insert_text(&self, text: &str) -> Result<(), PageError>;

    async fn press_key(&self, key: KeyPress) -> Result<(), PageError>;

    /// Main-frame navigation notifications.
    fn navigations(&self) -> broadcast::Receiver<NavigationEvent>;

    /// Console output of the page.
    fn console_messages(&self) -> broadcast::Receiver<ConsoleMessage>;
}

/// Release every handle, keeping the first error.
pub async fn release_all<I>(page: &dyn Page, nodes: I) -> Result<(), PageError>
where
    I: IntoIterator<Item = DomNodeRef> + Send,
    I::IntoIter: Send,
{
    let mut first_err = None;
    for node in nodes {
        if let Err(e) = page.release(node).await {
            first_err.get_or_insert(e);
        }
    }
    match first_err {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
