//! In-memory [`Page`] for tests.
//!
//! [`FakePage`] models just enough of a chat site's DOM to drive the engine:
//! an element tree with boxes and overflow styles, editable regions with a
//! caret at the end, seen markers, visible controls and navigations. Tests
//! script a site by mutating the tree from spawned tasks while the bridge
//! polls it.

use std::collections::HashMap;
use std::sync::Arc;

use agora_protocols::{
    BoundingBox, ConsoleMessage, Control, DomNodeRef, KeyPress, NavigationEvent, NodeInfo, Page,
    PageError, TextChild, TextNode,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, broadcast, mpsc};

use crate::extractor::TextBuffer;

/// Index of an element inside a [`FakePage`].
pub type FakeId = usize;

/// Element template for [`FakePage::add_element`].
#[derive(Debug, Clone)]
pub struct FakeElement {
    tag: String,
    rect: BoundingBox,
    overflow_y: String,
    block: bool,
    editable: bool,
    display_none: bool,
}

impl FakeElement {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            rect: BoundingBox::sized(600.0, 40.0),
            overflow_y: "visible".to_string(),
            block: true,
            editable: false,
            display_none: false,
        }
    }

    pub fn div() -> Self {
        Self::new("div")
    }

    /// Inline element; its text joins the surrounding line.
    pub fn span() -> Self {
        Self::new("span").inline()
    }

    /// Scrollable message list.
    pub fn scroll_list() -> Self {
        Self::div().with_rect(800.0, 700.0).with_overflow("auto")
    }

    /// Chat input box.
    pub fn textarea() -> Self {
        Self {
            editable: true,
            ..Self::new("textarea").with_rect(700.0, 60.0)
        }
    }

    pub fn with_rect(mut self, width: f64, height: f64) -> Self {
        self.rect = BoundingBox::sized(width, height);
        self
    }

    pub fn with_overflow(mut self, overflow_y: &str) -> Self {
        self.overflow_y = overflow_y.to_string();
        self
    }

    pub fn inline(mut self) -> Self {
        self.block = false;
        self
    }

    /// `display: none`; absent from rendered text and snapshots.
    pub fn display_none(mut self) -> Self {
        self.display_none = true;
        self.rect = BoundingBox::default();
        self
    }
}

#[derive(Debug, Clone)]
enum Content {
    Text(String),
    Node(FakeId),
}

#[derive(Debug, Clone)]
struct FakeNode {
    spec: FakeElement,
    parent: Option<FakeId>,
    content: Vec<Content>,
    seen: bool,
    attached: bool,
    value: String,
}

#[derive(Debug, Clone)]
struct FakeControl {
    label: String,
    text: String,
    visible: bool,
    submits: bool,
}

#[derive(Debug, Default)]
struct FakeDom {
    nodes: Vec<FakeNode>,
    refs: HashMap<u64, FakeId>,
    next_ref: u64,
    controls: Vec<FakeControl>,
    focused: Option<FakeId>,
    selected_all: bool,
    scrolls: usize,
    submissions: Vec<String>,
    input_reads: Vec<String>,
}

impl FakeDom {
    fn issue(&mut self, id: FakeId) -> DomNodeRef {
        self.next_ref += 1;
        self.refs.insert(self.next_ref, id);
        DomNodeRef::from_raw(self.next_ref)
    }

    /// A handle resolves only while its element is in the document.
    fn resolve(&self, node: &DomNodeRef) -> Result<FakeId, PageError> {
        match self.refs.get(&node.id()) {
            Some(&id) if self.nodes[id].attached => Ok(id),
            _ => Err(PageError::StaleNode(node.id())),
        }
    }

    fn rendered(&self, id: FakeId) -> bool {
        let node = &self.nodes[id];
        node.attached && !node.spec.display_none
    }

    fn element_children(&self, id: FakeId) -> Vec<FakeId> {
        self.nodes[id]
            .content
            .iter()
            .filter_map(|c| match c {
                Content::Node(child) if self.nodes[*child].attached => Some(*child),
                _ => None,
            })
            .collect()
    }

    fn inner_text(&self, id: FakeId) -> String {
        let node = &self.nodes[id];
        if node.spec.editable {
            return node.value.clone();
        }
        let mut buf = TextBuffer::default();
        for content in &node.content {
            match content {
                Content::Text(text) => buf.push_inline(text),
                Content::Node(child) if self.rendered(*child) => {
                    let text = self.inner_text(*child);
                    if self.nodes[*child].spec.block {
                        buf.push_block(&text);
                    } else {
                        buf.push_inline(&text);
                    }
                }
                Content::Node(_) => {}
            }
        }
        buf.finish()
    }

    fn snapshot(&self, id: FakeId) -> TextNode {
        let node = &self.nodes[id];
        let children = node
            .content
            .iter()
            .filter_map(|c| match c {
                Content::Text(text) => Some(TextChild::Text { text: text.clone() }),
                Content::Node(child) if self.rendered(*child) => {
                    Some(TextChild::Element(self.snapshot(*child)))
                }
                Content::Node(_) => None,
            })
            .collect();
        TextNode {
            tag: node.spec.tag.clone(),
            rect: node.spec.rect,
            rendered_text: self.inner_text(id),
            block: node.spec.block,
            children,
        }
    }

    fn detach(&mut self, id: FakeId) {
        self.nodes[id].attached = false;
        for child in self.element_children(id) {
            self.detach(child);
        }
    }

    fn visible_controls(&self) -> Vec<usize> {
        self.controls
            .iter()
            .enumerate()
            .filter(|(_, c)| c.visible)
            .map(|(i, _)| i)
            .collect()
    }

    fn edit(&mut self, text: &str) {
        let Some(id) = self.focused else { return };
        let selected_all = std::mem::take(&mut self.selected_all);
        let node = &mut self.nodes[id];
        if selected_all {
            node.value.clear();
        }
        node.value.push_str(text);
    }

    /// Take the focused input's value as a submitted message.
    fn submit(&mut self) -> Option<String> {
        let id = self.focused?;
        let value = std::mem::take(&mut self.nodes[id].value);
        if value.trim().is_empty() {
            return None;
        }
        self.submissions.push(value.clone());
        Some(value)
    }
}

/// Scriptable in-memory page.
#[derive(Clone)]
pub struct FakePage {
    dom: Arc<Mutex<FakeDom>>,
    nav_tx: broadcast::Sender<NavigationEvent>,
    console_tx: broadcast::Sender<ConsoleMessage>,
    submit_tx: mpsc::UnboundedSender<String>,
    submit_rx: Arc<AsyncMutex<mpsc::UnboundedReceiver<String>>>,
}

impl Default for FakePage {
    fn default() -> Self {
        Self::new()
    }
}

impl FakePage {
    /// Empty document with a body.
    pub fn new() -> Self {
        let body = FakeNode {
            spec: FakeElement::new("body").with_rect(1200.0, 900.0),
            parent: None,
            content: Vec::new(),
            seen: false,
            attached: true,
            value: String::new(),
        };
        let dom = FakeDom {
            nodes: vec![body],
            ..Default::default()
        };
        let (nav_tx, _) = broadcast::channel(16);
        let (console_tx, _) = broadcast::channel(64);
        let (submit_tx, submit_rx) = mpsc::unbounded_channel();
        Self {
            dom: Arc::new(Mutex::new(dom)),
            nav_tx,
            console_tx,
            submit_tx,
            submit_rx: Arc::new(AsyncMutex::new(submit_rx)),
        }
    }

    pub fn body_id(&self) -> FakeId {
        0
    }

    /// Append an element as the last child of `parent`.
    pub fn add_element(&self, parent: FakeId, spec: FakeElement) -> FakeId {
        let mut dom = self.dom.lock();
        let id = dom.nodes.len();
        dom.nodes.push(FakeNode {
            spec,
            parent: Some(parent),
            content: Vec::new(),
            seen: false,
            attached: true,
            value: String::new(),
        });
        dom.nodes[parent].content.push(Content::Node(id));
        id
    }

    /// Append a text node to `parent`.
    pub fn add_text(&self, parent: FakeId, text: &str) {
        self.dom.lock().nodes[parent]
            .content
            .push(Content::Text(text.to_string()));
    }

    /// Replace all content of `node` with a single text node.
    pub fn set_text(&self, node: FakeId, text: &str) {
        let mut dom = self.dom.lock();
        for child in dom.element_children(node) {
            dom.detach(child);
        }
        dom.nodes[node].content = vec![Content::Text(text.to_string())];
    }

    /// Element child holding `text`, appended to `parent`.
    pub fn add_block(&self, parent: FakeId, text: &str) -> FakeId {
        let id = self.add_element(parent, FakeElement::div());
        self.add_text(id, text);
        id
    }

    /// Issue a handle to `node`, as a traversal reaching it would.
    pub fn handle(&self, node: FakeId) -> DomNodeRef {
        self.dom.lock().issue(node)
    }

    /// Detach `node` and its subtree from the document.
    pub fn remove(&self, node: FakeId) {
        self.dom.lock().detach(node);
    }

    pub fn set_rect(&self, node: FakeId, width: f64, height: f64) {
        self.dom.lock().nodes[node].spec.rect = BoundingBox::sized(width, height);
    }

    /// Add a visible control. Returns its id for [`FakePage::set_control_visible`].
    pub fn add_control(&self, label: &str, text: &str) -> usize {
        let mut dom = self.dom.lock();
        dom.controls.push(FakeControl {
            label: label.to_string(),
            text: text.to_string(),
            visible: true,
            submits: false,
        });
        dom.controls.len() - 1
    }

    /// Add a visible control that submits the focused input when clicked.
    pub fn add_submit_button(&self, label: &str) -> usize {
        let id = self.add_control(label, "");
        self.dom.lock().controls[id].submits = true;
        id
    }

    pub fn set_control_visible(&self, control: usize, visible: bool) {
        self.dom.lock().controls[control].visible = visible;
    }

    /// Simulate a main-frame navigation: every issued handle becomes stale.
    pub fn navigate(&self, url: &str) {
        {
            let mut dom = self.dom.lock();
            dom.refs.clear();
            dom.focused = None;
        }
        let _ = self.nav_tx.send(NavigationEvent {
            url: url.to_string(),
        });
    }

    pub fn log_console(&self, level: &str, text: &str) {
        let _ = self.console_tx.send(ConsoleMessage {
            level: level.to_string(),
            text: text.to_string(),
        });
    }

    /// Number of handles issued and not yet released.
    pub fn live_handles(&self) -> usize {
        self.dom.lock().refs.len()
    }

    pub fn scroll_count(&self) -> usize {
        self.dom.lock().scrolls
    }

    pub fn input_value(&self, node: FakeId) -> String {
        self.dom.lock().nodes[node].value.clone()
    }

    pub fn is_seen(&self, node: FakeId) -> bool {
        self.dom.lock().nodes[node].seen
    }

    /// Every value returned by [`Page::input_text`], in order.
    pub fn input_reads(&self) -> Vec<String> {
        self.dom.lock().input_reads.clone()
    }

    pub fn submissions(&self) -> Vec<String> {
        self.dom.lock().submissions.clone()
    }

    /// Wait for the next submitted message.
    pub async fn next_submission(&self) -> Option<String> {
        self.submit_rx.lock().await.recv().await
    }

    fn with_node<T>(
        &self,
        node: &DomNodeRef,
        f: impl FnOnce(&mut FakeDom, FakeId) -> T,
    ) -> Result<T, PageError> {
        let mut dom = self.dom.lock();
        let id = dom.resolve(node)?;
        Ok(f(&mut dom, id))
    }

    fn submit(&self, dom: &mut FakeDom) {
        if let Some(message) = dom.submit() {
            let _ = self.submit_tx.send(message);
        }
    }
}

#[async_trait]
impl Page for FakePage {
    async fn body(&self) -> Result<DomNodeRef, PageError> {
        Ok(self.dom.lock().issue(0))
    }

    async fn parent(&self, node: &DomNodeRef) -> Result<Option<DomNodeRef>, PageError> {
        self.with_node(node, |dom, id| {
            let parent = dom.nodes[id].parent?;
            dom.nodes[parent].attached.then(|| dom.issue(parent))
        })
    }

    async fn children(&self, node: &DomNodeRef) -> Result<Vec<DomNodeRef>, PageError> {
        self.with_node(node, |dom, id| {
            dom.element_children(id)
                .into_iter()
                .map(|child| dom.issue(child))
                .collect()
        })
    }

    async fn index_in_parent(&self, node: &DomNodeRef) -> Result<Option<usize>, PageError> {
        self.with_node(node, |dom, id| {
            let parent = dom.nodes[id].parent?;
            dom.element_children(parent).iter().position(|c| *c == id)
        })
    }

    async fn describe(&self, node: &DomNodeRef) -> Result<NodeInfo, PageError> {
        self.with_node(node, |dom, id| {
            let n = &dom.nodes[id];
            NodeInfo {
                tag: n.spec.tag.clone(),
                inner_text: dom.inner_text(id),
                rect: n.spec.rect,
                overflow_y: n.spec.overflow_y.clone(),
                editable: n.spec.editable,
                seen: n.seen,
            }
        })
    }

    async fn snapshot(&self, node: &DomNodeRef) -> Result<TextNode, PageError> {
        self.with_node(node, |dom, id| dom.snapshot(id))
    }

    async fn is_attached(&self, node: &DomNodeRef) -> Result<bool, PageError> {
        let dom = self.dom.lock();
        Ok(dom
            .refs
            .get(&node.id())
            .is_some_and(|id| dom.nodes[*id].attached))
    }

    async fn duplicate(&self, node: &DomNodeRef) -> Result<DomNodeRef, PageError> {
        self.with_node(node, |dom, id| dom.issue(id))
    }

    async fn release(&self, node: DomNodeRef) -> Result<(), PageError> {
        self.dom.lock().refs.remove(&node.id());
        Ok(())
    }

    async fn mark_children_seen(&self, node: &DomNodeRef) -> Result<usize, PageError> {
        self.with_node(node, |dom, id| {
            let mut marked = 0;
            for child in dom.element_children(id) {
                if !dom.nodes[child].seen {
                    dom.nodes[child].seen = true;
                    marked += 1;
                }
            }
            marked
        })
    }

    async fn scroll_to_end(&self, node: &DomNodeRef) -> Result<(), PageError> {
        self.with_node(node, |dom, _| dom.scrolls += 1)
    }

    async fn controls(&self) -> Result<Vec<Control>, PageError> {
        let dom = self.dom.lock();
        Ok(dom
            .visible_controls()
            .into_iter()
            .enumerate()
            .map(|(index, i)| Control {
                index,
                label: dom.controls[i].label.clone(),
                text: dom.controls[i].text.clone(),
            })
            .collect())
    }

    async fn click_control(&self, index: usize) -> Result<(), PageError> {
        let mut dom = self.dom.lock();
        let visible = dom.visible_controls();
        let i = *visible
            .get(index)
            .ok_or_else(|| PageError::NotFound(format!("control {}", index)))?;
        if dom.controls[i].submits {
            self.submit(&mut dom);
        }
        Ok(())
    }

    async fn editable_candidates(&self) -> Result<Vec<DomNodeRef>, PageError> {
        let mut dom = self.dom.lock();
        let ids: Vec<FakeId> = (0..dom.nodes.len())
            .filter(|id| {
                let n = &dom.nodes[*id];
                n.attached && n.spec.editable && n.spec.rect.has_area()
            })
            .collect();
        Ok(ids.into_iter().map(|id| dom.issue(id)).collect())
    }

    async fn focus(&self, node: &DomNodeRef) -> Result<(), PageError> {
        self.with_node(node, |dom, id| {
            dom.focused = Some(id);
            dom.selected_all = false;
        })
    }

    async fn input_text(&self, node: &DomNodeRef) -> Result<String, PageError> {
        self.with_node(node, |dom, id| {
            let value = dom.nodes[id].value.clone();
            dom.input_reads.push(value.clone());
            value
        })
    }

    async fn insert_text(&self, text: &str) -> Result<(), PageError> {
        self.dom.lock().edit(text);
        Ok(())
    }

    async fn press_key(&self, key: KeyPress) -> Result<(), PageError> {
        let mut dom = self.dom.lock();
        let primary = key.modifiers.ctrl || key.modifiers.meta;
        if key.commands.iter().any(|c| c == "selectAll") || (primary && key.key == "a") {
            dom.selected_all = true;
        } else if key.key == "Backspace" {
            if let Some(id) = dom.focused {
                if std::mem::take(&mut dom.selected_all) {
                    dom.nodes[id].value.clear();
                } else {
                    dom.nodes[id].value.pop();
                }
            }
        } else if key.is_enter() && key.modifiers.shift {
            dom.edit("\n");
        } else if key.is_enter() {
            self.submit(&mut dom);
        }
        Ok(())
    }

    fn navigations(&self) -> broadcast::Receiver<NavigationEvent> {
        self.nav_tx.subscribe()
    }

    fn console_messages(&self) -> broadcast::Receiver<ConsoleMessage> {
        self.console_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_inner_text_separates_blocks() {
        let page = FakePage::new();
        let list = page.add_element(page.body_id(), FakeElement::scroll_list());
        page.add_block(list, "first");
        let para = page.add_element(list, FakeElement::div());
        page.add_text(para, "second ");
        let bold = page.add_element(para, FakeElement::span());
        page.add_text(bold, "bold");

        let body = page.body().await.unwrap();
        let info = page.describe(&body).await.unwrap();
        assert_eq!(info.inner_text, "first\nsecond bold");
        page.release(body).await.unwrap();
        assert_eq!(page.live_handles(), 0);
    }

    #[tokio::test]
    async fn test_navigation_makes_handles_stale() {
        let page = FakePage::new();
        let body = page.body().await.unwrap();
        page.navigate("https://example.com/");
        let err = page.describe(&body).await.unwrap_err();
        assert!(err.is_stale());
        page.release(body).await.unwrap();
    }

    #[tokio::test]
    async fn test_enter_submits_and_shift_enter_breaks_line() {
        let page = FakePage::new();
        let input = page.add_element(page.body_id(), FakeElement::textarea());
        let handle = page.editable_candidates().await.unwrap().pop().unwrap();
        page.focus(&handle).await.unwrap();
        page.insert_text("a").await.unwrap();
        page.press_key(KeyPress::soft_newline()).await.unwrap();
        page.insert_text("b").await.unwrap();
        assert_eq!(page.input_value(input), "a\nb");

        page.press_key(KeyPress::enter()).await.unwrap();
        assert_eq!(page.next_submission().await.as_deref(), Some("a\nb"));
        assert_eq!(page.input_value(input), "");
        page.release(handle).await.unwrap();
    }

    #[tokio::test]
    async fn test_select_all_then_backspace_clears() {
        let page = FakePage::new();
        let input = page.add_element(page.body_id(), FakeElement::textarea());
        let handle = page.editable_candidates().await.unwrap().pop().unwrap();
        page.focus(&handle).await.unwrap();
        page.insert_text("stale draft").await.unwrap();
        page.press_key(KeyPress::select_all()).await.unwrap();
        page.press_key(KeyPress::backspace()).await.unwrap();
        assert_eq!(page.input_value(input), "");
        page.release(handle).await.unwrap();
    }

    #[tokio::test]
    async fn test_mark_children_seen_counts_new_children() {
        let page = FakePage::new();
        let list = page.add_element(page.body_id(), FakeElement::scroll_list());
        page.add_block(list, "a");
        let body = page.body().await.unwrap();
        let handle = page.children(&body).await.unwrap().pop().unwrap();
        assert_eq!(page.mark_children_seen(&handle).await.unwrap(), 1);
        page.add_block(list, "b");
        assert_eq!(page.mark_children_seen(&handle).await.unwrap(), 1);
        assert_eq!(page.mark_children_seen(&handle).await.unwrap(), 0);
        release_all(&page, [body, handle]).await;
    }

    async fn release_all(page: &FakePage, nodes: impl IntoIterator<Item = DomNodeRef>) {
        for node in nodes {
            page.release(node).await.unwrap();
        }
    }
}
