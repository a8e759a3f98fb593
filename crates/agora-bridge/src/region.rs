//! The part of the page a reply is read from.

use agora_protocols::{DomNodeRef, Page, PageError, release_all};
use tracing::debug;

use crate::extractor::{TextBuffer, visible_text};
use crate::probe::contains_probe;

/// Which part of the container holds the reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// The whole container is the reply wrapper.
    Whole,
    /// Every child except the one at this index, which holds the echoed
    /// user message.
    ExcludeBranch(usize),
    /// Children without the seen marker that do not contain the probe.
    UnseenChildren,
    /// Everything after the echo: children following the one at this index,
    /// plus whatever that child holds after its own echo.
    AfterEcho(usize),
}

/// Container plus scope for one round.
#[derive(Debug)]
pub struct Region {
    container: DomNodeRef,
    scope: Scope,
    probe: String,
}

impl Region {
    pub fn new(container: DomNodeRef, scope: Scope, probe: impl Into<String>) -> Self {
        Self {
            container,
            scope,
            probe: probe.into(),
        }
    }

    pub fn container(&self) -> &DomNodeRef {
        &self.container
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Give up the scope, keeping only the container handle.
    pub fn into_container(self) -> DomNodeRef {
        self.container
    }

    /// Current visible text of the region.
    pub async fn extract(&self, page: &dyn Page) -> Result<String, PageError> {
        if self.scope == Scope::Whole {
            let snapshot = page.snapshot(&self.container).await?;
            return Ok(visible_text(&snapshot));
        }

        let children = page.children(&self.container).await?;
        let result = self.extract_children(page, &children).await;
        release_all(page, children).await?;
        result
    }

    async fn extract_children(
        &self,
        page: &dyn Page,
        children: &[DomNodeRef],
    ) -> Result<String, PageError> {
        let mut buf = TextBuffer::default();
        for (index, child) in children.iter().enumerate() {
            match self.scope {
                Scope::ExcludeBranch(branch) if index == branch => continue,
                Scope::AfterEcho(branch) if index < branch => continue,
                Scope::AfterEcho(branch) if index == branch => {
                    let grandchildren = page.children(child).await?;
                    let text = self.after_echo(page, &grandchildren).await;
                    release_all(page, grandchildren).await?;
                    let text = text?;
                    if !text.is_empty() {
                        buf.push_block(&text);
                    }
                    continue;
                }
                Scope::UnseenChildren => {
                    let info = page.describe(child).await?;
                    if info.seen || contains_probe(&info.inner_text, &self.probe) {
                        continue;
                    }
                }
                _ => {}
            }
            let snapshot = page.snapshot(child).await?;
            let text = visible_text(&snapshot);
            if !text.is_empty() {
                buf.push_block(&text);
            }
        }
        Ok(buf.finish())
    }

    /// Text of the nodes that follow the first one holding the probe.
    async fn after_echo(&self, page: &dyn Page, nodes: &[DomNodeRef]) -> Result<String, PageError> {
        let mut buf = TextBuffer::default();
        let mut echo_seen = false;
        for node in nodes {
            if !echo_seen {
                let info = page.describe(node).await?;
                echo_seen = contains_probe(&info.inner_text, &self.probe);
                continue;
            }
            let text = visible_text(&page.snapshot(node).await?);
            if !text.is_empty() {
                buf.push_block(&text);
            }
        }
        Ok(buf.finish())
    }

    pub async fn release(self, page: &dyn Page) -> Result<(), PageError> {
        page.release(self.container).await
    }
}

/// Release a handle whose release failure is not actionable.
pub(crate) async fn discard(page: &dyn Page, node: DomNodeRef) {
    if let Err(e) = page.release(node).await {
        debug!("Failed to release node handle: {}", e);
    }
}

pub(crate) async fn discard_all(page: &dyn Page, nodes: Vec<DomNodeRef>) {
    if let Err(e) = release_all(page, nodes).await {
        debug!("Failed to release node handles: {}", e);
    }
}
