//! Container discovery.
//!
//! Finds the DOM region holding the reply to a just-submitted message, with
//! no site-specific selectors. The first round anchors on the echoed user
//! message (the probe) and watches its ancestors for a growing sibling.
//! Later rounds rely on seen markers: every child present before submit was
//! marked, so the reply is whatever unmarked child shows up.

use std::time::Duration;

use agora_config::TimingsConfig;
use agora_protocols::{DomNodeRef, Page, PageError, release_all};
use tracing::debug;

use crate::probe::contains_probe;
use crate::region::{Region, Scope, discard, discard_all};

/// Ancestor chain of the probe anchor, with per-level sibling baselines.
struct Chain {
    /// Anchor first, then each ancestor up to the scroll container or body.
    nodes: Vec<DomNodeRef>,
    levels: Vec<Level>,
}

/// A (branch, parent) pair, parent being `nodes[branch + 1]`.
struct Level {
    branch: usize,
    /// Text length of every sibling of the branch, in order.
    baseline: Vec<usize>,
}

pub struct Discovery<'a> {
    page: &'a dyn Page,
    probe: &'a str,
    attempts: u32,
    interval: Duration,
    growth_threshold: usize,
}

impl<'a> Discovery<'a> {
    pub fn new(page: &'a dyn Page, probe: &'a str, timings: &TimingsConfig) -> Self {
        Self {
            page,
            probe,
            attempts: timings.discovery_attempts,
            interval: timings.discovery_interval(),
            growth_threshold: timings.growth_threshold,
        }
    }

    /// Probe-anchored discovery. The region is the parent of the innermost
    /// ancestor level whose siblings signal a reply, minus the branch that
    /// holds the echo.
    pub async fn by_probe(&self) -> Option<Region> {
        let mut chain: Option<Chain> = None;
        for attempt in 1..=self.attempts {
            if attempt > 1 {
                tokio::time::sleep(self.interval).await;
            }

            let Some(current) = chain.as_ref() else {
                chain = self.try_anchor(attempt).await;
                continue;
            };

            match self.check_levels(current).await {
                Ok(Some((level, branch_index))) => {
                    let Some(built) = chain.take() else { break };
                    return Some(self.into_region(built, level, branch_index).await);
                }
                Ok(None) => {}
                Err(e) => {
                    debug!("Anchor chain invalidated, re-anchoring: {}", e);
                    if let Some(stale) = chain.take() {
                        discard_all(self.page, stale.nodes).await;
                    }
                }
            }
        }

        if let Some(chain) = chain {
            discard_all(self.page, chain.nodes).await;
        }
        None
    }

    async fn try_anchor(&self, attempt: u32) -> Option<Chain> {
        match self.anchor_chain().await {
            Ok(Some(built)) => {
                debug!(
                    "Probe anchored with {} ancestor levels (attempt {})",
                    built.levels.len(),
                    attempt
                );
                Some(built)
            }
            Ok(None) => {
                debug!("Probe not rendered yet (attempt {})", attempt);
                None
            }
            Err(e) => {
                debug!("Anchoring probe failed: {}", e);
                None
            }
        }
    }

    /// Marker-based discovery. Checks, in order: a new wrapper under
    /// `scroll_root`; a new echo wrapper that gained a reply child; a new
    /// child of the `previous` container.
    pub async fn by_marker(
        &self,
        scroll_root: &DomNodeRef,
        previous: Option<&DomNodeRef>,
    ) -> Option<Region> {
        for attempt in 1..=self.attempts {
            if attempt > 1 {
                tokio::time::sleep(self.interval).await;
            }
            match self.marker_pass(scroll_root, previous).await {
                Ok(Some(region)) => {
                    debug!("Marker discovery found {:?} (attempt {})", region.scope(), attempt);
                    return Some(region);
                }
                Ok(None) => {}
                Err(e) if e.is_stale() => {
                    debug!("Scroll container went stale during discovery: {}", e);
                    return None;
                }
                Err(e) => debug!("Marker discovery pass failed: {}", e),
            }
        }
        None
    }

    /// Echo-anchored discovery, for a conversation re-rendered mid-reply.
    /// Seen markers and growth baselines are gone with the old nodes, so the
    /// reply is taken to be everything after the latest echo under its
    /// scroll container.
    pub async fn after_echo(&self) -> Option<Region> {
        for attempt in 1..=self.attempts {
            if attempt > 1 {
                tokio::time::sleep(self.interval).await;
            }
            match self.echo_branch().await {
                Ok(Some(region)) => {
                    debug!("Echo relocated at branch {:?} (attempt {})", region.scope(), attempt);
                    return Some(region);
                }
                Ok(None) => debug!("Echo not rendered yet (attempt {})", attempt),
                Err(e) => debug!("Echo relocation failed: {}", e),
            }
        }
        None
    }

    /// Walk up from the echo to the child of the scroll container (or body)
    /// holding it.
    async fn echo_branch(&self) -> Result<Option<Region>, PageError> {
        let Some(mut branch) = self.find_anchor().await? else {
            return Ok(None);
        };
        loop {
            let parent = match self.page.parent(&branch).await {
                Ok(Some(parent)) => parent,
                Ok(None) => {
                    discard(self.page, branch).await;
                    return Ok(None);
                }
                Err(e) => {
                    discard(self.page, branch).await;
                    return Err(e);
                }
            };
            let info = match self.page.describe(&parent).await {
                Ok(info) => info,
                Err(e) => {
                    discard_all(self.page, vec![branch, parent]).await;
                    return Err(e);
                }
            };
            if !info.is_scroll_container() && !info.is_body() {
                discard(self.page, branch).await;
                branch = parent;
                continue;
            }

            let index = self.page.index_in_parent(&branch).await;
            discard(self.page, branch).await;
            return match index {
                Ok(Some(index)) => Ok(Some(Region::new(parent, Scope::AfterEcho(index), self.probe))),
                Ok(None) => {
                    discard(self.page, parent).await;
                    Ok(None)
                }
                Err(e) => {
                    discard(self.page, parent).await;
                    Err(e)
                }
            };
        }
    }

    async fn marker_pass(
        &self,
        scroll_root: &DomNodeRef,
        previous: Option<&DomNodeRef>,
    ) -> Result<Option<Region>, PageError> {
        let mut echoes = Vec::new();
        let mut wrapper = None;
        for child in self.page.children(scroll_root).await? {
            if wrapper.is_some() {
                discard(self.page, child).await;
                continue;
            }
            let info = match self.page.describe(&child).await {
                Ok(info) => info,
                Err(e) => {
                    discard(self.page, child).await;
                    discard_all(self.page, echoes).await;
                    return Err(e);
                }
            };
            if info.seen || !info.has_area() {
                discard(self.page, child).await;
            } else if contains_probe(&info.inner_text, self.probe) {
                echoes.push(child);
            } else {
                wrapper = Some(child);
            }
        }

        if let Some(wrapper) = wrapper {
            discard_all(self.page, echoes).await;
            return Ok(Some(Region::new(wrapper, Scope::Whole, self.probe)));
        }

        let mut found = None;
        let mut error = None;
        for echo in echoes {
            if found.is_none() && error.is_none() {
                match self.has_reply_child(&echo, true).await {
                    Ok(true) => {
                        found = Some(echo);
                        continue;
                    }
                    Ok(false) => {}
                    Err(e) => error = Some(e),
                }
            }
            discard(self.page, echo).await;
        }
        if let Some(e) = error {
            return Err(e);
        }
        if let Some(echo) = found {
            return Ok(Some(Region::new(echo, Scope::UnseenChildren, self.probe)));
        }

        if let Some(previous) = previous {
            if self.has_reply_child(previous, false).await? {
                let container = self.page.duplicate(previous).await?;
                return Ok(Some(Region::new(container, Scope::UnseenChildren, self.probe)));
            }
        }
        Ok(None)
    }

    /// Whether `node` has an unmarked, visible child without the probe. With
    /// `after_echo`, only children following the first one holding the probe
    /// count, since a reply never precedes the message it answers.
    async fn has_reply_child(&self, node: &DomNodeRef, after_echo: bool) -> Result<bool, PageError> {
        let children = self.page.children(node).await?;
        let result = self.scan_for_reply(&children, after_echo).await;
        release_all(self.page, children).await?;
        result
    }

    async fn scan_for_reply(&self, children: &[DomNodeRef], after_echo: bool) -> Result<bool, PageError> {
        let mut echo_seen = !after_echo;
        for child in children {
            let info = self.page.describe(child).await?;
            if contains_probe(&info.inner_text, self.probe) {
                echo_seen = true;
                continue;
            }
            if echo_seen && !info.seen && info.has_area() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Deepest non-editable node whose text holds the probe, preferring the
    /// last matching child at every step. `None` while the probe is not
    /// rendered below `<body>`.
    async fn find_anchor(&self) -> Result<Option<DomNodeRef>, PageError> {
        let body = self.page.body().await?;
        let info = match self.page.describe(&body).await {
            Ok(info) => info,
            Err(e) => {
                discard(self.page, body).await;
                return Err(e);
            }
        };
        if !contains_probe(&info.inner_text, self.probe) {
            discard(self.page, body).await;
            return Ok(None);
        }

        let mut current = body;
        let mut depth = 0;
        loop {
            let next = match self.page.children(&current).await {
                Ok(children) => self.pick_child(children).await,
                Err(e) => Err(e),
            };
            match next {
                Ok(Some(child)) => {
                    discard(self.page, current).await;
                    current = child;
                    depth += 1;
                }
                Ok(None) => break,
                Err(e) => {
                    discard(self.page, current).await;
                    return Err(e);
                }
            }
        }

        if depth == 0 {
            discard(self.page, current).await;
            return Ok(None);
        }
        Ok(Some(current))
    }

    /// Last non-editable child containing the probe; releases the rest.
    async fn pick_child(&self, children: Vec<DomNodeRef>) -> Result<Option<DomNodeRef>, PageError> {
        let mut picked = None;
        let mut error = None;
        for child in children.into_iter().rev() {
            if picked.is_some() || error.is_some() {
                discard(self.page, child).await;
                continue;
            }
            match self.page.describe(&child).await {
                Ok(info) if !info.editable && contains_probe(&info.inner_text, self.probe) => {
                    picked = Some(child);
                }
                Ok(_) => discard(self.page, child).await,
                Err(e) => {
                    error = Some(e);
                    discard(self.page, child).await;
                }
            }
        }
        match (picked, error) {
            (Some(node), Some(e)) => {
                discard(self.page, node).await;
                Err(e)
            }
            (_, Some(e)) => Err(e),
            (picked, None) => Ok(picked),
        }
    }

    async fn anchor_chain(&self) -> Result<Option<Chain>, PageError> {
        let Some(anchor) = self.find_anchor().await? else {
            return Ok(None);
        };
        let mut nodes = vec![anchor];
        match self.collect_levels(&mut nodes).await {
            Ok(levels) => Ok(Some(Chain { nodes, levels })),
            Err(e) => {
                discard_all(self.page, nodes).await;
                Err(e)
            }
        }
    }

    /// Extend `nodes` with ancestors up to the first scroll container (or
    /// body) and take a sibling baseline for every level with a rendered box.
    async fn collect_levels(&self, nodes: &mut Vec<DomNodeRef>) -> Result<Vec<Level>, PageError> {
        while let Some(last) = nodes.last() {
            let Some(parent) = self.page.parent(last).await? else {
                break;
            };
            let info = self.page.describe(&parent).await;
            nodes.push(parent);
            let info = info?;
            if info.is_scroll_container() || info.is_body() {
                break;
            }
        }

        let mut levels = Vec::new();
        for branch in 0..nodes.len().saturating_sub(1) {
            if !self.page.describe(&nodes[branch]).await?.has_area() {
                continue;
            }
            let Some(branch_index) = self.page.index_in_parent(&nodes[branch]).await? else {
                continue;
            };
            let baseline = self
                .sibling_texts(&nodes[branch + 1], branch_index)
                .await?
                .iter()
                .map(|text| text.chars().count())
                .collect();
            levels.push(Level { branch, baseline });
        }
        Ok(levels)
    }

    /// Innermost level whose siblings signal a reply, with the branch's
    /// current index in its parent.
    async fn check_levels(&self, chain: &Chain) -> Result<Option<(usize, usize)>, PageError> {
        if !self.page.is_attached(&chain.nodes[0]).await? {
            return Err(PageError::StaleNode(chain.nodes[0].id()));
        }
        for (position, level) in chain.levels.iter().enumerate() {
            let branch = &chain.nodes[level.branch];
            let Some(branch_index) = self.page.index_in_parent(branch).await? else {
                continue;
            };
            let siblings = self
                .sibling_texts(&chain.nodes[level.branch + 1], branch_index)
                .await?;
            let signalled = siblings.iter().enumerate().any(|(i, text)| {
                let grew = match level.baseline.get(i) {
                    Some(&before) => text.chars().count() > before + self.growth_threshold,
                    None => true,
                };
                grew && !contains_probe(text, self.probe)
            });
            if signalled {
                debug!(
                    "Reply signalled at ancestor level {} ({} siblings, baseline {})",
                    level.branch,
                    siblings.len(),
                    level.baseline.len()
                );
                return Ok(Some((position, branch_index)));
            }
        }
        Ok(None)
    }

    /// Rendered text of every child of `parent` except the one at `skip`.
    async fn sibling_texts(&self, parent: &DomNodeRef, skip: usize) -> Result<Vec<String>, PageError> {
        let children = self.page.children(parent).await?;
        let mut texts = Vec::with_capacity(children.len());
        let mut error = None;
        for (i, child) in children.iter().enumerate() {
            if i == skip {
                continue;
            }
            match self.page.describe(child).await {
                Ok(info) => texts.push(info.inner_text),
                Err(e) => {
                    error = Some(e);
                    break;
                }
            }
        }
        release_all(self.page, children).await?;
        match error {
            Some(e) => Err(e),
            None => Ok(texts),
        }
    }

    async fn into_region(&self, chain: Chain, level: usize, branch_index: usize) -> Region {
        let mut nodes = chain.nodes;
        let container = nodes.remove(chain.levels[level].branch + 1);
        discard_all(self.page, nodes).await;
        Region::new(container, Scope::ExcludeBranch(branch_index), self.probe)
    }
}

/// Nearest ancestor of `container`, the container itself included, that is a
/// scroll container, falling back to `<body>`.
pub async fn scroll_ancestor(page: &dyn Page, container: &DomNodeRef) -> Result<DomNodeRef, PageError> {
    let mut current = page.duplicate(container).await?;
    loop {
        let info = match page.describe(&current).await {
            Ok(info) => info,
            Err(e) => {
                discard(page, current).await;
                return Err(e);
            }
        };
        if info.is_scroll_container() || info.is_body() {
            return Ok(current);
        }
        let parent = page.parent(&current).await;
        discard(page, current).await;
        match parent? {
            Some(parent) => current = parent,
            None => return page.body().await,
        }
    }
}

#[cfg(test)]
#[path = "discovery_tests.rs"]
mod tests;
