//! The turn protocol: Sending, AwaitingStart, Streaming, Settling, Done.

use agora_protocols::{BridgeError, DomNodeRef};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use crate::discovery::{Discovery, scroll_ancestor};
use crate::monitor::Settle;
use crate::region::{Region, discard};

use super::core::{AgentBridge, BridgeState};

/// Partial mirror writes still running against the target.
type Pushes = Vec<JoinHandle<()>>;

/// How often one round may find its reply again after losing it.
const MAX_RELOCATIONS: u32 = 3;

impl AgentBridge {
    pub(super) async fn run_round(
        &self,
        state: &mut BridgeState,
        message: &str,
        probe: &str,
    ) -> Result<String, BridgeError> {
        self.write_input(state, message).await?;
        self.mark_seen(state, None).await;
        self.submit().await?;
        let submitted = Instant::now();
        debug!("[{}] Submitted, probe {:?}", self.name(), probe);

        let Some(mut region) = self.discover(state, probe).await else {
            return Err(BridgeError::DiscoveryTimeout {
                round: state.round,
                attempts: self.timings.discovery_attempts,
            });
        };
        info!(
            "[{}] Reply container found ({:?}) after {} ms",
            self.name(),
            region.scope(),
            submitted.elapsed().as_millis()
        );

        let result = self.await_reply(state, &mut region, probe, submitted).await;
        match result {
            Ok(_) => {
                let container = region.into_container();
                if let Some(old) = state.previous.replace(container) {
                    discard(self.page.as_ref(), old).await;
                }
            }
            Err(_) => discard(self.page.as_ref(), region.into_container()).await,
        }
        result
    }

    /// Probe discovery until the conversation's scroll container is known,
    /// marker discovery after.
    async fn discover(&self, state: &mut BridgeState, probe: &str) -> Option<Region> {
        let discovery = Discovery::new(self.page.as_ref(), probe, &self.timings);
        if let Some(root) = state.scroll_root.as_ref() {
            return discovery.by_marker(root, state.previous.as_ref()).await;
        }

        let region = discovery.by_probe().await?;
        match scroll_ancestor(self.page.as_ref(), region.container()).await {
            Ok(root) => state.scroll_root = Some(root),
            Err(e) => debug!("[{}] No scroll container resolved: {}", self.name(), e),
        }
        Some(region)
    }

    async fn await_reply(
        &self,
        state: &mut BridgeState,
        region: &mut Region,
        probe: &str,
        submitted: Instant,
    ) -> Result<String, BridgeError> {
        let timings = &self.timings;
        let round_deadline = submitted + timings.round_timeout();
        let start_deadline = submitted + timings.start_timeout();
        let baseline = self.read(region).await.unwrap_or_default();
        let mut relocations = 0;

        // AwaitingStart
        loop {
            if self.navigated_away(state).await
                && !self.relocate(state, region, probe, &mut relocations).await
            {
                return Ok(self.complete(state, region, String::new(), Vec::new()).await);
            }
            let now = Instant::now();
            if now >= round_deadline {
                warn!("[{}] No reply started before the round timeout", self.name());
                return Ok(String::new());
            }
            if now >= start_deadline {
                info!("[{}] No start signal, watching for content anyway", self.name());
                break;
            }
            sleep(timings.poll_interval()).await;

            let text = match region.extract(self.page.as_ref()).await {
                Ok(text) => text,
                Err(e) if e.is_stale() => {
                    if self.relocate(state, region, probe, &mut relocations).await {
                        continue;
                    }
                    return Ok(self.complete(state, region, String::new(), Vec::new()).await);
                }
                Err(e) => {
                    debug!("[{}] Extraction failed: {}", self.name(), e);
                    String::new()
                }
            };
            if !text.is_empty() && text != baseline {
                break;
            }
            let affordance = self.affordance().await;
            let elapsed = submitted.elapsed();
            if affordance && elapsed >= timings.affordance_min_elapsed() {
                break;
            }
            if !affordance && !text.is_empty() && elapsed >= timings.static_grace() {
                info!("[{}] Reply already complete, nothing streamed", self.name());
                return Ok(self.complete(state, region, text, Vec::new()).await);
            }
        }

        info!("[{}] Reply streaming", self.name());
        let mut last = String::new();
        let mut pushes = Pushes::new();
        loop {
            if self.navigated_away(state).await
                && !self.relocate(state, region, probe, &mut relocations).await
            {
                return Ok(self.complete(state, region, last, pushes).await);
            }
            if Instant::now() >= round_deadline {
                let err = BridgeError::StreamingTimeout {
                    elapsed_ms: submitted.elapsed().as_millis() as u64,
                };
                warn!("[{}] {}, keeping partial reply", self.name(), err);
                return Ok(self.complete(state, region, last, pushes).await);
            }

            self.scroll(state, region).await;
            let signals = match self.monitor.observe(self.page.as_ref(), region).await {
                Ok(signals) => signals,
                Err(e) if e.is_stale() => {
                    debug!("[{}] Reply container went stale: {}", self.name(), e);
                    if self.relocate(state, region, probe, &mut relocations).await {
                        continue;
                    }
                    return Ok(self.complete(state, region, last, pushes).await);
                }
                Err(e) => {
                    debug!("[{}] Streaming poll failed: {}", self.name(), e);
                    sleep(timings.poll_interval()).await;
                    continue;
                }
            };
            self.advance(&mut last, signals.text.clone(), &mut pushes);

            if !signals.is_streaming() {
                debug!("[{}] Settling", self.name());
                let settled = self
                    .monitor
                    .settle(
                        self.page.as_ref(),
                        region,
                        &last,
                        timings.settle_checks,
                        timings.settle_delay(),
                    )
                    .await;
                match settled {
                    Ok(Settle::Done(text)) => {
                        return Ok(self.complete(state, region, text, pushes).await);
                    }
                    Ok(Settle::Resumed(text)) => self.advance(&mut last, text, &mut pushes),
                    Err(e) if e.is_stale() => {
                        debug!("[{}] Reply container went stale while settling: {}", self.name(), e);
                        if !self.relocate(state, region, probe, &mut relocations).await {
                            return Ok(self.complete(state, region, last, pushes).await);
                        }
                    }
                    Err(e) => debug!("[{}] Settle check failed: {}", self.name(), e),
                }
                continue;
            }
            sleep(timings.poll_interval()).await;
        }
    }

    /// Whether the page navigated since the last check. Cached handles
    /// belong to the old document, so they are dropped.
    async fn navigated_away(&self, state: &mut BridgeState) -> bool {
        if !self.navigated() {
            return false;
        }
        warn!("[{}] Page navigated mid-round", self.name());
        state.reset(self.page.as_ref()).await;
        true
    }

    /// Replace a region that left the document with one found again from
    /// the echo. `false` when nothing was found or the round already
    /// relocated too often; the caller then finishes with what it has.
    async fn relocate(
        &self,
        state: &mut BridgeState,
        region: &mut Region,
        probe: &str,
        relocations: &mut u32,
    ) -> bool {
        if *relocations >= MAX_RELOCATIONS {
            warn!("[{}] Reply container lost {} times, giving up", self.name(), relocations);
            return false;
        }
        *relocations += 1;

        let page = self.page.as_ref();
        state.validate(page).await;
        let Some(found) = Discovery::new(page, probe, &self.timings).after_echo().await else {
            warn!("[{}] Reply container lost and not found again", self.name());
            return false;
        };
        info!("[{}] Reply container re-found ({:?})", self.name(), found.scope());
        if state.scroll_root.is_none() {
            match page.duplicate(found.container()).await {
                Ok(root) => state.scroll_root = Some(root),
                Err(e) => debug!("[{}] Could not keep the scroll container: {}", self.name(), e),
            }
        }
        let old = std::mem::replace(region, found);
        discard(page, old.into_container()).await;
        true
    }

    /// Record new partial text and mirror it to the target.
    fn advance(&self, last: &mut String, text: String, pushes: &mut Pushes) {
        if text.is_empty() || text == *last {
            return;
        }
        *last = text;
        let Some(target) = self.target() else { return };
        pushes.retain(|push| !push.is_finished());
        let payload = format!("{}:\n\n{}", self.name(), last);
        pushes.push(tokio::spawn(async move {
            target.update_input(&payload).await;
        }));
    }

    /// Done: take the final text, hand it to the target with a turn prompt,
    /// and mark everything now on screen as seen.
    async fn complete(
        &self,
        state: &BridgeState,
        region: &Region,
        fallback: String,
        pushes: Pushes,
    ) -> String {
        let text = match self.read(region).await {
            Some(text) if !text.is_empty() => text,
            _ => fallback,
        };

        for push in pushes {
            if let Err(e) = push.await {
                debug!("[{}] Mirror task ended abnormally: {}", self.name(), e);
            }
        }
        if let Some(target) = self.target().filter(|_| !text.is_empty()) {
            let payload = format!(
                "{}:\n\n{}{}",
                self.name(),
                text,
                self.templates.turn_prompt(target.name())
            );
            target.update_input(&payload).await;
        }

        self.mark_seen(state, Some(region.container())).await;
        text
    }

    /// Mark the children of every tracked container as seen.
    async fn mark_seen(&self, state: &BridgeState, current: Option<&DomNodeRef>) {
        let nodes = [current, state.previous.as_ref(), state.scroll_root.as_ref()];
        for node in nodes.into_iter().flatten() {
            match self.page.mark_children_seen(node).await {
                Ok(marked) => debug!("[{}] Marked {} children seen", self.name(), marked),
                Err(e) => debug!("[{}] Marking children failed: {}", self.name(), e),
            }
        }
    }

    async fn read(&self, region: &Region) -> Option<String> {
        match region.extract(self.page.as_ref()).await {
            Ok(text) => Some(text),
            Err(e) => {
                debug!("[{}] Extraction failed: {}", self.name(), e);
                None
            }
        }
    }

    async fn affordance(&self) -> bool {
        self.monitor
            .affordance_visible(self.page.as_ref())
            .await
            .unwrap_or_else(|e| {
                debug!("[{}] Control scan failed: {}", self.name(), e);
                false
            })
    }

    async fn scroll(&self, state: &BridgeState, region: &Region) {
        let node = state.scroll_root.as_ref().unwrap_or(region.container());
        if let Err(e) = self.page.scroll_to_end(node).await {
            debug!("[{}] Scroll failed: {}", self.name(), e);
        }
    }
}
