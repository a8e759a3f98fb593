//! Input box handling: locating, filling and submitting.

use agora_config::SubmitMode;
use agora_protocols::{BridgeError, DomNodeRef, KeyPress};
use tracing::{debug, warn};

use crate::region::discard;

use super::core::{AgentBridge, BridgeState};

/// Submit control names tried when the agent config lists none.
const DEFAULT_SUBMIT_LABELS: &[&str] = &["send", "send message", "submit", "发送"];

impl AgentBridge {
    /// Make sure `state.input` holds an attached editable region, preferring
    /// the cached one and otherwise the largest visible candidate.
    pub(super) async fn locate_input<'s>(
        &self,
        state: &'s mut BridgeState,
    ) -> Result<&'s DomNodeRef, BridgeError> {
        if let Some(input) = state.input.take() {
            if self.page.is_attached(&input).await.unwrap_or(false) {
                return Ok(state.input.insert(input));
            }
            debug!("[{}] Cached input detached", self.name());
            discard(self.page.as_ref(), input).await;
        }

        let mut best: Option<(f64, DomNodeRef)> = None;
        for candidate in self.page.editable_candidates().await? {
            let area = match self.page.describe(&candidate).await {
                Ok(info) => info.rect.area(),
                Err(e) => {
                    debug!("[{}] Skipping input candidate: {}", self.name(), e);
                    discard(self.page.as_ref(), candidate).await;
                    continue;
                }
            };
            if best.as_ref().is_none_or(|(best_area, _)| area >= *best_area) {
                if let Some((_, replaced)) = best.replace((area, candidate)) {
                    discard(self.page.as_ref(), replaced).await;
                }
            } else {
                discard(self.page.as_ref(), candidate).await;
            }
        }

        let (area, input) = best.ok_or(BridgeError::NoInputFound)?;
        debug!("[{}] Using input with area {:.0}", self.name(), area);
        Ok(state.input.insert(input))
    }

    /// Replace the input's content with `text`. Line breaks are typed as
    /// soft newlines so nothing is submitted early.
    pub(super) async fn write_input(
        &self,
        state: &mut BridgeState,
        text: &str,
    ) -> Result<(), BridgeError> {
        let input = self.locate_input(state).await?;
        self.page.focus(input).await?;
        self.page.press_key(KeyPress::select_all()).await?;
        self.page.press_key(KeyPress::backspace()).await?;

        for (i, line) in text.split('\n').enumerate() {
            if i > 0 {
                self.page.press_key(KeyPress::soft_newline()).await?;
            }
            if !line.is_empty() {
                self.page.insert_text(line).await?;
            }
        }

        let typed = self.page.input_text(input).await?;
        if typed != text {
            warn!(
                "[{}] Input holds {} chars after typing {}",
                self.name(),
                typed.chars().count(),
                text.chars().count()
            );
        }
        Ok(())
    }

    /// Submit the typed message per the agent's submit mode.
    pub(super) async fn submit(&self) -> Result<(), BridgeError> {
        if self.agent.submit == SubmitMode::Button {
            let labels: Vec<String> = if self.agent.submit_labels.is_empty() {
                DEFAULT_SUBMIT_LABELS.iter().map(|s| s.to_string()).collect()
            } else {
                self.agent
                    .submit_labels
                    .iter()
                    .map(|s| s.trim().to_lowercase())
                    .collect()
            };
            let controls = self.page.controls().await?;
            if let Some(control) = controls
                .iter()
                .find(|c| c.names().any(|name| labels.contains(&name)))
            {
                debug!("[{}] Clicking submit control {}", self.name(), control.index);
                self.page.click_control(control.index).await?;
                return Ok(());
            }
            warn!("[{}] No submit control matched, pressing Enter", self.name());
        }
        self.page.press_key(KeyPress::enter()).await?;
        Ok(())
    }
}
