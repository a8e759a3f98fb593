//! Streaming detection.
//!
//! Two independent signals tell whether a reply is still being written: the
//! region's text changing between two reads, and a visible "stop" control.
//! Either one alone means streaming.

use std::time::Duration;

use agora_config::Locale;
use agora_protocols::{Page, PageError};
use tracing::debug;

use crate::region::Region;

const STOP_PHRASES_EN: &[&str] = &[
    "stop",
    "stop generating",
    "stop response",
    "stop streaming",
    "cancel generation",
];

const STOP_PHRASES_ZH: &[&str] = &["停止", "停止生成", "停止回答"];

/// One observation of the streaming signals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSignals {
    /// Text differed between the two reads.
    pub changed: bool,
    /// A stop control was visible.
    pub affordance: bool,
    /// Second of the two reads.
    pub text: String,
}

impl StreamSignals {
    pub fn is_streaming(&self) -> bool {
        self.changed || self.affordance
    }
}

/// Result of a settling window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settle {
    /// Text stayed put with no stop control for the whole window.
    Done(String),
    /// Streaming resumed; carries the latest text.
    Resumed(String),
}

#[derive(Debug, Clone)]
pub struct StreamingMonitor {
    phrases: Vec<&'static str>,
    delta_delay: Duration,
}

impl StreamingMonitor {
    pub fn new(locale: Locale, delta_delay: Duration) -> Self {
        let mut phrases = STOP_PHRASES_EN.to_vec();
        if locale == Locale::Zh {
            phrases.extend_from_slice(STOP_PHRASES_ZH);
        }
        Self {
            phrases,
            delta_delay,
        }
    }

    /// Whether a control name reads as "stop the reply".
    pub fn is_stop_name(&self, name: &str) -> bool {
        self.phrases.iter().any(|phrase| {
            name == *phrase
                || name
                    .strip_prefix(phrase)
                    .is_some_and(|rest| rest.starts_with(' '))
        })
    }

    /// Any visible control matching a stop phrase.
    pub async fn affordance_visible(&self, page: &dyn Page) -> Result<bool, PageError> {
        let controls = page.controls().await?;
        Ok(controls
            .iter()
            .any(|control| control.names().any(|name| self.is_stop_name(&name))))
    }

    /// Read the region twice, `delta_delay` apart.
    pub async fn content_delta(
        &self,
        page: &dyn Page,
        region: &Region,
    ) -> Result<(bool, String), PageError> {
        let before = region.extract(page).await?;
        tokio::time::sleep(self.delta_delay).await;
        let after = region.extract(page).await?;
        Ok((before != after, after))
    }

    pub async fn observe(&self, page: &dyn Page, region: &Region) -> Result<StreamSignals, PageError> {
        let (changed, text) = self.content_delta(page, region).await?;
        let affordance = self.affordance_visible(page).await?;
        Ok(StreamSignals {
            changed,
            affordance,
            text,
        })
    }

    /// Confirm that streaming ended: `checks` consecutive observations,
    /// `delay` apart, with unchanged text equal to `last` and no stop control.
    pub async fn settle(
        &self,
        page: &dyn Page,
        region: &Region,
        last: &str,
        checks: u32,
        delay: Duration,
    ) -> Result<Settle, PageError> {
        let mut text = last.to_string();
        for check in 1..=checks {
            tokio::time::sleep(delay).await;
            let signals = self.observe(page, region).await?;
            if signals.is_streaming() || signals.text != text {
                debug!(
                    "Settle check {}/{} saw activity (changed: {}, affordance: {})",
                    check, checks, signals.changed, signals.affordance
                );
                return Ok(Settle::Resumed(signals.text));
            }
            text = signals.text;
        }
        Ok(Settle::Done(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::Scope;
    use crate::testing::{FakeElement, FakePage};

    fn monitor() -> StreamingMonitor {
        StreamingMonitor::new(Locale::En, Duration::from_millis(300))
    }

    async fn reply_region(page: &FakePage) -> (usize, Region) {
        let wrapper = page.add_element(page.body_id(), FakeElement::div());
        page.add_text(wrapper, "partial");
        let body = page.body().await.unwrap();
        let mut children = page.children(&body).await.unwrap();
        page.release(body).await.unwrap();
        let container = children.remove(0);
        (wrapper, Region::new(container, Scope::Whole, "probe"))
    }

    #[test]
    fn test_stop_phrase_matching() {
        let m = monitor();
        assert!(m.is_stop_name("stop"));
        assert!(m.is_stop_name("stop generating"));
        assert!(m.is_stop_name("stop response now"));
        assert!(!m.is_stop_name("stopwatch"));
        assert!(!m.is_stop_name("停止生成"));

        let zh = StreamingMonitor::new(Locale::Zh, Duration::from_millis(300));
        assert!(zh.is_stop_name("停止生成"));
        assert!(zh.is_stop_name("stop"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_constant_text_with_affordance_is_streaming() {
        let page = FakePage::new();
        let (_, region) = reply_region(&page).await;
        page.add_control("Stop response", "");

        let signals = monitor().observe(&page, &region).await.unwrap();
        assert!(!signals.changed);
        assert!(signals.affordance);
        assert!(signals.is_streaming());
        region.release(&page).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_text_change_alone_is_streaming() {
        let page = FakePage::new();
        let (wrapper, region) = reply_region(&page).await;
        let writer = {
            let page = page.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                page.set_text(wrapper, "partial and more");
            })
        };

        let signals = monitor().observe(&page, &region).await.unwrap();
        writer.await.unwrap();
        assert!(signals.changed);
        assert!(!signals.affordance);
        assert_eq!(signals.text, "partial and more");
        region.release(&page).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_settles_once_affordance_disappears() {
        let page = FakePage::new();
        let (_, region) = reply_region(&page).await;
        let stop = page.add_control("Stop response", "");
        let m = monitor();
        let delay = Duration::from_millis(500);

        let outcome = m.settle(&page, &region, "partial", 3, delay).await.unwrap();
        assert_eq!(outcome, Settle::Resumed("partial".to_string()));

        page.set_control_visible(stop, false);
        let outcome = m.settle(&page, &region, "partial", 3, delay).await.unwrap();
        assert_eq!(outcome, Settle::Done("partial".to_string()));
        region.release(&page).await.unwrap();
    }
}
