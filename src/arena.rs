//! Debate orchestration between two bridges.
//!
//! The opening hands both sides the moderator brief. Every later round is
//! `A.send(None)` then `B.send(None)`: each side answers whatever its
//! counterpart mirrored into its input while streaming.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use agora_bridge::{AgentBridge, PromptTemplates};
use agora_protocols::BridgeError;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::transcript::TranscriptWriter;

/// Pause before a failed turn or round is retried.
const RETRY_DELAY: Duration = Duration::from_secs(2);

/// Characters of each reply echoed to the log.
const EXCERPT_CHARS: usize = 200;

/// Debate errors.
#[derive(Debug, Error)]
pub enum ArenaError {
    #[error("{speaker} failed in round {round}: {source}")]
    Bridge {
        speaker: String,
        round: u32,
        #[source]
        source: BridgeError,
    },

    #[error("{speaker} returned an empty reply in round {round}")]
    EmptyReply { speaker: String, round: u32 },

    #[error("Transcript write failed: {0}")]
    Transcript(#[from] std::io::Error),
}

impl ArenaError {
    /// Whether running the same step again may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ArenaError::Bridge { source, .. } => source.is_recoverable(),
            ArenaError::EmptyReply { .. } => true,
            ArenaError::Transcript(_) => false,
        }
    }
}

/// One completed reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub round: u32,
    pub speaker: String,
    pub content: String,
}

/// Result of a finished debate.
#[derive(Debug, Clone, Default)]
pub struct DebateOutcome {
    pub rounds_completed: u32,
    pub retries: u32,
    pub turns: Vec<Turn>,
}

/// Two bridges taking turns on one topic.
pub struct Arena {
    a: Arc<AgentBridge>,
    b: Arc<AgentBridge>,
    templates: PromptTemplates,
    max_round_retries: u32,
    retry_delay: Duration,
    transcript: Option<TranscriptWriter>,
}

impl Arena {
    pub fn new(
        a: Arc<AgentBridge>,
        b: Arc<AgentBridge>,
        templates: PromptTemplates,
        max_round_retries: u32,
    ) -> Self {
        Self {
            a,
            b,
            templates,
            max_round_retries,
            retry_delay: RETRY_DELAY,
            transcript: None,
        }
    }

    /// Record every turn to `writer`.
    pub fn with_transcript(mut self, writer: TranscriptWriter) -> Self {
        self.transcript = Some(writer);
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn transcript(&self) -> Option<&TranscriptWriter> {
        self.transcript.as_ref()
    }

    /// Opening message: the moderator label, a blank line, then the brief.
    pub fn moderator_message(&self, topic: &str) -> String {
        format!(
            "{}:\n\n{}",
            self.templates.moderator_label(),
            self.templates
                .moderator_message(self.a.name(), self.b.name(), topic)
        )
    }

    /// Run the opening and `rounds` rounds.
    pub async fn run(&self, topic: &str, rounds: u32) -> Result<DebateOutcome, ArenaError> {
        info!("Debate: {} vs {}", self.a.name(), self.b.name());
        info!("Topic: {}", topic);

        if let Some(writer) = &self.transcript {
            writer
                .record_start(topic, &[self.a.name(), self.b.name()])
                .await?;
            info!("Transcript: {}", writer.path().display());
        }

        let mut outcome = DebateOutcome::default();
        let result = self.debate(topic, rounds, &mut outcome).await;

        if let Some(writer) = &self.transcript {
            let (status, error) = match &result {
                Ok(()) => ("completed", None),
                Err(e) => ("failed", Some(e.to_string())),
            };
            writer
                .record_end(status, outcome.rounds_completed, error.as_deref())
                .await?;
        }

        result.map(|()| {
            info!(
                "Debate finished after {} rounds ({} retries)",
                outcome.rounds_completed, outcome.retries
            );
            outcome
        })
    }

    async fn debate(
        &self,
        topic: &str,
        rounds: u32,
        outcome: &mut DebateOutcome,
    ) -> Result<(), ArenaError> {
        let moderator = self.moderator_message(topic);
        info!("Opening statements");

        // A opens with nobody listening; B's opening streams into A.
        self.a.set_target_bridge(None);
        self.b.set_target_bridge(None);
        let opening_a = self
            .retrying(0, outcome, || self.turn(0, &self.a, Some(&moderator)))
            .await?;
        outcome.turns.push(opening_a);

        self.b.set_target_bridge(Some(&self.a));
        let opening_b = self
            .retrying(0, outcome, || self.turn(0, &self.b, Some(&moderator)))
            .await?;
        outcome.turns.push(opening_b);

        self.a.set_target_bridge(Some(&self.b));

        for round in 1..=rounds {
            info!("Round {}", round);
            let turns = self.retrying(round, outcome, || self.round(round)).await?;
            outcome.turns.extend(turns);
            outcome.rounds_completed = round;
        }
        Ok(())
    }

    /// Run `step` until it succeeds, retrying recoverable failures up to
    /// the configured limit.
    async fn retrying<T, F, Fut>(
        &self,
        round: u32,
        outcome: &mut DebateOutcome,
        step: F,
    ) -> Result<T, ArenaError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, ArenaError>>,
    {
        let mut attempt = 0;
        loop {
            match step().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.max_round_retries => {
                    attempt += 1;
                    outcome.retries += 1;
                    warn!(
                        "Round {} error: {} (retry {}/{})",
                        round, e, attempt, self.max_round_retries
                    );
                    sleep(self.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Both sides answer their mirrored input, A first.
    async fn round(&self, round: u32) -> Result<Vec<Turn>, ArenaError> {
        let first = self.turn(round, &self.a, None).await?;
        let second = self.turn(round, &self.b, None).await?;
        Ok(vec![first, second])
    }

    async fn turn(
        &self,
        round: u32,
        bridge: &AgentBridge,
        message: Option<&str>,
    ) -> Result<Turn, ArenaError> {
        let speaker = bridge.name().to_string();
        let content = bridge
            .send(message)
            .await
            .map_err(|source| ArenaError::Bridge {
                speaker: speaker.clone(),
                round,
                source,
            })?;
        if content.trim().is_empty() {
            return Err(ArenaError::EmptyReply { speaker, round });
        }

        let excerpt: String = content.chars().take(EXCERPT_CHARS).collect();
        info!("[{}]: {}...", speaker, excerpt);
        if let Some(writer) = &self.transcript {
            writer.record_turn(round, &speaker, &content).await?;
        }
        Ok(Turn {
            round,
            speaker,
            content,
        })
    }
}

#[cfg(test)]
#[path = "arena_tests.rs"]
mod tests;
