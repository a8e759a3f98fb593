//! Agent bridge errors.

use thiserror::Error;

use super::PageError;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("No editable input region found on the page")]
    NoInputFound,

    #[error("Nothing to send: no message given and nothing mirrored from the counterpart")]
    NoContent,

    #[error("Response container not found in round {round} after {attempts} attempts")]
    DiscoveryTimeout { round: u32, attempts: u32 },

    #[error("Generation did not settle within {elapsed_ms} ms")]
    StreamingTimeout { elapsed_ms: u64 },

    #[error("A round is already in flight on this bridge")]
    Busy,

    #[error("Page error: {0}")]
    Page(#[from] PageError),
}

impl BridgeError {
    /// Whether the orchestrator may retry the round from the top.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            BridgeError::DiscoveryTimeout { .. }
                | BridgeError::NoInputFound
                | BridgeError::StreamingTimeout { .. }
                | BridgeError::Page(_)
        )
    }
}
