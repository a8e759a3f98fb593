//! Page capability errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PageError {
    /// The handle points at a node that left the document, or its
    /// browser-side reference was dropped by a navigation.
    #[error("Stale node reference: {0}")]
    StaleNode(u64),

    #[error("Element not found: {0}")]
    NotFound(String),

    #[error("Page script error: {0}")]
    Script(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Page operation timed out: {0}")]
    Timeout(String),

    #[error("Page closed")]
    Closed,
}

impl PageError {
    /// Whether the error means the handle must be discarded and rediscovered.
    pub fn is_stale(&self) -> bool {
        matches!(self, PageError::StaleNode(_))
    }
}

impl From<serde_json::Error> for PageError {
    fn from(e: serde_json::Error) -> Self {
        PageError::Script(format!("Malformed page response: {}", e))
    }
}
