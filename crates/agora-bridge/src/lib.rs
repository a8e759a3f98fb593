//! # Agora Bridge
//!
//! Engine that lets two AI chat web UIs talk to each other through a
//! [`Page`](agora_protocols::Page): it types a message into one site,
//! finds where the reply renders without site-specific selectors, follows
//! the reply while it streams, and mirrors it into the counterpart's input.
//!
//! ## Modules
//!
//! - [`extractor`] - visible text of a DOM snapshot, minus screen-reader-only copies
//! - [`discovery`] - locating the reply container (probe-anchored, then marker-based)
//! - [`monitor`] - streaming detection from content deltas and stop controls
//! - [`bridge`] - the per-agent turn protocol
//! - [`templates`] - locale-specific prompts

pub mod bridge;
pub mod discovery;
pub mod extractor;
pub mod monitor;
pub mod probe;
pub mod region;
pub mod templates;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use bridge::AgentBridge;
pub use extractor::visible_text;
pub use monitor::{Settle, StreamSignals, StreamingMonitor};
pub use region::{Region, Scope};
pub use templates::PromptTemplates;
