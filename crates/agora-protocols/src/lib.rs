//! # Agora Protocols
//!
//! Interface definitions shared by the Agora crates. Contains only types and
//! traits - no implementations.
//!
//! ## Core Types
//!
//! - [`Page`] - The only I/O surface the bridge engine sees: DOM queries,
//!   text snapshots, input simulation and navigation/console notifications.
//! - [`DomNodeRef`] - An owned, explicitly released handle to a node living
//!   inside a page.
//! - [`PageError`] / [`BridgeError`] - The shared error taxonomy.

pub mod dom;
pub mod error;
pub mod page;

pub use dom::{
    BoundingBox, ConsoleMessage, Control, KeyPress, Modifiers, NavigationEvent, NodeInfo,
    TextChild, TextNode,
};
pub use error::{BridgeError, PageError};
pub use page::{DomNodeRef, Page, release_all};
