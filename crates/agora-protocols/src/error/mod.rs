//! Error types for the Agora protocol layer.

mod bridge;
mod page;

pub use bridge::*;
pub use page::*;
