//! Agent bridge: drives one chat participant through a turn.

mod core;
mod input;
mod round;

pub use self::core::AgentBridge;
