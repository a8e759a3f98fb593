//! Chrome launcher: one browser per agent, each with its own profile,
//! debugging port and window.

mod launcher_core;
mod launcher_types;

pub use launcher_core::BrowserLauncher;
pub use launcher_types::{Browser, BrowserSlot, LaunchError, LauncherConfig};

#[cfg(test)]
#[path = "launcher_tests.rs"]
mod tests;
