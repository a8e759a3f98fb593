//! Chrome DevTools Protocol backend for Agora.
//!
//! Implements the [`Page`](agora_protocols::Page) capability over a live
//! Chrome tab. Pure Rust, talking CDP over a WebSocket.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐    WebSocket     ┌──────────────────┐
//! │    CdpPage      │ ◄──────────────► │   Chrome/Edge    │
//! │  (this crate)   │       CDP        │ (one per agent)  │
//! └─────────────────┘                  └──────────────────┘
//! ```
//!
//! - [`CdpClient`] / [`PageSession`] - the protocol client and a per-tab
//!   session with navigation and console event pumps.
//! - [`CdpPage`] - DOM access through an in-page helper script that keeps a
//!   registry of element handles.
//! - [`BrowserLauncher`] - starts one Chrome per agent with its own profile,
//!   debugging port and window position.
//!
//! ## Setup
//!
//! Chrome is launched automatically. To reuse a browser you started
//! yourself, run it with remote debugging on the agent's port:
//!
//! ```bash
//! google-chrome --remote-debugging-port=9222 --user-data-dir=./profiles/claude
//! ```

pub mod cdp;
pub mod launcher;
mod page;

pub use cdp::{CdpClient, CdpError, PageSession};
pub use launcher::{Browser, BrowserLauncher, BrowserSlot, LaunchError, LauncherConfig};
pub use page::CdpPage;
