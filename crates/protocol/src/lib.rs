//! Wire types for the HTTP APIs that sit beside the WebDriver protocol.
//!
//! Two services are spoken to directly rather than through a WebDriver client:
//!
//! - the shared grid hub, which reports the node that accepted a session
//!   ([`grid::TestSessionStatus`])
//! - the cloud lab REST API, which keeps an accounting record per session
//!   ([`lab::LabJob`], [`lab::JobUpdate`])
//!
//! Types in this crate are pure data. Retry, polling and error policy live in
//! the `specdrive` core crate.

pub mod grid;
pub mod lab;

pub use grid::*;
pub use lab::*;
