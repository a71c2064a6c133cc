//! Session lifecycle core for WebDriver acceptance tests.
//!
//! A scenario runs against exactly one backend: a locally launched browser, a
//! shared grid, or a cloud device lab. This crate decides which one
//! ([`resolver`]), builds the session for it ([`factory`]), and tears it down
//! afterwards whatever happened ([`finalizer`]). The [`hooks::Harness`] ties
//! these together around the step code supplied by a BDD runner.
//!
//! All per-scenario state (diagnostic log, key/value store, recorded error)
//! lives in a [`scenario::ScenarioContext`] that is passed explicitly; nothing
//! is process-global, so scenarios can run concurrently.

pub mod capabilities;
pub mod config;
pub mod driver;
pub mod error;
pub mod events;
pub mod factory;
pub mod finalizer;
pub mod grid;
pub mod hooks;
pub mod lab;
pub mod log;
pub mod resolver;
pub mod scenario;
pub mod screenshot;
pub mod testing;
pub mod timeouts;
pub mod types;
pub mod wait;

pub use capabilities::Capabilities;
pub use config::HarnessConfig;
pub use driver::{BrowserSession, By, ElementHandle, SessionLauncher};
pub use error::{Error, ErrorKind, Result};
pub use factory::{ActiveSession, SessionFactory};
pub use finalizer::Finalizer;
pub use grid::GridNode;
pub use hooks::{Harness, ScenarioReport};
pub use log::{DiagnosticLog, ScenarioStore};
pub use scenario::{ScenarioContext, ScenarioInfo};
pub use types::{Backend, BrowserFamily, BrowserIdentity, Outcome};
pub use wait::{PollOptions, RetryPolicy, poll, retry};
