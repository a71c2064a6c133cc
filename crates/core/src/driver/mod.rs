//! The WebDriver client seam.
//!
//! Everything above this module talks to a [`BrowserSession`]; the real
//! implementation is [`RemoteSession`] over fantoccini, and tests substitute
//! the fakes in [`crate::testing`].

mod launcher;
mod local;
mod remote;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

pub use launcher::{LocalLaunch, SessionLauncher, WebDriverLauncher};
pub use local::DriverProcess;
pub use remote::RemoteSession;

use crate::error::Result;

/// Element lookup strategy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum By {
	Css(String),
	Id(String),
	XPath(String),
	LinkText(String),
}

impl By {
	pub fn css(selector: impl Into<String>) -> Self {
		By::Css(selector.into())
	}

	pub fn id(id: impl Into<String>) -> Self {
		By::Id(id.into())
	}

	pub fn xpath(path: impl Into<String>) -> Self {
		By::XPath(path.into())
	}
}

impl fmt::Display for By {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			By::Css(s) => write!(f, "By.CssSelector: {s}"),
			By::Id(s) => write!(f, "By.Id: {s}"),
			By::XPath(s) => write!(f, "By.XPath: {s}"),
			By::LinkText(s) => write!(f, "By.LinkText: {s}"),
		}
	}
}

/// Opaque reference to an element found in a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ElementHandle(pub u64);

/// A live browser under remote control.
///
/// Owned exclusively by one scenario. [`close`](Self::close) consumes the
/// session so it cannot be closed twice.
#[async_trait]
pub trait BrowserSession: Send + Sync {
	/// Backend-assigned identity, used by grid node lookup and lab accounting.
	async fn session_id(&self) -> Result<String>;

	async fn current_url(&self) -> Result<String>;

	async fn goto(&self, url: &str) -> Result<()>;

	async fn find(&self, by: &By) -> Result<ElementHandle>;

	async fn click(&self, element: ElementHandle) -> Result<()>;

	async fn send_keys(&self, element: ElementHandle, text: &str) -> Result<()>;

	async fn clear(&self, element: ElementHandle) -> Result<()>;

	/// Raw image bytes as produced by the remote end.
	async fn screenshot(&self) -> Result<Vec<u8>>;

	async fn window_handle(&self) -> Result<String>;

	async fn window_handles(&self) -> Result<Vec<String>>;

	async fn maximize_window(&self) -> Result<()>;

	async fn delete_all_cookies(&self) -> Result<()>;

	async fn set_implicit_wait(&self, wait: Duration) -> Result<()>;

	async fn execute(&self, script: &str, args: Vec<Value>) -> Result<Value>;

	async fn close(self: Box<Self>) -> Result<()>;
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn locator_display_names_strategy() {
		assert_eq!(By::css("#login").to_string(), "By.CssSelector: #login");
		assert_eq!(By::xpath("//a").to_string(), "By.XPath: //a");
	}
}
