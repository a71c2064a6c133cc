//! Session decorator that mirrors significant actions into the diagnostic log.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::driver::{BrowserSession, By, ElementHandle};
use crate::error::Result;
use crate::log::DiagnosticLog;

/// Forwards every call to the wrapped session, logging navigation, element
/// lookup, clicks and value changes before they happen.
pub struct EventMirror {
	inner: Box<dyn BrowserSession>,
	log: DiagnosticLog,
}

impl EventMirror {
	pub fn new(inner: Box<dyn BrowserSession>, log: DiagnosticLog) -> Self {
		Self { inner, log }
	}
}

#[async_trait]
impl BrowserSession for EventMirror {
	async fn session_id(&self) -> Result<String> {
		self.inner.session_id().await
	}

	async fn current_url(&self) -> Result<String> {
		self.inner.current_url().await
	}

	async fn goto(&self, url: &str) -> Result<()> {
		self.log.add(format!("Navigating to: {url}"));
		self.inner.goto(url).await
	}

	async fn find(&self, by: &By) -> Result<ElementHandle> {
		self.log.add(format!("Finding element: {by}"));
		self.inner.find(by).await
	}

	async fn click(&self, element: ElementHandle) -> Result<()> {
		self.log.add("Clicking element");
		self.inner.click(element).await
	}

	async fn send_keys(&self, element: ElementHandle, text: &str) -> Result<()> {
		self.log.add("Changing element value");
		self.inner.send_keys(element, text).await
	}

	async fn clear(&self, element: ElementHandle) -> Result<()> {
		self.log.add("Changing element value");
		self.inner.clear(element).await
	}

	async fn screenshot(&self) -> Result<Vec<u8>> {
		self.inner.screenshot().await
	}

	async fn window_handle(&self) -> Result<String> {
		self.inner.window_handle().await
	}

	async fn window_handles(&self) -> Result<Vec<String>> {
		self.inner.window_handles().await
	}

	async fn maximize_window(&self) -> Result<()> {
		self.inner.maximize_window().await
	}

	async fn delete_all_cookies(&self) -> Result<()> {
		self.inner.delete_all_cookies().await
	}

	async fn set_implicit_wait(&self, wait: Duration) -> Result<()> {
		self.inner.set_implicit_wait(wait).await
	}

	async fn execute(&self, script: &str, args: Vec<Value>) -> Result<Value> {
		self.inner.execute(script, args).await
	}

	async fn close(self: Box<Self>) -> Result<()> {
		self.inner.close().await
	}
}
