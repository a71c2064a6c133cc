use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use fantoccini::elements::Element;
use fantoccini::error::CmdError;
use fantoccini::wd::TimeoutConfiguration;
use fantoccini::{Client, Locator};
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, warn};

use super::local::DriverProcess;
use super::{BrowserSession, By, ElementHandle};
use crate::error::{Error, Result};

/// A fantoccini client bound to one session.
///
/// Every command is bounded by the command timeout the session was opened
/// with. For local backends the spawned driver process is owned here and
/// killed on close.
pub struct RemoteSession {
	client: Client,
	elements: Mutex<HashMap<u64, Element>>,
	next_element: AtomicU64,
	command_timeout: Duration,
	driver_process: Option<DriverProcess>,
}

impl RemoteSession {
	pub fn new(client: Client, command_timeout: Duration) -> Self {
		Self {
			client,
			elements: Mutex::new(HashMap::new()),
			next_element: AtomicU64::new(1),
			command_timeout,
			driver_process: None,
		}
	}

	pub fn with_driver_process(mut self, process: DriverProcess) -> Self {
		self.driver_process = Some(process);
		self
	}

	async fn run<T, F>(&self, command: &str, fut: F) -> Result<T>
	where
		F: Future<Output = std::result::Result<T, CmdError>>,
	{
		match tokio::time::timeout(self.command_timeout, fut).await {
			Ok(result) => result.map_err(Error::from),
			Err(_) => Err(Error::Timeout {
				waited: self.command_timeout,
				message: format!("webdriver command `{command}`"),
			}),
		}
	}

	fn element(&self, handle: ElementHandle) -> Result<Element> {
		self.elements
			.lock()
			.get(&handle.0)
			.cloned()
			.ok_or_else(|| Error::TransientProtocol(format!("element handle {} is no longer known", handle.0)))
	}
}

#[async_trait]
impl BrowserSession for RemoteSession {
	async fn session_id(&self) -> Result<String> {
		self.run("session id", self.client.session_id())
			.await?
			.ok_or_else(|| Error::InvalidSession("remote end did not assign a session id".into()))
	}

	async fn current_url(&self) -> Result<String> {
		Ok(self.run("current url", self.client.current_url()).await?.to_string())
	}

	async fn goto(&self, url: &str) -> Result<()> {
		self.run("goto", self.client.goto(url)).await?;
		// Elements found on the previous page are stale now.
		self.elements.lock().clear();
		Ok(())
	}

	async fn find(&self, by: &By) -> Result<ElementHandle> {
		let locator = match by {
			By::Css(s) => Locator::Css(s),
			By::Id(s) => Locator::Id(s),
			By::XPath(s) => Locator::XPath(s),
			By::LinkText(s) => Locator::LinkText(s),
		};
		let element = self.run("find element", self.client.find(locator)).await?;
		let id = self.next_element.fetch_add(1, Ordering::Relaxed);
		self.elements.lock().insert(id, element);
		Ok(ElementHandle(id))
	}

	async fn click(&self, element: ElementHandle) -> Result<()> {
		let element = self.element(element)?;
		self.run("click", element.click()).await
	}

	async fn send_keys(&self, element: ElementHandle, text: &str) -> Result<()> {
		let element = self.element(element)?;
		self.run("send keys", element.send_keys(text)).await
	}

	async fn clear(&self, element: ElementHandle) -> Result<()> {
		let element = self.element(element)?;
		self.run("clear", element.clear()).await
	}

	async fn screenshot(&self) -> Result<Vec<u8>> {
		self.run("screenshot", self.client.screenshot()).await
	}

	async fn window_handle(&self) -> Result<String> {
		Ok(self.run("window handle", self.client.window()).await?.into())
	}

	async fn window_handles(&self) -> Result<Vec<String>> {
		let handles = self.run("window handles", self.client.windows()).await?;
		Ok(handles.into_iter().map(String::from).collect())
	}

	async fn maximize_window(&self) -> Result<()> {
		self.run("maximize window", self.client.maximize_window()).await
	}

	async fn delete_all_cookies(&self) -> Result<()> {
		self.run("delete all cookies", self.client.delete_all_cookies()).await
	}

	async fn set_implicit_wait(&self, wait: Duration) -> Result<()> {
		let timeouts = TimeoutConfiguration::new(None, None, Some(wait));
		self.run("set timeouts", self.client.update_timeouts(timeouts)).await
	}

	async fn execute(&self, script: &str, args: Vec<Value>) -> Result<Value> {
		self.run("execute script", self.client.execute(script, args)).await
	}

	async fn close(self: Box<Self>) -> Result<()> {
		let RemoteSession {
			client,
			command_timeout,
			driver_process,
			..
		} = *self;

		let result = match tokio::time::timeout(command_timeout, client.close()).await {
			Ok(result) => result.map_err(Error::from),
			Err(_) => Err(Error::Timeout {
				waited: command_timeout,
				message: "webdriver command `close`".to_string(),
			}),
		};

		if let Some(mut process) = driver_process {
			if let Err(err) = process.kill().await {
				warn!(target = "specdrive.driver", error = %err, "failed to stop driver process");
			}
		}
		debug!(target = "specdrive.driver", ok = result.is_ok(), "session closed");
		result
	}
}

#[cfg(test)]
mod tests {
	use fantoccini::ClientBuilder;
	use serde_json::json;
	use wiremock::matchers::{method, path};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	use super::*;
	use crate::error::ErrorKind;

	async fn hub() -> MockServer {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/session"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"value": { "sessionId": "abc", "capabilities": {} }
			})))
			.mount(&server)
			.await;
		Mock::given(method("DELETE"))
			.and(path("/session/abc"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": null })))
			.mount(&server)
			.await;
		server
	}

	async fn session(server: &MockServer) -> RemoteSession {
		let client = ClientBuilder::native().connect(&server.uri()).await.unwrap();
		RemoteSession::new(client, Duration::from_secs(5))
	}

	#[tokio::test]
	async fn navigation_forgets_elements_from_the_previous_page() {
		let server = hub().await;
		Mock::given(method("POST"))
			.and(path("/session/abc/element"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"value": { "element-6066-11e4-a52e-4f735466cecf": "e-1" }
			})))
			.mount(&server)
			.await;
		Mock::given(method("GET"))
			.and(path("/session/abc/url"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": "https://shop.example/" })))
			.mount(&server)
			.await;
		Mock::given(method("POST"))
			.and(path("/session/abc/url"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": null })))
			.mount(&server)
			.await;

		let session = session(&server).await;
		let handle = session.find(&By::css("#basket")).await.unwrap();
		assert_eq!(session.elements.lock().len(), 1);

		session.goto("/checkout").await.unwrap();

		assert!(session.elements.lock().is_empty());
		let err = session.click(handle).await.unwrap_err();
		assert_eq!(err.kind(), ErrorKind::TransientProtocol);
	}

	#[cfg(target_os = "linux")]
	#[tokio::test]
	async fn close_stops_the_owned_driver_process() {
		let server = hub().await;
		let child = tokio::process::Command::new("sleep")
			.arg("30")
			.kill_on_drop(true)
			.spawn()
			.unwrap();
		let pid = child.id().unwrap();
		let process = DriverProcess::from_child(child, 0, "sleep".into());

		let session = Box::new(session(&server).await.with_driver_process(process));
		session.close().await.unwrap();

		let requests = server.received_requests().await.unwrap();
		assert!(requests.iter().any(|r| r.method.as_str() == "DELETE" && r.url.path() == "/session/abc"));
		assert!(!std::path::Path::new(&format!("/proc/{pid}")).exists(), "driver {pid} still running");
	}
}
