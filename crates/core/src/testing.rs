//! Test doubles for the session, launcher, node lookup and lab accounting seams.
//!
//! All fakes share a [`Journal`] so tests can assert on the relative order of
//! calls across components, e.g. that a lab session is closed before the first
//! accounting request.
//!
//! ```ignore
//! use specdrive::testing::{Journal, MockLauncher, MockSession};
//!
//! let journal = Journal::default();
//! let launcher = MockLauncher::new(journal.clone(), MockSession::new(journal.clone()));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use specdrive_protocol::LabJob;

use crate::capabilities::Capabilities;
use crate::driver::{BrowserSession, By, ElementHandle, LocalLaunch, SessionLauncher};
use crate::error::{Error, ErrorKind, Result};
use crate::grid::NodeStatusSource;
use crate::lab::JobAccounting;
use crate::types::{Backend, BrowserFamily};

/// One observed call on a fake.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
	SessionId,
	CurrentUrl,
	Goto(String),
	Find(String),
	Click,
	SendKeys(String),
	Clear,
	Screenshot,
	WindowHandle,
	WindowHandles,
	MaximizeWindow,
	DeleteAllCookies,
	SetImplicitWait(Duration),
	Execute(String),
	Close,
	OpenRemote(Backend),
	LaunchLocal(BrowserFamily),
	IsJobComplete(String),
	SetJobPublic(String),
	SetJobPassStatus(String, bool),
	GetJob(String),
	SetError(String, String),
}

impl Call {
	pub fn is_accounting(&self) -> bool {
		matches!(
			self,
			Call::IsJobComplete(_) | Call::SetJobPublic(_) | Call::SetJobPassStatus(..) | Call::GetJob(_) | Call::SetError(..)
		)
	}
}

/// Shared, ordered record of calls.
#[derive(Clone, Debug, Default)]
pub struct Journal {
	calls: Arc<Mutex<Vec<Call>>>,
}

impl Journal {
	pub fn record(&self, call: Call) {
		self.calls.lock().push(call);
	}

	pub fn calls(&self) -> Vec<Call> {
		self.calls.lock().clone()
	}

	pub fn count(&self, call: &Call) -> usize {
		self.calls.lock().iter().filter(|c| *c == call).count()
	}

	pub fn position(&self, pred: impl Fn(&Call) -> bool) -> Option<usize> {
		self.calls.lock().iter().position(pred)
	}
}

/// Builds an error of the given kind for fakes to return.
pub fn error_of_kind(kind: ErrorKind, message: &str) -> Error {
	let message = message.to_string();
	match kind {
		ErrorKind::Configuration => Error::Configuration(message),
		ErrorKind::BackendUnavailable => Error::BackendUnavailable {
			backend: Backend::Local,
			message,
		},
		ErrorKind::Timeout => Error::Timeout {
			waited: Duration::ZERO,
			message,
		},
		ErrorKind::TransientProtocol => Error::TransientProtocol(message),
		ErrorKind::DiagnosticCapture => Error::DiagnosticCapture(message),
		ErrorKind::UnexpectedAlert => Error::UnexpectedAlert(message),
		ErrorKind::InvalidSession => Error::InvalidSession(message),
		ErrorKind::EmptyResponse => Error::EmptyResponse { endpoint: message },
		ErrorKind::MissingField => Error::MissingField {
			endpoint: message,
			field: "proxyId",
		},
		ErrorKind::Io => Error::Io(std::io::Error::other(message)),
		ErrorKind::Command | ErrorKind::MalformedResponse | ErrorKind::Http => Error::Command(message),
	}
}

const SCREENSHOT_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nfake-image";

/// Scriptable in-memory browser session.
#[derive(Clone, Debug)]
pub struct MockSession {
	journal: Journal,
	id: String,
	url: String,
	url_error: Option<ErrorKind>,
	fail_screenshot: bool,
	fail_session_id: bool,
	fail_cookies: bool,
	fail_implicit_wait: bool,
	fail_close: bool,
	next_element: Arc<AtomicU32>,
}

impl MockSession {
	pub fn new(journal: Journal) -> Self {
		Self {
			journal,
			id: "mock-session-1".to_string(),
			url: "about:blank".to_string(),
			url_error: None,
			fail_screenshot: false,
			fail_session_id: false,
			fail_cookies: false,
			fail_implicit_wait: false,
			fail_close: false,
			next_element: Arc::new(AtomicU32::new(1)),
		}
	}

	pub fn with_id(mut self, id: impl Into<String>) -> Self {
		self.id = id.into();
		self
	}

	pub fn with_url(mut self, url: impl Into<String>) -> Self {
		self.url = url.into();
		self
	}

	pub fn failing_url(mut self, kind: ErrorKind) -> Self {
		self.url_error = Some(kind);
		self
	}

	pub fn failing_screenshot(mut self) -> Self {
		self.fail_screenshot = true;
		self
	}

	pub fn failing_session_id(mut self) -> Self {
		self.fail_session_id = true;
		self
	}

	pub fn failing_cookies(mut self) -> Self {
		self.fail_cookies = true;
		self
	}

	pub fn failing_implicit_wait(mut self) -> Self {
		self.fail_implicit_wait = true;
		self
	}

	pub fn failing_close(mut self) -> Self {
		self.fail_close = true;
		self
	}

	pub fn screenshot_bytes(&self) -> Vec<u8> {
		SCREENSHOT_BYTES.to_vec()
	}
}

#[async_trait]
impl BrowserSession for MockSession {
	async fn session_id(&self) -> Result<String> {
		self.journal.record(Call::SessionId);
		if self.fail_session_id {
			return Err(Error::InvalidSession("session id unavailable".into()));
		}
		Ok(self.id.clone())
	}

	async fn current_url(&self) -> Result<String> {
		self.journal.record(Call::CurrentUrl);
		match self.url_error {
			Some(kind) => Err(error_of_kind(kind, "current url failed")),
			None => Ok(self.url.clone()),
		}
	}

	async fn goto(&self, url: &str) -> Result<()> {
		self.journal.record(Call::Goto(url.to_string()));
		Ok(())
	}

	async fn find(&self, by: &By) -> Result<ElementHandle> {
		self.journal.record(Call::Find(by.to_string()));
		Ok(ElementHandle(u64::from(self.next_element.fetch_add(1, Ordering::Relaxed))))
	}

	async fn click(&self, _element: ElementHandle) -> Result<()> {
		self.journal.record(Call::Click);
		Ok(())
	}

	async fn send_keys(&self, _element: ElementHandle, text: &str) -> Result<()> {
		self.journal.record(Call::SendKeys(text.to_string()));
		Ok(())
	}

	async fn clear(&self, _element: ElementHandle) -> Result<()> {
		self.journal.record(Call::Clear);
		Ok(())
	}

	async fn screenshot(&self) -> Result<Vec<u8>> {
		self.journal.record(Call::Screenshot);
		if self.fail_screenshot {
			return Err(Error::InvalidSession("node disconnected".into()));
		}
		Ok(self.screenshot_bytes())
	}

	async fn window_handle(&self) -> Result<String> {
		self.journal.record(Call::WindowHandle);
		Ok("window-1".to_string())
	}

	async fn window_handles(&self) -> Result<Vec<String>> {
		self.journal.record(Call::WindowHandles);
		Ok(vec!["window-1".to_string()])
	}

	async fn maximize_window(&self) -> Result<()> {
		self.journal.record(Call::MaximizeWindow);
		Ok(())
	}

	async fn delete_all_cookies(&self) -> Result<()> {
		self.journal.record(Call::DeleteAllCookies);
		if self.fail_cookies {
			return Err(Error::Command("unknown command: deleteAllCookies".into()));
		}
		Ok(())
	}

	async fn set_implicit_wait(&self, wait: Duration) -> Result<()> {
		self.journal.record(Call::SetImplicitWait(wait));
		if self.fail_implicit_wait {
			return Err(Error::Command("timeouts rejected".into()));
		}
		Ok(())
	}

	async fn execute(&self, script: &str, _args: Vec<Value>) -> Result<Value> {
		self.journal.record(Call::Execute(script.to_string()));
		Ok(Value::Null)
	}

	async fn close(self: Box<Self>) -> Result<()> {
		self.journal.record(Call::Close);
		if self.fail_close {
			return Err(Error::InvalidSession("session already deleted".into()));
		}
		Ok(())
	}
}

/// Launcher handing out clones of a template [`MockSession`].
#[derive(Debug)]
pub struct MockLauncher {
	journal: Journal,
	session: MockSession,
	failure: Option<String>,
	last_capabilities: Mutex<Option<Capabilities>>,
	last_hub: Mutex<Option<String>>,
	last_command_timeout: Mutex<Option<Duration>>,
}

impl MockLauncher {
	pub fn new(journal: Journal, session: MockSession) -> Self {
		Self {
			journal,
			session,
			failure: None,
			last_capabilities: Mutex::new(None),
			last_hub: Mutex::new(None),
			last_command_timeout: Mutex::new(None),
		}
	}

	/// Every open fails as the remote end refusing the session.
	pub fn failing(journal: Journal, message: impl Into<String>) -> Self {
		let session = MockSession::new(journal.clone());
		Self {
			failure: Some(message.into()),
			..Self::new(journal, session)
		}
	}

	pub fn last_capabilities(&self) -> Option<Capabilities> {
		self.last_capabilities.lock().clone()
	}

	pub fn last_hub(&self) -> Option<String> {
		self.last_hub.lock().clone()
	}

	/// Command timeout passed to the most recent open, remote or local.
	pub fn last_command_timeout(&self) -> Option<Duration> {
		*self.last_command_timeout.lock()
	}

	fn open(&self, backend: Backend, capabilities: &Capabilities) -> Result<Box<dyn BrowserSession>> {
		*self.last_capabilities.lock() = Some(capabilities.clone());
		match &self.failure {
			Some(message) => Err(Error::BackendUnavailable {
				backend,
				message: message.clone(),
			}),
			None => Ok(Box::new(self.session.clone())),
		}
	}
}

#[async_trait]
impl SessionLauncher for MockLauncher {
	async fn open_remote(
		&self,
		backend: Backend,
		hub_url: &str,
		capabilities: &Capabilities,
		command_timeout: Duration,
	) -> Result<Box<dyn BrowserSession>> {
		self.journal.record(Call::OpenRemote(backend));
		*self.last_hub.lock() = Some(hub_url.to_string());
		*self.last_command_timeout.lock() = Some(command_timeout);
		self.open(backend, capabilities)
	}

	async fn launch_local(&self, launch: &LocalLaunch) -> Result<Box<dyn BrowserSession>> {
		self.journal.record(Call::LaunchLocal(launch.family));
		*self.last_command_timeout.lock() = Some(launch.command_timeout);
		self.open(Backend::Local, &launch.capabilities)
	}
}

/// Lab accounting fake.
#[derive(Debug)]
pub struct MockAccounting {
	journal: Journal,
	complete_after: Option<u32>,
	polls: AtomicU32,
	job: LabJob,
	fail_public: bool,
}

impl MockAccounting {
	/// Job reports complete on the first poll.
	pub fn new(journal: Journal) -> Self {
		Self {
			journal,
			complete_after: Some(1),
			polls: AtomicU32::new(0),
			job: LabJob::default(),
			fail_public: false,
		}
	}

	/// Job reports complete on poll number `polls`.
	pub fn complete_after(mut self, polls: u32) -> Self {
		self.complete_after = Some(polls);
		self
	}

	pub fn never_complete(mut self) -> Self {
		self.complete_after = None;
		self
	}

	pub fn with_job(mut self, job: LabJob) -> Self {
		self.job = job;
		self
	}

	pub fn failing_public(mut self) -> Self {
		self.fail_public = true;
		self
	}

	pub fn polls(&self) -> u32 {
		self.polls.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl JobAccounting for MockAccounting {
	async fn is_job_complete(&self, job_id: &str) -> Result<bool> {
		self.journal.record(Call::IsJobComplete(job_id.to_string()));
		let n = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
		Ok(self.complete_after.is_some_and(|after| n >= after))
	}

	async fn set_job_public(&self, job_id: &str) -> Result<()> {
		self.journal.record(Call::SetJobPublic(job_id.to_string()));
		if self.fail_public {
			return Err(Error::Command("lab api unavailable".into()));
		}
		Ok(())
	}

	async fn set_job_pass_status(&self, job_id: &str, passed: bool) -> Result<()> {
		self.journal.record(Call::SetJobPassStatus(job_id.to_string(), passed));
		Ok(())
	}

	async fn get_job(&self, job_id: &str) -> Result<LabJob> {
		self.journal.record(Call::GetJob(job_id.to_string()));
		Ok(LabJob {
			id: job_id.to_string(),
			..self.job.clone()
		})
	}

	async fn set_error(&self, job_id: &str, message: &str) -> Result<()> {
		self.journal.record(Call::SetError(job_id.to_string(), message.to_string()));
		Ok(())
	}
}

/// Node status source replaying scripted bodies; the last body repeats.
#[derive(Debug)]
pub struct ScriptedNodeSource {
	bodies: Vec<String>,
	failure: Option<String>,
	calls: AtomicUsize,
}

impl ScriptedNodeSource {
	pub fn new<I, S>(bodies: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self {
			bodies: bodies.into_iter().map(Into::into).collect(),
			failure: None,
			calls: AtomicUsize::new(0),
		}
	}

	/// Every fetch fails with a non-retryable transport error.
	pub fn failing(message: impl Into<String>) -> Self {
		Self {
			bodies: Vec::new(),
			failure: Some(message.into()),
			calls: AtomicUsize::new(0),
		}
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl NodeStatusSource for ScriptedNodeSource {
	fn endpoint(&self, session_id: &str) -> String {
		format!("scripted://grid/api/testsession?session={session_id}")
	}

	async fn fetch(&self, _session_id: &str) -> Result<String> {
		let n = self.calls.fetch_add(1, Ordering::SeqCst);
		if let Some(message) = &self.failure {
			return Err(Error::Command(message.clone()));
		}
		Ok(self
			.bodies
			.get(n)
			.or_else(|| self.bodies.last())
			.cloned()
			.unwrap_or_default())
	}
}
