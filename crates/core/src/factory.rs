//! Session construction, one strategy per backend.

use std::fmt;
use std::ops::Deref;

use tracing::{debug, info, warn};

use crate::capabilities::{self, Capabilities};
use crate::config::HarnessConfig;
use crate::driver::{BrowserSession, LocalLaunch, SessionLauncher};
use crate::error::{Error, Result};
use crate::events::EventMirror;
use crate::grid::{GridNode, NodeStatusSource, lookup_node};
use crate::scenario::ScenarioContext;
use crate::types::{Backend, BrowserFamily, BrowserIdentity};

/// The one live session of a scenario.
///
/// Dereferences to the underlying [`BrowserSession`] for step code. Only the
/// finalizer closes it.
pub struct ActiveSession {
	driver: Box<dyn BrowserSession>,
	pub backend: Backend,
	pub browser: BrowserIdentity,
	pub session_id: Option<String>,
	/// Node that accepted a grid session.
	pub grid_node: Option<GridNode>,
	/// Lab job identity; equal to the session id.
	pub lab_job: Option<String>,
}

impl ActiveSession {
	pub fn new(driver: Box<dyn BrowserSession>, backend: Backend, browser: BrowserIdentity) -> Self {
		Self {
			driver,
			backend,
			browser,
			session_id: None,
			grid_node: None,
			lab_job: None,
		}
	}

	pub fn driver(&self) -> &dyn BrowserSession {
		self.driver.as_ref()
	}

	pub async fn close(self) -> Result<()> {
		self.driver.close().await
	}
}

impl Deref for ActiveSession {
	type Target = dyn BrowserSession;

	fn deref(&self) -> &Self::Target {
		self.driver.as_ref()
	}
}

impl fmt::Debug for ActiveSession {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ActiveSession")
			.field("backend", &self.backend)
			.field("browser", &self.browser)
			.field("session_id", &self.session_id)
			.field("grid_node", &self.grid_node)
			.field("lab_job", &self.lab_job)
			.finish_non_exhaustive()
	}
}

/// Output of a backend strategy before the cross-cutting preparation.
struct Opened {
	driver: Box<dyn BrowserSession>,
	session_id: Option<String>,
	grid_node: Option<GridNode>,
	lab_job: Option<String>,
}

impl Opened {
	fn new(driver: Box<dyn BrowserSession>) -> Self {
		Self {
			driver,
			session_id: None,
			grid_node: None,
			lab_job: None,
		}
	}
}

/// Builds sessions for one scenario.
pub struct SessionFactory<'a> {
	config: &'a HarnessConfig,
	launcher: &'a dyn SessionLauncher,
	node_source: &'a dyn NodeStatusSource,
	scenario: &'a ScenarioContext,
}

impl<'a> SessionFactory<'a> {
	pub fn new(
		config: &'a HarnessConfig,
		launcher: &'a dyn SessionLauncher,
		node_source: &'a dyn NodeStatusSource,
		scenario: &'a ScenarioContext,
	) -> Self {
		Self {
			config,
			launcher,
			node_source,
			scenario,
		}
	}

	/// Opens and prepares a session on `backend`.
	///
	/// Either returns a live session or closes whatever it opened before
	/// returning the error.
	pub async fn build(&self, backend: Backend, browser: &BrowserIdentity) -> Result<ActiveSession> {
		let log = self.scenario.log();
		log.add(format!("Specifying browser type: '{}'", browser.family));
		log.add(format!("Specifying browser version: '{}'", browser.version));

		let opened = match backend {
			Backend::Local => self.open_local(browser.family).await?,
			Backend::SharedGrid => self.open_grid(browser.family).await?,
			Backend::CloudLab => self.open_cloud_lab(browser).await?,
		};

		let driver: Box<dyn BrowserSession> = if self.config.enable_logging {
			Box::new(EventMirror::new(opened.driver, log.clone()))
		} else {
			opened.driver
		};

		let session = ActiveSession {
			driver,
			backend,
			browser: browser.clone(),
			session_id: opened.session_id,
			grid_node: opened.grid_node,
			lab_job: opened.lab_job,
		};

		if let Err(err) = self.prepare(&session).await {
			warn!(target = "specdrive.factory", error = %err, "session preparation failed; closing session");
			if let Err(close_err) = session.close().await {
				warn!(target = "specdrive.factory", error = %close_err, "failed to close partially prepared session");
			}
			return Err(err);
		}

		info!(
			target = "specdrive.factory",
			%backend,
			browser = %browser,
			session_id = session.session_id.as_deref().unwrap_or("-"),
			"session ready"
		);
		Ok(session)
	}

	async fn prepare(&self, session: &ActiveSession) -> Result<()> {
		if session.backend != Backend::CloudLab {
			if session.browser.family.supports_resizing() {
				session.maximize_window().await?;
			}
			if let Err(err) = session.delete_all_cookies().await {
				debug!(target = "specdrive.factory", error = %err, "cookie clear rejected");
				self.scenario
					.log()
					.add("Could not delete all cookies! Are you testing on iOS?");
			}
		}
		session.set_implicit_wait(self.config.implicit_wait).await
	}

	async fn open_local(&self, family: BrowserFamily) -> Result<Opened> {
		let capabilities = capabilities::local(family, &self.config.local)?;
		let paths = &self.config.local;
		let driver = match family {
			BrowserFamily::Firefox => &paths.gecko_driver,
			BrowserFamily::Chrome => &paths.chrome_driver,
			BrowserFamily::InternetExplorer => &paths.ie_driver,
			other => return Err(Error::config(format!("no local strategy for {other}"))),
		};

		let launch = LocalLaunch {
			family,
			driver: driver.clone(),
			capabilities,
			startup_timeout: paths.startup_timeout,
			command_timeout: paths.command_timeout,
		};
		let driver = self
			.launcher
			.launch_local(&launch)
			.await
			.map_err(|e| Error::unavailable(Backend::Local, e))?;

		let session_id = driver.session_id().await.ok();
		Ok(Opened {
			session_id,
			..Opened::new(driver)
		})
	}

	async fn open_grid(&self, family: BrowserFamily) -> Result<Opened> {
		let host = local_host_name();
		let capabilities = capabilities::grid(family, &self.config.grid, &host)?;

		let driver = match self
			.launcher
			.open_remote(
				Backend::SharedGrid,
				&self.config.grid.hub_url,
				&capabilities,
				self.config.grid.command_timeout,
			)
			.await
		{
			Ok(driver) => driver,
			Err(err) => {
				self.log_failed_open(family, &capabilities);
				return Err(Error::unavailable(Backend::SharedGrid, err));
			}
		};

		let (session_id, node) = match driver.session_id().await {
			Ok(id) => {
				let node = lookup_node(self.node_source, &id).await;
				(Some(id), node)
			}
			Err(err) => {
				warn!(target = "specdrive.grid", error = %err, "session id unavailable; skipping node lookup");
				(None, GridNode::Unknown)
			}
		};
		self.scenario.log().add(format!("Grid Node: '{node}'"));

		Ok(Opened {
			session_id,
			grid_node: Some(node),
			..Opened::new(driver)
		})
	}

	async fn open_cloud_lab(&self, browser: &BrowserIdentity) -> Result<Opened> {
		let lab = &self.config.lab;
		let capabilities = capabilities::cloud_lab(browser, lab, &self.scenario.info)?;

		let driver = self
			.launcher
			.open_remote(Backend::CloudLab, &lab.hub_url, &capabilities, lab.command_timeout)
			.await
			.map_err(|e| Error::unavailable(Backend::CloudLab, e))?;

		// Without a job id the finalizer cannot account for the session.
		let job_id = match driver.session_id().await {
			Ok(id) => id,
			Err(err) => {
				if let Err(close_err) = driver.close().await {
					warn!(target = "specdrive.lab", error = %close_err, "failed to close session without job id");
				}
				return Err(Error::unavailable(Backend::CloudLab, err));
			}
		};
		debug!(target = "specdrive.lab", job_id = %job_id, "cloud lab job started");

		Ok(Opened {
			session_id: Some(job_id.clone()),
			lab_job: Some(job_id),
			..Opened::new(driver)
		})
	}

	fn log_failed_open(&self, family: BrowserFamily, capabilities: &Capabilities) {
		let log = self.scenario.log();
		log.add(format!(
			"Failed when attempting to initialise a {} browser on the Selenium Grid.",
			family.browser_name()
		));
		log.add(format!("Capabilities: {capabilities}"));
	}
}

/// Host name reported in the grid `environment` capability.
pub fn local_host_name() -> String {
	hostname::get()
		.map(|name| name.to_string_lossy().into_owned())
		.unwrap_or_else(|_| "unknown-host".to_string())
}

#[cfg(test)]
mod tests {
	use std::time::Duration;

	use super::*;
	use crate::error::ErrorKind;
	use crate::scenario::ScenarioInfo;
	use crate::testing::{Call, Journal, MockLauncher, MockSession, ScriptedNodeSource};

	const NODE_BODY: &str = r#"{"success":true,"proxyId":"http://node-3:5555"}"#;

	struct Fixture {
		config: HarnessConfig,
		journal: Journal,
		launcher: MockLauncher,
		nodes: ScriptedNodeSource,
		scenario: ScenarioContext,
	}

	impl Fixture {
		fn new(session: impl FnOnce(Journal) -> MockSession) -> Self {
			let journal = Journal::default();
			let launcher = MockLauncher::new(journal.clone(), session(journal.clone()));
			Self {
				config: HarnessConfig::default(),
				journal,
				launcher,
				nodes: ScriptedNodeSource::new([NODE_BODY]),
				scenario: ScenarioContext::new(ScenarioInfo::new("Search works").with_tags(["@search"])),
			}
		}

		fn failing(message: &str) -> Self {
			let mut fixture = Self::new(MockSession::new);
			fixture.launcher = MockLauncher::failing(fixture.journal.clone(), message);
			fixture
		}

		fn factory(&self) -> SessionFactory<'_> {
			SessionFactory::new(&self.config, &self.launcher, &self.nodes, &self.scenario)
		}

		fn messages(&self) -> Vec<String> {
			self.scenario.log().entries().into_iter().map(|e| e.message).collect()
		}
	}

	#[tokio::test]
	async fn grid_session_is_prepared_and_attributed_to_node() {
		let fx = Fixture::new(|j| MockSession::new(j).with_id("grid-1"));

		let session = fx
			.factory()
			.build(Backend::SharedGrid, &BrowserIdentity::latest(BrowserFamily::Chrome))
			.await
			.unwrap();

		assert_eq!(session.grid_node, Some(GridNode::Known("http://node-3:5555".into())));
		assert_eq!(session.session_id.as_deref(), Some("grid-1"));
		assert_eq!(
			fx.journal.calls(),
			vec![
				Call::OpenRemote(Backend::SharedGrid),
				Call::SessionId,
				Call::MaximizeWindow,
				Call::DeleteAllCookies,
				Call::SetImplicitWait(Duration::from_secs(10)),
			]
		);
		assert!(fx.messages().contains(&"Grid Node: 'http://node-3:5555'".to_string()));
		assert!(fx.messages().contains(&"Specifying browser type: 'Chrome'".to_string()));
		let caps = fx.launcher.last_capabilities().unwrap();
		assert_eq!(caps.get_str("platform"), Some("VISTA"));
	}

	#[tokio::test]
	async fn grid_keeps_its_queueing_timeout_while_lab_uses_configured_one() {
		let mut grid = Fixture::new(MockSession::new);
		grid.config.lab.command_timeout = Duration::from_secs(120);
		grid.config.local.command_timeout = Duration::from_secs(120);
		grid.factory()
			.build(Backend::SharedGrid, &BrowserIdentity::latest(BrowserFamily::Firefox))
			.await
			.unwrap();
		assert_eq!(grid.launcher.last_command_timeout(), Some(Duration::from_secs(900)));

		let mut lab = Fixture::new(MockSession::new);
		lab.config.lab.command_timeout = Duration::from_secs(120);
		lab.factory()
			.build(Backend::CloudLab, &BrowserIdentity::latest(BrowserFamily::Chrome))
			.await
			.unwrap();
		assert_eq!(lab.launcher.last_command_timeout(), Some(Duration::from_secs(120)));
	}

	#[tokio::test]
	async fn grid_open_failure_logs_capabilities_and_is_unavailable() {
		let fx = Fixture::failing("hub refused session");

		let err = fx
			.factory()
			.build(Backend::SharedGrid, &BrowserIdentity::latest(BrowserFamily::Firefox))
			.await
			.unwrap_err();

		assert_eq!(err.kind(), ErrorKind::BackendUnavailable);
		let messages = fx.messages();
		assert!(messages.contains(&"Failed when attempting to initialise a firefox browser on the Selenium Grid.".to_string()));
		assert!(messages.iter().any(|m| m.starts_with("Capabilities: ") && m.contains("\"environment\"")));
		assert_eq!(fx.journal.count(&Call::Close), 0);
	}

	#[tokio::test]
	async fn cloud_lab_skips_window_and_cookie_preparation() {
		let fx = Fixture::new(|j| MockSession::new(j).with_id("job-42"));

		let session = fx
			.factory()
			.build(Backend::CloudLab, &BrowserIdentity::latest(BrowserFamily::IPhone))
			.await
			.unwrap();

		assert_eq!(session.lab_job.as_deref(), Some("job-42"));
		assert_eq!(fx.journal.count(&Call::MaximizeWindow), 0);
		assert_eq!(fx.journal.count(&Call::DeleteAllCookies), 0);
		assert_eq!(fx.journal.count(&Call::SetImplicitWait(Duration::from_secs(10))), 1);
		let caps = fx.launcher.last_capabilities().unwrap();
		assert_eq!(caps.get_str("name"), Some("Search works"));
	}

	#[tokio::test]
	async fn cloud_lab_without_session_id_is_closed_and_fails() {
		let fx = Fixture::new(|j| MockSession::new(j).failing_session_id());

		let err = fx
			.factory()
			.build(Backend::CloudLab, &BrowserIdentity::latest(BrowserFamily::Chrome))
			.await
			.unwrap_err();

		assert_eq!(err.kind(), ErrorKind::BackendUnavailable);
		assert_eq!(fx.journal.count(&Call::Close), 1);
	}

	#[tokio::test]
	async fn unsupported_lab_version_fails_before_any_network_call() {
		let fx = Fixture::new(MockSession::new);

		let err = fx
			.factory()
			.build(Backend::CloudLab, &BrowserIdentity::new(BrowserFamily::Safari, "3"))
			.await
			.unwrap_err();

		assert_eq!(err.kind(), ErrorKind::Configuration);
		assert!(fx.journal.calls().is_empty());
	}

	#[tokio::test]
	async fn local_has_no_device_strategy() {
		let fx = Fixture::new(MockSession::new);

		let err = fx
			.factory()
			.build(Backend::Local, &BrowserIdentity::latest(BrowserFamily::Safari))
			.await
			.unwrap_err();

		assert_eq!(err.kind(), ErrorKind::Configuration);
		assert!(fx.journal.calls().is_empty());
	}

	#[tokio::test]
	async fn local_launch_uses_family_driver() {
		let fx = Fixture::new(MockSession::new);

		let session = fx
			.factory()
			.build(Backend::Local, &BrowserIdentity::latest(BrowserFamily::InternetExplorer))
			.await
			.unwrap();

		assert_eq!(session.backend, Backend::Local);
		assert_eq!(fx.journal.calls()[0], Call::LaunchLocal(BrowserFamily::InternetExplorer));
		let caps = fx.launcher.last_capabilities().unwrap();
		assert!(caps.contains("se:ieOptions"));
	}

	#[tokio::test]
	async fn cookie_failure_is_logged_not_fatal() {
		let fx = Fixture::new(|j| MockSession::new(j).failing_cookies());

		fx.factory()
			.build(Backend::Local, &BrowserIdentity::latest(BrowserFamily::Firefox))
			.await
			.unwrap();

		assert!(fx.messages().contains(&"Could not delete all cookies! Are you testing on iOS?".to_string()));
	}

	#[tokio::test]
	async fn preparation_failure_closes_the_session_once() {
		let fx = Fixture::new(|j| MockSession::new(j).failing_implicit_wait());

		let err = fx
			.factory()
			.build(Backend::SharedGrid, &BrowserIdentity::latest(BrowserFamily::Chrome))
			.await
			.unwrap_err();

		assert_eq!(err.kind(), ErrorKind::Command);
		assert_eq!(fx.journal.count(&Call::Close), 1);
	}

	#[tokio::test]
	async fn event_mirror_wraps_session_when_logging_enabled() {
		let mut fx = Fixture::new(MockSession::new);
		fx.config.enable_logging = true;

		let session = fx
			.factory()
			.build(Backend::Local, &BrowserIdentity::latest(BrowserFamily::Chrome))
			.await
			.unwrap();
		session.goto("https://example.test").await.unwrap();

		assert!(fx.messages().contains(&"Navigating to: https://example.test".to_string()));
	}
}
