//! Scenario hooks: what a BDD runner calls before and after every scenario.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;

use futures_util::FutureExt;
use tracing::{info, warn};

use crate::config::HarnessConfig;
use crate::driver::{SessionLauncher, WebDriverLauncher};
use crate::error::Result;
use crate::factory::{ActiveSession, SessionFactory};
use crate::finalizer::Finalizer;
use crate::grid::{HubStatusClient, NodeStatusSource};
use crate::lab::{JobAccounting, LabClient};
use crate::resolver::{overrides_declared, resolve};
use crate::scenario::{ScenarioContext, ScenarioInfo};
use crate::types::Outcome;

/// Store key for the window the session opened with.
pub const INITIAL_WINDOW_HANDLE_KEY: &str = "InitialWindowHandle";

/// Result of [`Harness::run_scenario`].
#[derive(Debug)]
pub struct ScenarioReport<T> {
	pub outcome: Outcome,
	/// Step output, present only when the steps ran and succeeded.
	pub value: Option<T>,
	pub error: Option<String>,
	/// Rendered diagnostic log.
	pub log: String,
}

/// Session lifecycle around scenarios.
pub struct Harness {
	config: HarnessConfig,
	launcher: Arc<dyn SessionLauncher>,
	node_source: Arc<dyn NodeStatusSource>,
	accounting: Option<Arc<dyn JobAccounting>>,
}

impl Harness {
	pub fn new(config: HarnessConfig, launcher: Arc<dyn SessionLauncher>, node_source: Arc<dyn NodeStatusSource>) -> Self {
		Self {
			config,
			launcher,
			node_source,
			accounting: None,
		}
	}

	/// Wires the real WebDriver launcher, hub client and, when credentials are
	/// configured, the lab accounting client.
	pub fn from_config(config: HarnessConfig) -> Result<Self> {
		let node_source = Arc::new(HubStatusClient::new(&config.grid.hub_url)?);
		let accounting: Option<Arc<dyn JobAccounting>> =
			if config.lab.username.is_empty() || config.lab.access_key.is_empty() {
				None
			} else {
				Some(Arc::new(LabClient::from_config(&config.lab)?))
			};

		let mut harness = Self::new(config, Arc::new(WebDriverLauncher), node_source);
		harness.accounting = accounting;
		Ok(harness)
	}

	pub fn with_accounting(mut self, accounting: Arc<dyn JobAccounting>) -> Self {
		self.accounting = Some(accounting);
		self
	}

	pub fn config(&self) -> &HarnessConfig {
		&self.config
	}

	/// Resolves the backend and builds the scenario's session.
	///
	/// A construction failure is recorded as the scenario error; no session is
	/// left open.
	pub async fn before_scenario(&self, ctx: &ScenarioContext) -> Result<ActiveSession> {
		let built = self.build_session(ctx).await;
		if let Err(err) = &built {
			warn!(target = "specdrive.hooks", scenario = %ctx.info.title, error = %err, "session construction failed");
			ctx.record_error(err.to_string());
		}
		built
	}

	async fn build_session(&self, ctx: &ScenarioContext) -> Result<ActiveSession> {
		let browser = self.config.browser_identity()?;
		let declared = self.config.declared_backend.as_str();
		let backend = resolve(declared, &browser)?;
		if overrides_declared(declared, backend) {
			ctx.log().add(format!(
				"Browser '{}' only runs in the cloud lab; ignoring execution environment '{declared}'",
				browser.family
			));
		}

		let factory = SessionFactory::new(&self.config, self.launcher.as_ref(), self.node_source.as_ref(), ctx);
		let session = factory.build(backend, &browser).await?;

		match session.window_handle().await {
			Ok(handle) => ctx.store().set(INITIAL_WINDOW_HANDLE_KEY, handle),
			Err(err) => warn!(target = "specdrive.hooks", error = %err, "could not read initial window handle"),
		}
		Ok(session)
	}

	/// Finalizes the session and renders the diagnostic report.
	///
	/// The report is always produced, even when closing the session failed.
	pub async fn after_scenario(&self, ctx: &ScenarioContext, session: Option<ActiveSession>) -> String {
		let finalizer = Finalizer::new(&self.config, self.accounting.as_deref(), ctx);
		if let Err(err) = finalizer.finalize(session).await {
			warn!(target = "specdrive.hooks", scenario = %ctx.info.title, error = %err, "session teardown failed");
			ctx.log().add(format!("Session could not be closed cleanly: {err}"));
		}

		let report = ctx.log().render();
		info!(
			target = "specdrive.report",
			scenario = %ctx.info.title,
			outcome = %ctx.outcome(),
			"\n{report}"
		);
		report
	}

	/// Runs `steps` between the two hooks.
	///
	/// Step errors and panics are recorded as the scenario error; the session
	/// is finalized on every path.
	pub async fn run_scenario<T>(
		&self,
		info: ScenarioInfo,
		steps: impl for<'s> FnOnce(&'s ScenarioContext, &'s ActiveSession) -> Pin<Box<dyn Future<Output = Result<T>> + Send + 's>>,
	) -> ScenarioReport<T> {
		let ctx = ScenarioContext::new(info);
		let session = self.before_scenario(&ctx).await.ok();

		let mut value = None;
		if let Some(session) = &session {
			match AssertUnwindSafe(steps(&ctx, session)).catch_unwind().await {
				Ok(Ok(v)) => value = Some(v),
				Ok(Err(err)) => ctx.record_error(err.to_string()),
				Err(panic) => ctx.record_error(panic_message(panic.as_ref())),
			}
		}

		let log = self.after_scenario(&ctx, session).await;
		ScenarioReport {
			outcome: ctx.outcome(),
			value,
			error: ctx.test_error(),
			log,
		}
	}
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
	if let Some(msg) = payload.downcast_ref::<&str>() {
		format!("step panicked: {msg}")
	} else if let Some(msg) = payload.downcast_ref::<String>() {
		format!("step panicked: {msg}")
	} else {
		"step panicked".to_string()
	}
}
