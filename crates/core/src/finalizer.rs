//! End-of-scenario teardown, one strategy per backend.
//!
//! Diagnostic sub-steps (final URL, screenshot, accounting enrichment) are
//! isolated: each failure is logged and the next step still runs. Closing the
//! session is never skipped, and its result is the only error returned.

use tracing::{debug, warn};

use crate::config::HarnessConfig;
use crate::error::{ErrorKind, Result};
use crate::factory::ActiveSession;
use crate::lab::{JobAccounting, report_link};
use crate::scenario::ScenarioContext;
use crate::screenshot::save_failure_screenshot;
use crate::timeouts;
use crate::types::{Backend, Outcome};
use crate::wait::{PollOptions, poll};

pub const DRIVER_DIED_MESSAGE: &str =
	"The driver had died before the test ended. No debug information could be extracted.";
pub const JOB_TIMEOUT_MESSAGE: &str =
	"Timed out waiting for the Saucelabs job to finish. This normally means that the connection has been lost.";

pub struct Finalizer<'a> {
	config: &'a HarnessConfig,
	accounting: Option<&'a dyn JobAccounting>,
	scenario: &'a ScenarioContext,
}

impl<'a> Finalizer<'a> {
	pub fn new(config: &'a HarnessConfig, accounting: Option<&'a dyn JobAccounting>, scenario: &'a ScenarioContext) -> Self {
		Self {
			config,
			accounting,
			scenario,
		}
	}

	/// Tears down the scenario's session, if one was ever built.
	pub async fn finalize(&self, session: Option<ActiveSession>) -> Result<()> {
		let Some(session) = session else {
			self.scenario.log().add(DRIVER_DIED_MESSAGE);
			return Ok(());
		};

		let outcome = self.scenario.outcome();
		debug!(target = "specdrive.finalizer", backend = %session.backend, %outcome, "finalizing session");

		self.log_final_url(&session).await;

		match session.backend {
			Backend::Local | Backend::SharedGrid => self.finalize_with_screenshot(session, outcome).await,
			Backend::CloudLab => self.finalize_cloud_lab(session, outcome).await,
		}
	}

	async fn log_final_url(&self, session: &ActiveSession) {
		let message = match session.current_url().await {
			Ok(url) => format!("Final URL at tear down: {url}"),
			Err(err) => match err.kind() {
				ErrorKind::UnexpectedAlert => {
					"Could not obtain the final URL due to an unexpected Alert being present".to_string()
				}
				ErrorKind::InvalidSession => {
					"Could not obtain the final URL as the driver has already been torn down.".to_string()
				}
				_ => format!("Could not obtain the final URL due to an unexpected exception: {err}"),
			},
		};
		self.scenario.log().add(message);
	}

	async fn finalize_with_screenshot(&self, session: ActiveSession, outcome: Outcome) -> Result<()> {
		if outcome.is_failed() {
			if let Some(node) = &session.grid_node {
				self.scenario.log().add(format!("Failure occurred on Grid Node: '{node}'"));
			}
			self.capture_screenshot(&session).await;
		}
		session.close().await
	}

	async fn capture_screenshot(&self, session: &ActiveSession) {
		match save_failure_screenshot(session.driver(), &self.config.screenshot_dir).await {
			Ok(path) => self
				.scenario
				.log()
				.add(format!("Error screenshot created: {}", path.display())),
			Err(err) => {
				warn!(target = "specdrive.finalizer", error = %err, "failure screenshot not captured");
				self.scenario.log().add(err.to_string());
			}
		}
	}

	async fn finalize_cloud_lab(&self, session: ActiveSession, outcome: Outcome) -> Result<()> {
		let job_id = session.lab_job.clone();

		// The lab only completes a job once its controlling session has gone.
		let closed = session.close().await;
		if let Err(err) = &closed {
			warn!(target = "specdrive.finalizer", error = %err, "closing cloud lab session failed");
		}

		let (Some(accounting), Some(job_id)) = (self.accounting, job_id) else {
			warn!(target = "specdrive.lab", "no job accounting available; skipping job update");
			return closed;
		};

		self.wait_for_job(accounting, &job_id).await;
		self.accounting_step("mark the job public", accounting.set_job_public(&job_id).await);

		match outcome {
			Outcome::Failed => {
				self.accounting_step("mark the job failed", accounting.set_job_pass_status(&job_id, false).await);
				match accounting.get_job(&job_id).await {
					Ok(job) => {
						if job.recorded_error().is_none() {
							if let Some(error) = self.scenario.test_error() {
								self.accounting_step("attach the scenario error", accounting.set_error(&job_id, &error).await);
							}
						}
						self.scenario.log().add(job.debug_info());
					}
					Err(err) => self.accounting_step("fetch the job", Err(err)),
				}
			}
			Outcome::Passed => {
				self.accounting_step("mark the job passed", accounting.set_job_pass_status(&job_id, true).await);
				self.scenario.log().add(format!("Report: {}", report_link(&job_id)));
			}
		}

		closed
	}

	async fn wait_for_job(&self, accounting: &dyn JobAccounting, job_id: &str) {
		let options = PollOptions::new(self.config.lab.job_completion_timeout, timeouts::JOB_COMPLETION_INTERVAL)
			.with_message("cloud lab job completion");
		let completed = poll(&options, move || async move {
			accounting.is_job_complete(job_id).await.unwrap_or_else(|err| {
				debug!(target = "specdrive.lab", error = %err, "job status check failed");
				false
			})
		})
		.await;

		if completed.is_err() {
			self.scenario.log().add(JOB_TIMEOUT_MESSAGE);
		}
	}

	fn accounting_step(&self, action: &str, result: Result<()>) {
		if let Err(err) = result {
			warn!(target = "specdrive.lab", action, error = %err, "job accounting call failed");
			self.scenario
				.log()
				.add(format!("Could not {action} in the cloud lab: {err}"));
		}
	}
}
