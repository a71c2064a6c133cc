//! Cloud lab job accounting.

use async_trait::async_trait;
use serde::Serialize;
use specdrive_protocol::{JobUpdate, LabJob};
use tracing::debug;

use crate::config::CloudLabConfig;
use crate::error::{Error, Result};

const REPORT_BASE: &str = "https://saucelabs.com/jobs";

/// Link to the lab's dashboard page for `job_id`.
pub fn report_link(job_id: &str) -> String {
	format!("{REPORT_BASE}/{job_id}")
}

/// The lab's view of a session's job.
///
/// Only meaningful after the session has been closed: the lab does not mark a
/// job complete while its controlling session is still connected.
#[async_trait]
pub trait JobAccounting: Send + Sync {
	async fn is_job_complete(&self, job_id: &str) -> Result<bool>;

	async fn set_job_public(&self, job_id: &str) -> Result<()>;

	async fn set_job_pass_status(&self, job_id: &str, passed: bool) -> Result<()>;

	async fn get_job(&self, job_id: &str) -> Result<LabJob>;

	async fn set_error(&self, job_id: &str, message: &str) -> Result<()>;
}

/// REST client for `{api}/rest/v1/{username}/jobs/{job_id}`.
#[derive(Clone, Debug)]
pub struct LabClient {
	http: reqwest::Client,
	api_url: String,
	username: String,
	access_key: String,
}

impl LabClient {
	pub fn new(api_url: &str, username: impl Into<String>, access_key: impl Into<String>) -> Result<Self> {
		let http = reqwest::Client::builder()
			.timeout(std::time::Duration::from_secs(30))
			.build()?;
		Ok(Self {
			http,
			api_url: api_url.trim_end_matches('/').to_string(),
			username: username.into(),
			access_key: access_key.into(),
		})
	}

	pub fn from_config(config: &CloudLabConfig) -> Result<Self> {
		if config.username.is_empty() || config.access_key.is_empty() {
			return Err(Error::config("cloud lab username and access key are required"));
		}
		Self::new(&config.api_url, &config.username, &config.access_key)
	}

	fn job_url(&self, job_id: &str) -> String {
		format!("{}/rest/v1/{}/jobs/{job_id}", self.api_url, self.username)
	}

	async fn update<B: Serialize + Sync>(&self, job_id: &str, body: &B) -> Result<()> {
		let url = self.job_url(job_id);
		debug!(target = "specdrive.lab", url = %url, "updating job");
		self.http
			.put(&url)
			.basic_auth(&self.username, Some(&self.access_key))
			.json(body)
			.send()
			.await?
			.error_for_status()?;
		Ok(())
	}
}

#[async_trait]
impl JobAccounting for LabClient {
	async fn is_job_complete(&self, job_id: &str) -> Result<bool> {
		Ok(self.get_job(job_id).await?.is_complete())
	}

	async fn set_job_public(&self, job_id: &str) -> Result<()> {
		self.update(job_id, &JobUpdate::public()).await
	}

	async fn set_job_pass_status(&self, job_id: &str, passed: bool) -> Result<()> {
		self.update(job_id, &JobUpdate::passed(passed)).await
	}

	async fn get_job(&self, job_id: &str) -> Result<LabJob> {
		let url = self.job_url(job_id);
		let body = self
			.http
			.get(&url)
			.basic_auth(&self.username, Some(&self.access_key))
			.send()
			.await?
			.error_for_status()?
			.text()
			.await?;
		if body.trim().is_empty() {
			return Err(Error::EmptyResponse { endpoint: url });
		}
		serde_json::from_str(&body).map_err(|source| Error::MalformedResponse { endpoint: url, source })
	}

	async fn set_error(&self, job_id: &str, message: &str) -> Result<()> {
		self.update(job_id, &JobUpdate::error(message)).await
	}
}
