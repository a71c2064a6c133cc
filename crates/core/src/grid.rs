//! Resolving which grid node accepted a session.
//!
//! Node attribution is diagnostic only: lookup failures degrade to
//! [`GridNode::Unknown`] and never fail the session build.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use specdrive_protocol::TestSessionStatus;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::wait::{RetryPolicy, retry};

/// Reported in place of a node id when lookup fails.
pub const UNKNOWN_NODE: &str = "COULD_NOT_CONNECT";

const HUB_PATH_SUFFIX: &str = "/wd/hub";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GridNode {
	Known(String),
	Unknown,
}

impl GridNode {
	pub fn as_str(&self) -> &str {
		match self {
			GridNode::Known(id) => id,
			GridNode::Unknown => UNKNOWN_NODE,
		}
	}

	pub fn is_known(&self) -> bool {
		matches!(self, GridNode::Known(_))
	}
}

impl fmt::Display for GridNode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Source of raw hub test-session responses.
#[async_trait]
pub trait NodeStatusSource: Send + Sync {
	/// Where the status for `session_id` is requested from, for error context.
	fn endpoint(&self, session_id: &str) -> String;

	/// Raw response body for `session_id`.
	async fn fetch(&self, session_id: &str) -> Result<String>;
}

/// `POST {hub root}/grid/api/testsession?session={id}` over HTTP.
#[derive(Clone, Debug)]
pub struct HubStatusClient {
	http: reqwest::Client,
	hub_root: String,
}

impl HubStatusClient {
	pub fn new(hub_url: &str) -> Result<Self> {
		let http = reqwest::Client::builder().timeout(Duration::from_secs(30)).build()?;
		Ok(Self {
			http,
			hub_root: hub_root(hub_url),
		})
	}
}

/// Strips the WebDriver path from a hub URL.
pub fn hub_root(hub_url: &str) -> String {
	let trimmed = hub_url.trim_end_matches('/');
	trimmed.strip_suffix(HUB_PATH_SUFFIX).unwrap_or(trimmed).to_string()
}

#[async_trait]
impl NodeStatusSource for HubStatusClient {
	fn endpoint(&self, session_id: &str) -> String {
		format!("{}/grid/api/testsession?session={session_id}", self.hub_root)
	}

	async fn fetch(&self, session_id: &str) -> Result<String> {
		let response = self
			.http
			.post(self.endpoint(session_id))
			.header(reqwest::header::CONTENT_TYPE, "application/json")
			.send()
			.await?
			.error_for_status()?;
		Ok(response.text().await?)
	}
}

/// Extracts the node id from a hub response body.
pub fn parse_node(endpoint: &str, body: &str) -> Result<String> {
	let body = body.trim();
	if body.is_empty() || body == "null" {
		return Err(Error::EmptyResponse {
			endpoint: endpoint.to_string(),
		});
	}
	let status: TestSessionStatus = serde_json::from_str(body).map_err(|source| Error::MalformedResponse {
		endpoint: endpoint.to_string(),
		source,
	})?;
	status.node().map(str::to_string).ok_or_else(|| Error::MissingField {
		endpoint: endpoint.to_string(),
		field: "proxyId",
	})
}

/// Resolves the node hosting `session_id` with [`RetryPolicy::grid_node_lookup`].
pub async fn lookup_node(source: &dyn NodeStatusSource, session_id: &str) -> GridNode {
	lookup_node_with(source, session_id, &RetryPolicy::grid_node_lookup()).await
}

pub async fn lookup_node_with(source: &dyn NodeStatusSource, session_id: &str, policy: &RetryPolicy) -> GridNode {
	let result = retry(policy, move || async move {
		let endpoint = source.endpoint(session_id);
		let body = source.fetch(session_id).await?;
		parse_node(&endpoint, &body)
	})
	.await;

	match result {
		Ok(node) => {
			debug!(target = "specdrive.grid", session_id, node = %node, "resolved grid node");
			GridNode::Known(node)
		}
		Err(err) => {
			warn!(target = "specdrive.grid", session_id, error = %err, "could not resolve grid node");
			GridNode::Unknown
		}
	}
}
