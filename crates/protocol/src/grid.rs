//! Grid hub test-session lookup payloads.
//!
//! `POST {hub}/grid/api/testsession?session={id}` answers with a small JSON
//! object. Only `proxyId` matters to the core; the rest is kept for logging.

use serde::{Deserialize, Serialize};

/// Response body of the hub's test-session endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSessionStatus {
	/// Address of the node hosting the session, e.g. `http://10.0.0.12:5555`.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub proxy_id: Option<String>,

	/// Whether the hub found the session.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub success: Option<bool>,

	/// Free-form hub message.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub msg: Option<String>,

	/// Echo of the queried session id.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub session: Option<String>,
}

impl TestSessionStatus {
	/// Returns the node address when present and non-blank.
	pub fn node(&self) -> Option<&str> {
		self.proxy_id.as_deref().map(str::trim).filter(|id| !id.is_empty())
	}
}
