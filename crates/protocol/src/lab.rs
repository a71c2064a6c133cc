//! Cloud lab job records and updates.
//!
//! The lab keeps one job per remote session under
//! `/rest/v1/{username}/jobs/{job_id}`. Reads return a [`LabJob`]; writes send
//! a sparse [`JobUpdate`].

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Job status reported once the controlling session has disconnected.
pub const JOB_STATUS_COMPLETE: &str = "complete";

/// Accounting record for one lab session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabJob {
	/// Job identity, equal to the WebDriver session id. Some lab
	/// endpoints omit it from the body.
	#[serde(default)]
	pub id: String,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,

	/// Lifecycle status: `new`, `in progress`, `complete`, `error`.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub status: Option<String>,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub passed: Option<bool>,

	/// Error recorded by the lab or attached by the harness.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub browser: Option<String>,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub browser_version: Option<String>,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub os: Option<String>,

	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub tags: Vec<String>,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub log_url: Option<String>,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub video_url: Option<String>,

	/// Lab-side metadata attached through [`JobUpdate::custom_data`].
	#[serde(rename = "custom-data", default, skip_serializing_if = "Option::is_none")]
	pub custom_data: Option<Value>,
}

impl LabJob {
	/// Returns true once the lab considers the job finished.
	pub fn is_complete(&self) -> bool {
		self.status.as_deref() == Some(JOB_STATUS_COMPLETE)
	}

	/// Returns the recorded error, treating blank strings as absent.
	pub fn recorded_error(&self) -> Option<&str> {
		self.error
			.as_deref()
			.or_else(|| self.custom_data.as_ref().and_then(|data| data.get("error")).and_then(Value::as_str))
			.filter(|msg| !msg.trim().is_empty())
	}

	/// Renders a multi-line summary for the scenario report.
	pub fn debug_info(&self) -> String {
		let mut out = format!("Job {}", self.id);
		let fields = [
			("name", self.name.as_deref()),
			("status", self.status.as_deref()),
			("browser", self.browser.as_deref()),
			("browser version", self.browser_version.as_deref()),
			("os", self.os.as_deref()),
			("error", self.recorded_error()),
			("log", self.log_url.as_deref()),
			("video", self.video_url.as_deref()),
		];
		for (label, value) in fields {
			if let Some(value) = value {
				let _ = write!(out, "\n       {label}: {value}");
			}
		}
		if let Some(passed) = self.passed {
			let _ = write!(out, "\n       passed: {passed}");
		}
		if !self.tags.is_empty() {
			let _ = write!(out, "\n       tags: {}", self.tags.join(", "));
		}
		out
	}
}

/// Sparse job update sent with `PUT`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobUpdate {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub public: Option<bool>,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub passed: Option<bool>,

	#[serde(rename = "custom-data", default, skip_serializing_if = "Option::is_none")]
	pub custom_data: Option<Value>,
}

impl JobUpdate {
	/// Makes the job visible without authentication.
	pub fn public() -> Self {
		Self {
			public: Some(true),
			..Self::default()
		}
	}

	/// Records the pass/fail verdict.
	pub fn passed(passed: bool) -> Self {
		Self {
			passed: Some(passed),
			..Self::default()
		}
	}

	/// Attaches an error message to the job metadata.
	pub fn error(message: impl Into<String>) -> Self {
		Self {
			custom_data: Some(serde_json::json!({ "error": message.into() })),
			..Self::default()
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn job_completion_follows_status_field() {
		let job: LabJob = serde_json::from_str(r#"{"id":"j1","status":"in progress"}"#).unwrap();
		assert!(!job.is_complete());

		let job: LabJob = serde_json::from_str(r#"{"id":"j1","status":"complete","passed":null}"#).unwrap();
		assert!(job.is_complete());
		assert_eq!(job.passed, None);
	}

	#[test]
	fn job_without_id_still_reports_completion() {
		let job: LabJob = serde_json::from_str(r#"{"status":"complete","passed":false}"#).unwrap();
		assert!(job.is_complete());
		assert_eq!(job.id, "");
		assert_eq!(job.passed, Some(false));
	}

	#[test]
	fn recorded_error_ignores_blank_and_reads_custom_data() {
		let job: LabJob = serde_json::from_str(r#"{"id":"j1","error":"   "}"#).unwrap();
		assert_eq!(job.recorded_error(), None);

		let job: LabJob = serde_json::from_str(r#"{"id":"j1","custom-data":{"error":"boom"}}"#).unwrap();
		assert_eq!(job.recorded_error(), Some("boom"));
	}

	#[test]
	fn debug_info_lists_present_fields_only() {
		let job = LabJob {
			id: "j42".into(),
			status: Some("complete".into()),
			error: Some("Element not found".into()),
			passed: Some(false),
			..LabJob::default()
		};

		let info = job.debug_info();
		assert!(info.starts_with("Job j42"));
		assert!(info.contains("status: complete"));
		assert!(info.contains("error: Element not found"));
		assert!(info.contains("passed: false"));
		assert!(!info.contains("video"));
	}

	#[test]
	fn job_update_serializes_sparse() {
		let body = serde_json::to_value(JobUpdate::passed(true)).unwrap();
		assert_eq!(body, serde_json::json!({ "passed": true }));

		let body = serde_json::to_value(JobUpdate::error("bad")).unwrap();
		assert_eq!(body, serde_json::json!({ "custom-data": { "error": "bad" } }));
	}
}
