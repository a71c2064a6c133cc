//! Per-scenario diagnostic log.
//!
//! Every entry is kept in memory and mirrored into the scenario's key/value
//! store so hooks and steps running in separate closures see one report.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Local};
use parking_lot::Mutex;

/// Store key holding the rendered log lines.
pub const LOG_CONTEXT_KEY: &str = "LogContext";
pub const END_OF_LOG: &str = "<End of Log>";

const LINE_INDENT: &str = "     ";

/// Scenario-scoped string store shared between hooks and steps.
#[derive(Clone, Debug, Default)]
pub struct ScenarioStore {
	inner: Arc<Mutex<HashMap<String, String>>>,
}

impl ScenarioStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn get(&self, key: &str) -> Option<String> {
		self.inner.lock().get(key).cloned()
	}

	pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
		self.inner.lock().insert(key.into(), value.into());
	}

	/// Appends to the value under `key`, creating it when absent.
	pub fn append(&self, key: &str, value: &str) {
		self.inner.lock().entry(key.to_string()).or_default().push_str(value);
	}

	pub fn remove(&self, key: &str) -> Option<String> {
		self.inner.lock().remove(key)
	}

	pub fn contains(&self, key: &str) -> bool {
		self.inner.lock().contains_key(key)
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogEntry {
	pub at: DateTime<Local>,
	pub message: String,
}

impl LogEntry {
	fn line(&self) -> String {
		format!("{LINE_INDENT}{}: {}\n", self.at.format("%H:%M:%S%.3f"), self.message)
	}
}

/// Append-only log for one scenario.
#[derive(Clone, Debug, Default)]
pub struct DiagnosticLog {
	entries: Arc<Mutex<Vec<LogEntry>>>,
	store: ScenarioStore,
}

impl DiagnosticLog {
	pub fn new(store: ScenarioStore) -> Self {
		Self {
			entries: Arc::default(),
			store,
		}
	}

	pub fn add(&self, message: impl Into<String>) {
		let entry = LogEntry {
			at: Local::now(),
			message: message.into(),
		};
		let line = entry.line();
		self.entries.lock().push(entry);
		self.store.append(LOG_CONTEXT_KEY, &line);
	}

	pub fn entries(&self) -> Vec<LogEntry> {
		self.entries.lock().clone()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.lock().is_empty()
	}

	pub fn store(&self) -> &ScenarioStore {
		&self.store
	}

	/// Renders every accumulated line followed by the end marker.
	///
	/// Reads from the shared store so lines added through another handle to the
	/// same scenario are included.
	pub fn render(&self) -> String {
		let mut report = self.store.get(LOG_CONTEXT_KEY).unwrap_or_default();
		let end = LogEntry {
			at: Local::now(),
			message: END_OF_LOG.to_string(),
		};
		report.push_str(&end.line());
		report
	}
}
