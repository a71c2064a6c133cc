use parking_lot::Mutex;

use crate::log::{DiagnosticLog, ScenarioStore};
use crate::types::Outcome;

/// Title and tags of the running scenario, as reported by the BDD runner.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScenarioInfo {
	pub title: String,
	pub tags: Vec<String>,
}

impl ScenarioInfo {
	pub fn new(title: impl Into<String>) -> Self {
		Self {
			title: title.into(),
			tags: Vec::new(),
		}
	}

	pub fn with_tags<I, S>(mut self, tags: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.tags = tags.into_iter().map(Into::into).collect();
		self
	}
}

/// Everything scoped to one scenario.
///
/// Created when the scenario starts and dropped when it ends. Passed by
/// reference to the factory, step code and finalizer; never shared between
/// scenarios.
#[derive(Debug)]
pub struct ScenarioContext {
	pub info: ScenarioInfo,
	store: ScenarioStore,
	log: DiagnosticLog,
	error: Mutex<Option<String>>,
}

impl ScenarioContext {
	pub fn new(info: ScenarioInfo) -> Self {
		let store = ScenarioStore::new();
		let log = DiagnosticLog::new(store.clone());
		Self {
			info,
			store,
			log,
			error: Mutex::new(None),
		}
	}

	pub fn log(&self) -> &DiagnosticLog {
		&self.log
	}

	pub fn store(&self) -> &ScenarioStore {
		&self.store
	}

	/// Records the scenario's failure. The first recorded error is kept.
	pub fn record_error(&self, message: impl Into<String>) {
		let mut slot = self.error.lock();
		if slot.is_none() {
			*slot = Some(message.into());
		}
	}

	pub fn test_error(&self) -> Option<String> {
		self.error.lock().clone()
	}

	pub fn outcome(&self) -> Outcome {
		Outcome::from_error(self.test_error())
	}
}
