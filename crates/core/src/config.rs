//! Resolved harness settings.
//!
//! Loading these from the environment is the caller's job (see the `specdrive`
//! binary); the core only consumes the resolved values.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::timeouts;
use crate::types::BrowserIdentity;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
	/// Raw declared backend; validated by [`resolve`](crate::resolver::resolve).
	pub declared_backend: String,
	pub browser_name: String,
	pub browser_version: String,
	pub grid: GridConfig,
	pub lab: CloudLabConfig,
	pub local: LocalDriverPaths,
	pub implicit_wait: Duration,
	/// Mirror session actions into the diagnostic log.
	pub enable_logging: bool,
	pub screenshot_dir: PathBuf,
}

impl Default for HarnessConfig {
	fn default() -> Self {
		Self {
			declared_backend: "local".to_string(),
			browser_name: "firefox".to_string(),
			browser_version: BrowserIdentity::DEFAULT_VERSION.to_string(),
			grid: GridConfig::default(),
			lab: CloudLabConfig::default(),
			local: LocalDriverPaths::default(),
			implicit_wait: timeouts::DEFAULT_IMPLICIT_WAIT,
			enable_logging: false,
			screenshot_dir: PathBuf::from("Screenshots"),
		}
	}
}

impl HarnessConfig {
	pub fn browser_identity(&self) -> Result<BrowserIdentity> {
		BrowserIdentity::parse(&self.browser_name, &self.browser_version)
	}
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
	pub hub_url: String,
	/// Operator attribution shown in the grid console.
	pub identifier: String,
	pub command_timeout: Duration,
}

impl Default for GridConfig {
	fn default() -> Self {
		Self {
			hub_url: "http://localhost:4444/wd/hub".to_string(),
			identifier: "specdrive".to_string(),
			command_timeout: timeouts::GRID_COMMAND_TIMEOUT,
		}
	}
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudLabConfig {
	pub hub_url: String,
	/// Root of the accounting REST API.
	pub api_url: String,
	pub username: String,
	pub access_key: String,
	pub parent_name: String,
	pub tunnel_name: String,
	pub command_timeout: Duration,
	pub job_completion_timeout: Duration,
}

impl Default for CloudLabConfig {
	fn default() -> Self {
		Self {
			hub_url: "https://ondemand.saucelabs.com/wd/hub".to_string(),
			api_url: "https://saucelabs.com".to_string(),
			username: String::new(),
			access_key: String::new(),
			parent_name: String::new(),
			tunnel_name: String::new(),
			command_timeout: timeouts::CLOUD_LAB_COMMAND_TIMEOUT,
			job_completion_timeout: timeouts::JOB_COMPLETION_TIMEOUT,
		}
	}
}

impl CloudLabConfig {
	/// Any account other than the parent runs on the parent's tunnel.
	pub fn uses_parent_tunnel(&self) -> bool {
		self.username != self.parent_name
	}
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalDriverPaths {
	pub firefox_binary: Option<PathBuf>,
	pub gecko_driver: PathBuf,
	pub chrome_driver: PathBuf,
	pub ie_driver: PathBuf,
	pub startup_timeout: Duration,
	pub command_timeout: Duration,
}

impl Default for LocalDriverPaths {
	fn default() -> Self {
		Self {
			firefox_binary: None,
			gecko_driver: PathBuf::from("geckodriver"),
			chrome_driver: PathBuf::from("chromedriver"),
			ie_driver: PathBuf::from("IEDriverServer.exe"),
			startup_timeout: timeouts::DRIVER_STARTUP_TIMEOUT,
			command_timeout: timeouts::LOCAL_COMMAND_TIMEOUT,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::types::BrowserFamily;

	#[test]
	fn defaults_match_documented_values() {
		let config = HarnessConfig::default();
		assert_eq!(config.implicit_wait, Duration::from_secs(10));
		assert_eq!(config.grid.command_timeout, Duration::from_secs(900));
		assert_eq!(config.lab.job_completion_timeout, Duration::from_secs(60));
		assert_eq!(config.screenshot_dir, PathBuf::from("Screenshots"));
	}

	#[test]
	fn browser_identity_parses_configured_values() {
		let config = HarnessConfig {
			browser_name: "iPhone".into(),
			browser_version: "7.1".into(),
			..Default::default()
		};
		let identity = config.browser_identity().unwrap();
		assert_eq!(identity.family, BrowserFamily::IPhone);
		assert_eq!(identity.version, "7.1");
	}

	#[test]
	fn parent_tunnel_unless_running_as_parent() {
		let mut lab = CloudLabConfig {
			username: "team".into(),
			parent_name: "team".into(),
			..Default::default()
		};
		assert!(!lab.uses_parent_tunnel());
		lab.username = "alice".into();
		assert!(lab.uses_parent_tunnel());
		lab.parent_name.clear();
		assert!(lab.uses_parent_tunnel());
		lab.username.clear();
		assert!(!lab.uses_parent_tunnel());
	}
}
