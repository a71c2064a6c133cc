//! Capability tables for each backend.
//!
//! Built fresh for every session. Unsupported family/version pairs fail with
//! [`Error::Configuration`] before anything touches the network.

use std::fmt;

use serde_json::{Map, Value, json};

use crate::config::{CloudLabConfig, GridConfig, LocalDriverPaths};
use crate::error::{Error, Result};
use crate::scenario::ScenarioInfo;
use crate::types::{BrowserFamily, BrowserIdentity};

const LAB_PLATFORM: &str = "Windows 7";
const LAB_RESOLUTION: &str = "1280x1024";
const LAB_OSX_RESOLUTION: &str = "1024x768";
const ANDROID_DEFAULT_VERSION: &str = "4.4";
const IOS_DEFAULT_VERSION: &str = "7.1";

/// Name/value pairs sent when opening a session.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Capabilities(Map<String, Value>);

impl Capabilities {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
		self.0.insert(name.into(), value.into());
		self
	}

	pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
		self.set(name, value);
		self
	}

	pub fn get(&self, name: &str) -> Option<&Value> {
		self.0.get(name)
	}

	pub fn get_str(&self, name: &str) -> Option<&str> {
		self.get(name).and_then(Value::as_str)
	}

	pub fn contains(&self, name: &str) -> bool {
		self.0.contains_key(name)
	}

	pub fn as_map(&self) -> &Map<String, Value> {
		&self.0
	}

	pub fn into_map(self) -> Map<String, Value> {
		self.0
	}
}

impl fmt::Display for Capabilities {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let rendered = serde_json::to_string_pretty(&self.0).map_err(|_| fmt::Error)?;
		f.write_str(&rendered)
	}
}

/// Shared grid capabilities. `host` is this machine's name, used for
/// operator attribution in the hub console.
pub fn grid(family: BrowserFamily, grid: &GridConfig, host: &str) -> Result<Capabilities> {
	if family.is_cloud_lab_only() {
		return Err(Error::config(format!(
			"Unrecognised browser choice '{family}' when initialising driver for Grid."
		)));
	}

	let mut caps = Capabilities::new().with("browserName", family.browser_name());
	if family == BrowserFamily::InternetExplorer {
		caps.set("ie.ensureCleanSession", true);
	}
	let platform = if family == BrowserFamily::Safari { "MAC" } else { "VISTA" };
	caps.set("platform", platform);
	caps.set("environment", format!("{} ({host})", grid.identifier));
	Ok(caps)
}

/// Cloud lab capabilities, including credentials and scenario metadata.
pub fn cloud_lab(browser: &BrowserIdentity, lab: &CloudLabConfig, scenario: &ScenarioInfo) -> Result<Capabilities> {
	let mut caps = match browser.family {
		BrowserFamily::Firefox | BrowserFamily::Chrome => desktop_lab(browser),
		BrowserFamily::InternetExplorer => {
			let mut caps = desktop_lab(browser).with("ie.ensureCleanSession", true);
			if browser.version == "8" {
				caps.set("iedriverVersion", "2.45.0");
			}
			caps
		}
		BrowserFamily::Safari => Capabilities::new()
			.with("browserName", "safari")
			.with("version", browser.version.as_str())
			.with("platform", osx_platform(&browser.version)?)
			.with("screen-resolution", LAB_OSX_RESOLUTION)
			.with("selenium-version", ""),
		BrowserFamily::Android => android(browser.explicit_version().unwrap_or(ANDROID_DEFAULT_VERSION)),
		BrowserFamily::IPhone => ios(
			browser.explicit_version().unwrap_or(IOS_DEFAULT_VERSION),
			"iPhone Simulator",
			"portrait",
		),
		BrowserFamily::IPad => ios(
			browser.explicit_version().unwrap_or(IOS_DEFAULT_VERSION),
			"iPad Simulator",
			"landscape",
		),
	};

	caps.set("command-timeout", lab.command_timeout.as_secs());
	caps.set("idle-timeout", 180);
	caps.set("locationContextEnabled", false);
	caps.set("username", lab.username.as_str());
	caps.set("accessKey", lab.access_key.as_str());
	caps.set("tunnel-identifier", lab.tunnel_name.as_str());
	if lab.uses_parent_tunnel() {
		caps.set("parent-tunnel", lab.parent_name.as_str());
	}
	caps.set("name", scenario.title.as_str());
	caps.set("tags", json!(scenario.tags));
	Ok(caps)
}

fn desktop_lab(browser: &BrowserIdentity) -> Capabilities {
	let mut caps = Capabilities::new().with("browserName", browser.family.browser_name());
	if let Some(version) = browser.explicit_version() {
		caps.set("version", version);
	}
	caps.with("platform", LAB_PLATFORM)
		.with("screen-resolution", LAB_RESOLUTION)
		.with("selenium-version", "")
}

fn osx_platform(version: &str) -> Result<&'static str> {
	match version {
		"8" => Ok("OS X 10.10"),
		"7" => Ok("OS X 10.9"),
		"6" => Ok("OS X 10.8"),
		"5" => Ok("OS X 10.6"),
		other => Err(Error::config(format!(
			"The given browser version {other} is not applicable to Sauce OSX"
		))),
	}
}

fn android(version: &str) -> Capabilities {
	// "beta" selects the real-device pool
	let caps = if version == "beta" {
		Capabilities::new()
			.with("platformName", "Android")
			.with("deviceName", "Samsung Galaxy S4 Device")
			.with("platformVersion", "4.3")
			.with("browserName", "Chrome")
	} else {
		Capabilities::new()
			.with("platform", "Linux")
			.with("version", version)
			.with("deviceName", "Android Emulator")
			.with("browserName", "Android")
			.with("javascriptEnabled", true)
	};
	caps.with("appium-version", "")
		.with("device-orientation", "portrait")
		.with("newCommandTimeout", "60")
}

fn ios(version: &str, device_name: &str, orientation: &str) -> Capabilities {
	Capabilities::new()
		.with("platformName", "iOS")
		.with("platformVersion", version)
		.with("browserName", "safari")
		.with("deviceName", device_name)
		.with("device-orientation", orientation)
		.with("appium-version", "")
		.with("newCommandTimeout", "180")
		.with("safariAllowPopups", "true")
}

/// Capabilities for a locally spawned driver.
pub fn local(family: BrowserFamily, paths: &LocalDriverPaths) -> Result<Capabilities> {
	let caps = match family {
		BrowserFamily::Firefox => {
			let mut caps = Capabilities::new().with("browserName", "firefox");
			if let Some(binary) = &paths.firefox_binary {
				caps.set("moz:firefoxOptions", json!({ "binary": binary.to_string_lossy() }));
			}
			caps
		}
		BrowserFamily::Chrome => Capabilities::new().with("browserName", "chrome"),
		BrowserFamily::InternetExplorer => Capabilities::new()
			.with("browserName", "internet explorer")
			.with(
				"se:ieOptions",
				json!({
					"initialBrowserUrl": "about:blank",
					"ignoreProtectedModeSettings": true,
					"ignoreZoomSetting": true,
					"requireWindowFocus": true,
				}),
			),
		other => {
			return Err(Error::config(format!(
				"Unrecognised browser choice '{other}' when initialising driver for local environment."
			)));
		}
	};
	Ok(caps)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::ErrorKind;

	fn lab_config() -> CloudLabConfig {
		CloudLabConfig {
			username: "alice".into(),
			access_key: "secret".into(),
			parent_name: "team".into(),
			tunnel_name: "tunnel-1".into(),
			..Default::default()
		}
	}

	fn scenario() -> ScenarioInfo {
		ScenarioInfo::new("Checkout works").with_tags(["smoke", "payments"])
	}

	#[test]
	fn grid_safari_targets_mac_and_ie_cleans_session() {
		let config = GridConfig {
			identifier: "qa-team".into(),
			..Default::default()
		};
		let safari = grid(BrowserFamily::Safari, &config, "build-01").unwrap();
		assert_eq!(safari.get_str("platform"), Some("MAC"));
		assert_eq!(safari.get_str("environment"), Some("qa-team (build-01)"));

		let ie = grid(BrowserFamily::InternetExplorer, &config, "build-01").unwrap();
		assert_eq!(ie.get_str("platform"), Some("VISTA"));
		assert_eq!(ie.get("ie.ensureCleanSession"), Some(&json!(true)));
		assert_eq!(ie.get_str("browserName"), Some("internet explorer"));
	}

	#[test]
	fn grid_rejects_device_families() {
		let err = grid(BrowserFamily::IPad, &GridConfig::default(), "host").unwrap_err();
		assert_eq!(err.kind(), ErrorKind::Configuration);
	}

	#[test]
	fn lab_desktop_omits_default_version() {
		let caps = cloud_lab(&BrowserIdentity::latest(BrowserFamily::Chrome), &lab_config(), &scenario()).unwrap();
		assert!(!caps.contains("version"));
		assert_eq!(caps.get_str("platform"), Some("Windows 7"));
		assert_eq!(caps.get_str("screen-resolution"), Some("1280x1024"));

		let caps = cloud_lab(&BrowserIdentity::new(BrowserFamily::Firefox, "45"), &lab_config(), &scenario()).unwrap();
		assert_eq!(caps.get_str("version"), Some("45"));
	}

	#[test]
	fn lab_ie8_pins_driver_version() {
		let caps = cloud_lab(
			&BrowserIdentity::new(BrowserFamily::InternetExplorer, "8"),
			&lab_config(),
			&scenario(),
		)
		.unwrap();
		assert_eq!(caps.get_str("iedriverVersion"), Some("2.45.0"));
		assert_eq!(caps.get("ie.ensureCleanSession"), Some(&json!(true)));
	}

	#[test]
	fn lab_safari_maps_version_to_osx() {
		let caps = cloud_lab(&BrowserIdentity::new(BrowserFamily::Safari, "7"), &lab_config(), &scenario()).unwrap();
		assert_eq!(caps.get_str("platform"), Some("OS X 10.9"));
		assert_eq!(caps.get_str("screen-resolution"), Some("1024x768"));

		for version in ["default", "9", "4"] {
			let err = cloud_lab(&BrowserIdentity::new(BrowserFamily::Safari, version), &lab_config(), &scenario())
				.unwrap_err();
			assert_eq!(err.kind(), ErrorKind::Configuration, "safari {version}");
		}
	}

	#[test]
	fn lab_android_variants() {
		let emulator = cloud_lab(&BrowserIdentity::latest(BrowserFamily::Android), &lab_config(), &scenario()).unwrap();
		assert_eq!(emulator.get_str("version"), Some("4.4"));
		assert_eq!(emulator.get_str("deviceName"), Some("Android Emulator"));
		assert_eq!(emulator.get("javascriptEnabled"), Some(&json!(true)));

		let device = cloud_lab(&BrowserIdentity::new(BrowserFamily::Android, "beta"), &lab_config(), &scenario()).unwrap();
		assert_eq!(device.get_str("deviceName"), Some("Samsung Galaxy S4 Device"));
		assert_eq!(device.get_str("platformVersion"), Some("4.3"));
		assert_eq!(device.get_str("newCommandTimeout"), Some("60"));
	}

	#[test]
	fn lab_ios_devices() {
		let ipad = cloud_lab(&BrowserIdentity::latest(BrowserFamily::IPad), &lab_config(), &scenario()).unwrap();
		assert_eq!(ipad.get_str("platformVersion"), Some("7.1"));
		assert_eq!(ipad.get_str("deviceName"), Some("iPad Simulator"));
		assert_eq!(ipad.get_str("device-orientation"), Some("landscape"));

		let iphone = cloud_lab(&BrowserIdentity::new(BrowserFamily::IPhone, "8.1"), &lab_config(), &scenario()).unwrap();
		assert_eq!(iphone.get_str("platformVersion"), Some("8.1"));
		assert_eq!(iphone.get_str("device-orientation"), Some("portrait"));
	}

	#[test]
	fn lab_common_fields_and_parent_tunnel() {
		let caps = cloud_lab(&BrowserIdentity::latest(BrowserFamily::Firefox), &lab_config(), &scenario()).unwrap();
		assert_eq!(caps.get("command-timeout"), Some(&json!(300)));
		assert_eq!(caps.get("idle-timeout"), Some(&json!(180)));
		assert_eq!(caps.get_str("username"), Some("alice"));
		assert_eq!(caps.get_str("tunnel-identifier"), Some("tunnel-1"));
		assert_eq!(caps.get_str("parent-tunnel"), Some("team"));
		assert_eq!(caps.get_str("name"), Some("Checkout works"));
		assert_eq!(caps.get("tags"), Some(&json!(["smoke", "payments"])));

		let own_account = CloudLabConfig {
			parent_name: "alice".into(),
			..lab_config()
		};
		let caps = cloud_lab(&BrowserIdentity::latest(BrowserFamily::Firefox), &own_account, &scenario()).unwrap();
		assert!(!caps.contains("parent-tunnel"));

		let no_parent = CloudLabConfig {
			parent_name: String::new(),
			..lab_config()
		};
		let caps = cloud_lab(&BrowserIdentity::latest(BrowserFamily::Firefox), &no_parent, &scenario()).unwrap();
		assert_eq!(caps.get_str("parent-tunnel"), Some(""));
	}

	#[test]
	fn local_firefox_passes_binary() {
		let paths = LocalDriverPaths {
			firefox_binary: Some("/opt/firefox/firefox".into()),
			..Default::default()
		};
		let caps = local(BrowserFamily::Firefox, &paths).unwrap();
		assert_eq!(caps.get("moz:firefoxOptions"), Some(&json!({ "binary": "/opt/firefox/firefox" })));
	}

	#[test]
	fn local_has_no_strategy_for_safari_or_devices() {
		for family in [BrowserFamily::Safari, BrowserFamily::Android, BrowserFamily::IPhone] {
			let err = local(family, &LocalDriverPaths::default()).unwrap_err();
			assert_eq!(err.kind(), ErrorKind::Configuration);
		}
	}
}
