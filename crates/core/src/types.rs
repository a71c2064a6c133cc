use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Environment hosting the scenario's browser session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Backend {
	/// Driver process launched on this machine.
	Local,
	/// Shared Selenium grid hub.
	SharedGrid,
	/// Cloud device lab with job accounting.
	CloudLab,
}

impl fmt::Display for Backend {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Backend::Local => write!(f, "local"),
			Backend::SharedGrid => write!(f, "grid"),
			Backend::CloudLab => write!(f, "cloud lab"),
		}
	}
}

impl FromStr for Backend {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"local" => Ok(Backend::Local),
			"grid" | "sharedgrid" | "shared-grid" => Ok(Backend::SharedGrid),
			"saucelabs" | "sauce" | "cloudlab" | "cloud-lab" => Ok(Backend::CloudLab),
			_ => Err(Error::config(format!("Unrecognised Execution Environment variable: {s}"))),
		}
	}
}

/// Browser kind requested for a scenario.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BrowserFamily {
	Firefox,
	InternetExplorer,
	Chrome,
	Safari,
	Android,
	IPad,
	IPhone,
}

impl BrowserFamily {
	pub const ALL: [BrowserFamily; 7] = [
		BrowserFamily::Firefox,
		BrowserFamily::InternetExplorer,
		BrowserFamily::Chrome,
		BrowserFamily::Safari,
		BrowserFamily::Android,
		BrowserFamily::IPad,
		BrowserFamily::IPhone,
	];

	/// Device families exist only in the cloud lab.
	pub fn is_cloud_lab_only(self) -> bool {
		matches!(self, BrowserFamily::Android | BrowserFamily::IPad | BrowserFamily::IPhone)
	}

	/// Device windows cannot be maximized.
	pub fn supports_resizing(self) -> bool {
		!self.is_cloud_lab_only()
	}

	/// W3C `browserName` for desktop families.
	pub fn browser_name(self) -> &'static str {
		match self {
			BrowserFamily::Firefox => "firefox",
			BrowserFamily::InternetExplorer => "internet explorer",
			BrowserFamily::Chrome => "chrome",
			BrowserFamily::Safari => "safari",
			BrowserFamily::Android => "android",
			BrowserFamily::IPad => "iPad",
			BrowserFamily::IPhone => "iPhone",
		}
	}
}

impl fmt::Display for BrowserFamily {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			BrowserFamily::Firefox => "Firefox",
			BrowserFamily::InternetExplorer => "IE",
			BrowserFamily::Chrome => "Chrome",
			BrowserFamily::Safari => "Safari",
			BrowserFamily::Android => "Android",
			BrowserFamily::IPad => "iPad",
			BrowserFamily::IPhone => "iPhone",
		};
		f.write_str(name)
	}
}

impl FromStr for BrowserFamily {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"firefox" => Ok(BrowserFamily::Firefox),
			"ie" | "internetexplorer" | "internet explorer" => Ok(BrowserFamily::InternetExplorer),
			"chrome" => Ok(BrowserFamily::Chrome),
			"safari" => Ok(BrowserFamily::Safari),
			"android" => Ok(BrowserFamily::Android),
			"ipad" => Ok(BrowserFamily::IPad),
			"iphone" => Ok(BrowserFamily::IPhone),
			_ => Err(Error::config(format!("Unrecognised browser choice '{s}'"))),
		}
	}
}

/// Requested browser family and version.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserIdentity {
	pub family: BrowserFamily,
	/// Version string, or [`BrowserIdentity::DEFAULT_VERSION`].
	pub version: String,
}

impl BrowserIdentity {
	pub const DEFAULT_VERSION: &'static str = "default";

	pub fn new(family: BrowserFamily, version: impl Into<String>) -> Self {
		let version = version.into();
		let version = if version.trim().is_empty() {
			Self::DEFAULT_VERSION.to_string()
		} else {
			version.trim().to_string()
		};
		Self { family, version }
	}

	pub fn latest(family: BrowserFamily) -> Self {
		Self::new(family, Self::DEFAULT_VERSION)
	}

	/// Parses a configured browser name and version.
	pub fn parse(name: &str, version: &str) -> Result<Self, Error> {
		Ok(Self::new(name.parse()?, version))
	}

	pub fn is_default_version(&self) -> bool {
		self.version.eq_ignore_ascii_case(Self::DEFAULT_VERSION)
	}

	/// Explicit version, or `None` when the backend should choose.
	pub fn explicit_version(&self) -> Option<&str> {
		(!self.is_default_version()).then_some(self.version.as_str())
	}
}

impl fmt::Display for BrowserIdentity {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} {}", self.family, self.version)
	}
}

/// Terminal classification of a scenario.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
	Passed,
	Failed,
}

impl Outcome {
	pub fn from_error<E>(error: Option<E>) -> Self {
		if error.is_some() { Outcome::Failed } else { Outcome::Passed }
	}

	pub fn is_failed(self) -> bool {
		self == Outcome::Failed
	}
}

impl fmt::Display for Outcome {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Outcome::Passed => write!(f, "passed"),
			Outcome::Failed => write!(f, "failed"),
		}
	}
}
