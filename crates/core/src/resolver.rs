//! Backend selection for a scenario. Pure: no I/O and no logging.

use crate::error::Result;
use crate::types::{Backend, BrowserIdentity};

/// Picks the backend for one scenario.
///
/// Device families exist only in the cloud lab and win over whatever was
/// declared; the declared value is not inspected in that case. Otherwise the
/// declared value must name a known backend.
pub fn resolve(declared: &str, browser: &BrowserIdentity) -> Result<Backend> {
	if browser.family.is_cloud_lab_only() {
		return Ok(Backend::CloudLab);
	}
	declared.parse()
}

/// True when [`resolve`] picked a backend other than the one declared.
///
/// Unparsable declarations count as overridden.
pub fn overrides_declared(declared: &str, resolved: Backend) -> bool {
	declared.parse::<Backend>().map_or(true, |backend| backend != resolved)
}
