//! Failure screenshots.

use std::path::{Path, PathBuf};

use chrono::{Local, Timelike};
use tracing::debug;

use crate::driver::BrowserSession;
use crate::error::{Error, Result};

/// Time-based file name, `HH-MM-SS-ffff.png`.
pub fn screenshot_file_name() -> String {
	let now = Local::now();
	format!("{}-{:04}.png", now.format("%H-%M-%S"), now.nanosecond() % 1_000_000_000 / 100_000)
}

/// Captures the current page and writes the returned bytes verbatim into `dir`.
///
/// Every failure is reported as [`Error::DiagnosticCapture`]; callers decide
/// whether to log or propagate.
pub async fn save_failure_screenshot(session: &dyn BrowserSession, dir: &Path) -> Result<PathBuf> {
	let bytes = session
		.screenshot()
		.await
		.map_err(|e| Error::DiagnosticCapture(format!("screenshot capture failed: {e}")))?;

	tokio::fs::create_dir_all(dir)
		.await
		.map_err(|e| Error::DiagnosticCapture(format!("could not create {}: {e}", dir.display())))?;

	let path = dir.join(screenshot_file_name());
	tokio::fs::write(&path, &bytes)
		.await
		.map_err(|e| Error::DiagnosticCapture(format!("could not write {}: {e}", path.display())))?;

	debug!(target = "specdrive.screenshot", path = %path.display(), bytes = bytes.len(), "saved failure screenshot");
	Ok(path)
}
