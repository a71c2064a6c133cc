use std::time::Duration;

use fantoccini::error::{CmdError, ErrorStatus, NewSessionError};
use thiserror::Error;

use crate::types::Backend;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
	/// Unrecognized configuration value or unsupported browser/backend pairing.
	#[error("configuration error: {0}")]
	Configuration(String),

	/// The local driver process or the remote session could not be started.
	#[error("{backend} backend unavailable: {message}")]
	BackendUnavailable { backend: Backend, message: String },

	#[error("timeout after {}ms waiting for: {message}", waited.as_millis())]
	Timeout { waited: Duration, message: String },

	/// Stale element, missing element, and similar UI races.
	#[error("transient protocol error: {0}")]
	TransientProtocol(String),

	#[error("diagnostic capture failed: {0}")]
	DiagnosticCapture(String),

	#[error("unexpected alert open: {0}")]
	UnexpectedAlert(String),

	#[error("session is no longer valid: {0}")]
	InvalidSession(String),

	#[error("webdriver command failed: {0}")]
	Command(String),

	#[error("empty response from {endpoint}")]
	EmptyResponse { endpoint: String },

	#[error("malformed response from {endpoint}")]
	MalformedResponse {
		endpoint: String,
		#[source]
		source: serde_json::Error,
	},

	#[error("response from {endpoint} has no `{field}` field")]
	MissingField { endpoint: String, field: &'static str },

	#[error(transparent)]
	Http(#[from] reqwest::Error),

	#[error(transparent)]
	Io(#[from] std::io::Error),
}

/// Coarse classification used by [`retry`](crate::wait::retry) to decide
/// which failures are worth another attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
	Configuration,
	BackendUnavailable,
	Timeout,
	TransientProtocol,
	DiagnosticCapture,
	UnexpectedAlert,
	InvalidSession,
	Command,
	EmptyResponse,
	MalformedResponse,
	MissingField,
	Http,
	Io,
}

impl Error {
	pub fn kind(&self) -> ErrorKind {
		match self {
			Error::Configuration(_) => ErrorKind::Configuration,
			Error::BackendUnavailable { .. } => ErrorKind::BackendUnavailable,
			Error::Timeout { .. } => ErrorKind::Timeout,
			Error::TransientProtocol(_) => ErrorKind::TransientProtocol,
			Error::DiagnosticCapture(_) => ErrorKind::DiagnosticCapture,
			Error::UnexpectedAlert(_) => ErrorKind::UnexpectedAlert,
			Error::InvalidSession(_) => ErrorKind::InvalidSession,
			Error::Command(_) => ErrorKind::Command,
			Error::EmptyResponse { .. } => ErrorKind::EmptyResponse,
			Error::MalformedResponse { .. } => ErrorKind::MalformedResponse,
			Error::MissingField { .. } => ErrorKind::MissingField,
			Error::Http(_) => ErrorKind::Http,
			Error::Io(_) => ErrorKind::Io,
		}
	}

	pub fn config(message: impl Into<String>) -> Self {
		Error::Configuration(message.into())
	}

	/// Rewraps a construction-phase failure as [`Error::BackendUnavailable`].
	///
	/// Configuration errors and errors that already name a backend pass through.
	pub fn unavailable(backend: Backend, err: Error) -> Self {
		match err {
			err @ (Error::BackendUnavailable { .. } | Error::Configuration(_)) => err,
			other => Error::BackendUnavailable {
				backend,
				message: other.to_string(),
			},
		}
	}
}

impl From<CmdError> for Error {
	fn from(err: CmdError) -> Self {
		classify_command_error(&err)
	}
}

impl From<NewSessionError> for Error {
	fn from(err: NewSessionError) -> Self {
		Error::Command(format!("could not open session: {err}"))
	}
}

/// Classify a WebDriver client error by its W3C status code.
///
/// A dropped connection means the session is gone.
fn classify_command_error(err: &CmdError) -> Error {
	let msg = err.to_string();
	match err {
		CmdError::Standard(wd) => match wd.error {
			ErrorStatus::NoSuchElement | ErrorStatus::StaleElementReference => Error::TransientProtocol(msg),
			ErrorStatus::UnexpectedAlertOpen => Error::UnexpectedAlert(msg),
			ErrorStatus::InvalidSessionId | ErrorStatus::NoSuchWindow => Error::InvalidSession(msg),
			_ => Error::Command(msg),
		},
		CmdError::Lost(_) => Error::InvalidSession(msg),
		_ => Error::Command(msg),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn unavailable_preserves_configuration_errors() {
		let err = Error::unavailable(Backend::Local, Error::config("no local strategy for ipad"));
		assert_eq!(err.kind(), ErrorKind::Configuration);
	}

	#[test]
	fn unavailable_wraps_other_errors_with_backend() {
		let err = Error::unavailable(Backend::SharedGrid, Error::Command("connection refused".into()));
		match err {
			Error::BackendUnavailable { backend, message } => {
				assert_eq!(backend, Backend::SharedGrid);
				assert!(message.contains("connection refused"));
			}
			other => panic!("unexpected error: {other:?}"),
		}
	}

	#[test]
	fn timeout_display_reports_milliseconds() {
		let err = Error::Timeout {
			waited: Duration::from_secs(2),
			message: "job completion".into(),
		};
		assert_eq!(err.to_string(), "timeout after 2000ms waiting for: job completion");
	}

	fn webdriver(status: ErrorStatus) -> CmdError {
		CmdError::Standard(fantoccini::error::WebDriver::new(status, "from the remote end"))
	}

	#[test]
	fn element_races_are_transient() {
		assert_eq!(Error::from(webdriver(ErrorStatus::NoSuchElement)).kind(), ErrorKind::TransientProtocol);
		assert_eq!(
			Error::from(webdriver(ErrorStatus::StaleElementReference)).kind(),
			ErrorKind::TransientProtocol
		);
	}

	#[test]
	fn status_codes_map_to_alert_and_session_kinds() {
		assert_eq!(Error::from(webdriver(ErrorStatus::UnexpectedAlertOpen)).kind(), ErrorKind::UnexpectedAlert);
		assert_eq!(Error::from(webdriver(ErrorStatus::InvalidSessionId)).kind(), ErrorKind::InvalidSession);
		assert_eq!(Error::from(webdriver(ErrorStatus::NoSuchWindow)).kind(), ErrorKind::InvalidSession);
		assert_eq!(Error::from(webdriver(ErrorStatus::JavascriptError)).kind(), ErrorKind::Command);
	}

	#[test]
	fn lost_connection_invalidates_the_session() {
		let lost = CmdError::Lost(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer"));
		assert_eq!(Error::from(lost).kind(), ErrorKind::InvalidSession);
		assert_eq!(Error::from(CmdError::NotJson("<html>".into())).kind(), ErrorKind::Command);
	}
}
