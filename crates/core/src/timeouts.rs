//! Named waits shared by step code and the lifecycle hooks.

use std::time::Duration;

pub const SHORT: Duration = Duration::from_secs(1);
pub const MEDIUM: Duration = Duration::from_secs(3);
pub const LONG: Duration = Duration::from_secs(5);
/// Device sessions in the cloud lab respond noticeably slower.
pub const CLOUD_LAB_LONG: Duration = Duration::from_secs(10);
pub const EXTREME: Duration = Duration::from_secs(20);

/// Time allowed for the DOM to settle after a client-side update.
pub const DOM_REFRESH: Duration = Duration::from_millis(500);

pub const STANDARD_IMPLICIT_WAIT: Duration = Duration::from_secs(3);
/// Implicit wait applied to every session the factory builds.
pub const DEFAULT_IMPLICIT_WAIT: Duration = Duration::from_secs(10);

pub const GRID_COMMAND_TIMEOUT: Duration = Duration::from_secs(900);
pub const CLOUD_LAB_COMMAND_TIMEOUT: Duration = Duration::from_secs(300);
pub const LOCAL_COMMAND_TIMEOUT: Duration = Duration::from_secs(60);

pub const JOB_COMPLETION_TIMEOUT: Duration = Duration::from_secs(60);
pub const JOB_COMPLETION_INTERVAL: Duration = Duration::from_millis(250);

pub const DRIVER_STARTUP_TIMEOUT: Duration = Duration::from_secs(20);
pub const DRIVER_STARTUP_INTERVAL: Duration = Duration::from_millis(100);

/// Pick the long wait appropriate for the backend in use.
pub fn long_for(backend: crate::types::Backend) -> Duration {
	match backend {
		crate::types::Backend::CloudLab => CLOUD_LAB_LONG,
		_ => LONG,
	}
}
