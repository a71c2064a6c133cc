//! Runs the `specdrive` binary for commands that never open a browser.

use std::path::PathBuf;
use std::process::{Command, Output};

const ENV_VARS: &[&str] = &[
	"SELENIUM_EXECUTION_ENVIRONMENT",
	"SELENIUM_BROWSER_NAME",
	"SELENIUM_BROWSER_VERSION",
	"SELENIUM_BROWSER_VERISON",
	"GRID_HUB_URL",
	"SELENIUM_GRID_IDENTIFIER",
	"SAUCELABS_USERNAME",
	"SAUCELABS_ACCESS_KEY",
	"SAUCELABS_PARENT_NAME",
	"SAUCELABS_TUNNEL_NAME",
];

fn specdrive_binary() -> PathBuf {
	let mut path = std::env::current_exe().unwrap();
	path.pop();
	path.pop();
	path.push("specdrive");
	path
}

fn specdrive(args: &[&str], env: &[(&str, &str)]) -> Output {
	let mut cmd = Command::new(specdrive_binary());
	for var in ENV_VARS {
		cmd.env_remove(var);
	}
	cmd.env("NO_COLOR", "1").envs(env.iter().copied()).args(args);
	cmd.output().expect("failed to execute specdrive")
}

fn resolve_json(env: &[(&str, &str)]) -> serde_json::Value {
	let output = specdrive(&["resolve", "--json"], env);
	assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
	serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn defaults_resolve_to_local_firefox() {
	let json = resolve_json(&[]);
	assert_eq!(json["backend"], "local");
	assert_eq!(json["browser"], "Firefox");
	assert_eq!(json["version"], "default");
	assert_eq!(json["overridden"], false);
}

#[test]
fn environment_variables_select_the_grid() {
	let json = resolve_json(&[
		("SELENIUM_EXECUTION_ENVIRONMENT", "Grid"),
		("SELENIUM_BROWSER_NAME", "ie"),
		("SELENIUM_GRID_IDENTIFIER", "nightly"),
	]);
	assert_eq!(json["backend"], "grid");
	assert_eq!(json["capabilities"]["browserName"], "internet explorer");
	assert_eq!(json["capabilities"]["platform"], "VISTA");
	assert!(json["capabilities"]["environment"].as_str().unwrap().starts_with("nightly ("));
}

#[test]
fn legacy_version_variable_is_honoured() {
	let json = resolve_json(&[
		("SELENIUM_EXECUTION_ENVIRONMENT", "saucelabs"),
		("SELENIUM_BROWSER_NAME", "safari"),
		("SELENIUM_BROWSER_VERISON", "7"),
	]);
	assert_eq!(json["version"], "7");
	assert_eq!(json["capabilities"]["platform"], "OS X 10.9");
}

#[test]
fn device_family_overrides_declared_environment() {
	let json = resolve_json(&[("SELENIUM_EXECUTION_ENVIRONMENT", "local"), ("SELENIUM_BROWSER_NAME", "ipad")]);
	assert_eq!(json["backend"], "cloud lab");
	assert_eq!(json["overridden"], true);
	assert_eq!(json["capabilities"]["deviceName"], "iPad Simulator");
}

#[test]
fn unknown_environment_exits_with_failure() {
	let output = specdrive(&["resolve"], &[("SELENIUM_EXECUTION_ENVIRONMENT", "docker")]);
	assert_eq!(output.status.code(), Some(1));
	let stderr = String::from_utf8_lossy(&output.stderr);
	assert!(stderr.contains("Unrecognised Execution Environment variable: docker"), "stderr: {stderr}");
}
