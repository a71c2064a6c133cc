use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use serde_json::Value;
use tokio::process::{Child, Command};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::timeouts;
use crate::types::{Backend, BrowserFamily};
use crate::wait::{PollOptions, poll};

/// A locally spawned WebDriver server (geckodriver, chromedriver, IEDriverServer).
#[derive(Debug)]
pub struct DriverProcess {
	child: Child,
	port: u16,
	executable: PathBuf,
}

impl DriverProcess {
	/// Spawns the driver for `family` on a free loopback port and waits until
	/// its `/status` endpoint reports ready.
	pub async fn spawn(family: BrowserFamily, driver: &Path, startup_timeout: Duration) -> Result<Self> {
		let executable = which::which(driver).map_err(|e| {
			Error::unavailable(
				Backend::Local,
				Error::Command(format!("driver executable {} not found: {e}", driver.display())),
			)
		})?;
		let port = free_port()?;

		let mut cmd = Command::new(&executable);
		cmd.args(port_args(family, port)?)
			.stdin(Stdio::null())
			.stdout(Stdio::null())
			.stderr(Stdio::null())
			.kill_on_drop(true);

		let child = cmd.spawn().map_err(|e| Error::BackendUnavailable {
			backend: Backend::Local,
			message: format!("failed to launch {}: {e}", executable.display()),
		})?;

		let mut process = Self::from_child(child, port, executable);
		info!(
			target = "specdrive.driver",
			path = %process.executable.display(),
			port,
			pid = ?process.id(),
			"driver process started"
		);
		if let Err(err) = process.wait_until_ready(startup_timeout).await {
			process.kill_quietly().await;
			return Err(Error::unavailable(Backend::Local, err));
		}
		Ok(process)
	}

	/// Adopts an already spawned driver listening on `port`.
	pub(crate) fn from_child(child: Child, port: u16, executable: PathBuf) -> Self {
		Self {
			child,
			port,
			executable,
		}
	}

	/// OS process id, `None` once the process has been reaped.
	pub fn id(&self) -> Option<u32> {
		self.child.id()
	}

	pub fn port(&self) -> u16 {
		self.port
	}

	pub fn url(&self) -> String {
		format!("http://127.0.0.1:{}", self.port)
	}

	async fn wait_until_ready(&mut self, timeout: Duration) -> Result<()> {
		let http = reqwest::Client::builder().timeout(Duration::from_millis(500)).build()?;
		let status_url = format!("{}/status", self.url());
		let options = PollOptions::new(timeout, timeouts::DRIVER_STARTUP_INTERVAL)
			.with_message(format!("{} to accept connections", self.executable.display()));

		let ready = poll(&options, || {
			let http = http.clone();
			let status_url = status_url.clone();
			async move { is_ready(&http, &status_url).await }
		})
		.await;

		if ready.is_err() {
			if let Ok(Some(status)) = self.child.try_wait() {
				return Err(Error::Command(format!(
					"{} exited before becoming ready (status: {status})",
					self.executable.display()
				)));
			}
		}
		ready
	}

	pub async fn kill(&mut self) -> Result<()> {
		debug!(target = "specdrive.driver", port = self.port, "stopping driver process");
		self.child.kill().await?;
		Ok(())
	}

	/// Kill after a failed startup; the startup error is what gets reported.
	pub(crate) async fn kill_quietly(&mut self) {
		if let Err(err) = self.kill().await {
			debug!(target = "specdrive.driver", error = %err, "could not stop driver after failed startup");
		}
	}
}

async fn is_ready(http: &reqwest::Client, status_url: &str) -> bool {
	let Ok(response) = http.get(status_url).send().await else {
		return false;
	};
	if !response.status().is_success() {
		return false;
	}
	// Legacy drivers answer 200 without a `ready` flag.
	match response.json::<Value>().await {
		Ok(body) => body
			.pointer("/value/ready")
			.and_then(Value::as_bool)
			.unwrap_or(true),
		Err(_) => true,
	}
}

fn port_args(family: BrowserFamily, port: u16) -> Result<Vec<String>> {
	match family {
		BrowserFamily::Firefox => Ok(vec!["--port".to_string(), port.to_string()]),
		BrowserFamily::Chrome => Ok(vec![format!("--port={port}")]),
		BrowserFamily::InternetExplorer => Ok(vec![format!("/port={port}")]),
		other => Err(Error::config(format!("no local driver for {other}"))),
	}
}

fn free_port() -> Result<u16> {
	let listener = TcpListener::bind("127.0.0.1:0")?;
	Ok(listener.local_addr()?.port())
}
