use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use fantoccini::ClientBuilder;
use tracing::debug;

use super::local::DriverProcess;
use super::remote::RemoteSession;
use super::BrowserSession;
use crate::capabilities::Capabilities;
use crate::error::{Error, Result};
use crate::types::{Backend, BrowserFamily};

/// What the factory needs to start a browser on this machine.
#[derive(Clone, Debug)]
pub struct LocalLaunch {
	pub family: BrowserFamily,
	pub driver: PathBuf,
	pub capabilities: Capabilities,
	pub startup_timeout: Duration,
	pub command_timeout: Duration,
}

/// Opens sessions. The factory's only way of reaching a browser.
#[async_trait]
pub trait SessionLauncher: Send + Sync {
	/// Opens a session against a remote hub (grid or cloud lab).
	async fn open_remote(
		&self,
		backend: Backend,
		hub_url: &str,
		capabilities: &Capabilities,
		command_timeout: Duration,
	) -> Result<Box<dyn BrowserSession>>;

	/// Spawns a local driver process and opens a session on it.
	async fn launch_local(&self, launch: &LocalLaunch) -> Result<Box<dyn BrowserSession>>;
}

/// Real launcher over fantoccini.
#[derive(Clone, Debug, Default)]
pub struct WebDriverLauncher;

impl WebDriverLauncher {
	async fn connect(url: &str, capabilities: &Capabilities, command_timeout: Duration) -> Result<RemoteSession> {
		debug!(target = "specdrive.driver", url, "opening webdriver session");
		let mut builder = ClientBuilder::native();
		builder.capabilities(capabilities.clone().into_map());

		let client = match tokio::time::timeout(command_timeout, builder.connect(url)).await {
			Ok(client) => client?,
			Err(_) => {
				return Err(Error::Timeout {
					waited: command_timeout,
					message: format!("new session at {url}"),
				});
			}
		};
		Ok(RemoteSession::new(client, command_timeout))
	}
}

#[async_trait]
impl SessionLauncher for WebDriverLauncher {
	async fn open_remote(
		&self,
		backend: Backend,
		hub_url: &str,
		capabilities: &Capabilities,
		command_timeout: Duration,
	) -> Result<Box<dyn BrowserSession>> {
		let session = Self::connect(hub_url, capabilities, command_timeout)
			.await
			.map_err(|e| Error::unavailable(backend, e))?;
		Ok(Box::new(session))
	}

	async fn launch_local(&self, launch: &LocalLaunch) -> Result<Box<dyn BrowserSession>> {
		let mut process = DriverProcess::spawn(launch.family, &launch.driver, launch.startup_timeout).await?;
		match Self::connect(&process.url(), &launch.capabilities, launch.command_timeout).await {
			Ok(session) => Ok(Box::new(session.with_driver_process(process))),
			Err(err) => {
				process.kill_quietly().await;
				Err(Error::unavailable(Backend::Local, err))
			}
		}
	}
}
