use anyhow::{Context, Result, bail};
use colored::Colorize;
use serde_json::json;
use tracing::info;

use specdrive::grid::{HubStatusClient, lookup_node};
use specdrive::resolver::{overrides_declared, resolve};
use specdrive::wait::stale_guard;
use specdrive::{Backend, By, Capabilities, Harness, HarnessConfig, Outcome, ScenarioInfo, capabilities};

use crate::cli::{Cli, Commands};

pub async fn dispatch(cli: Cli) -> Result<()> {
	let config = cli.env.to_config();
	match cli.command {
		Commands::Run {
			url,
			selector,
			title,
			tags,
		} => run(config, url, selector, ScenarioInfo::new(title).with_tags(tags)).await,
		Commands::Resolve { json } => resolve_backend(&config, json),
		Commands::Node { session_id } => node(&config, &session_id).await,
	}
}

async fn run(config: HarnessConfig, url: String, selector: Option<String>, info: ScenarioInfo) -> Result<()> {
	let harness = Harness::from_config(config).context("invalid harness configuration")?;
	info!(target = "specdrive.cli", scenario = %info.title, %url, "starting scenario");

	let report = harness
		.run_scenario(info, |_, session| {
			Box::pin(async move {
				session.goto(&url).await?;
				if let Some(selector) = selector {
					let by = By::css(selector);
					let by = &by;
					stale_guard(move || async move { session.find(by).await }).await?;
				}
				session.current_url().await
			})
		})
		.await;

	println!("{}", report.log);
	match report.outcome {
		Outcome::Passed => {
			let landed = report.value.unwrap_or_default();
			println!("{} {}", "PASSED".green().bold(), landed);
			Ok(())
		}
		Outcome::Failed => {
			println!("{}", "FAILED".red().bold());
			bail!(report.error.unwrap_or_else(|| "scenario failed".to_string()))
		}
	}
}

fn resolve_backend(config: &HarnessConfig, as_json: bool) -> Result<()> {
	let browser = config.browser_identity()?;
	let backend = resolve(&config.declared_backend, &browser)?;
	let capabilities = preview_capabilities(config, backend)?;
	let overridden = overrides_declared(&config.declared_backend, backend);

	if as_json {
		let out = json!({
			"declared": config.declared_backend,
			"backend": backend.to_string(),
			"overridden": overridden,
			"browser": browser.family.to_string(),
			"version": browser.version,
			"capabilities": serde_json::Value::Object(capabilities.into_map()),
		});
		println!("{}", serde_json::to_string_pretty(&out)?);
		return Ok(());
	}

	println!("{} {}", "backend:".bold(), backend);
	if overridden {
		println!(
			"  {}",
			format!("'{}' ignored: {} only runs in the cloud lab", config.declared_backend, browser.family).yellow()
		);
	}
	println!("{} {}", "browser:".bold(), browser);
	println!("{}\n{capabilities}", "capabilities:".bold());
	Ok(())
}

/// Capabilities a session would be opened with. The scenario name is a
/// placeholder and the lab access key is masked.
fn preview_capabilities(config: &HarnessConfig, backend: Backend) -> Result<Capabilities> {
	let browser = config.browser_identity()?;
	let caps = match backend {
		Backend::Local => capabilities::local(browser.family, &config.local)?,
		Backend::SharedGrid => {
			capabilities::grid(browser.family, &config.grid, &specdrive::factory::local_host_name())?
		}
		Backend::CloudLab => {
			let mut caps = capabilities::cloud_lab(&browser, &config.lab, &ScenarioInfo::new("preview"))?;
			if !config.lab.access_key.is_empty() {
				caps.set("accessKey", "********");
			}
			caps
		}
	};
	Ok(caps)
}

async fn node(config: &HarnessConfig, session_id: &str) -> Result<()> {
	let client = HubStatusClient::new(&config.grid.hub_url)?;
	let node = lookup_node(&client, session_id).await;
	println!("{node}");
	if !node.is_known() {
		bail!("grid hub at {} does not know session {session_id}", config.grid.hub_url);
	}
	Ok(())
}
