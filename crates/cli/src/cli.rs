use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use specdrive::HarnessConfig;
use specdrive::types::BrowserIdentity;

use crate::styles::cli_styles;

#[derive(Parser, Debug)]
#[command(name = "specdrive")]
#[command(about = "Run WebDriver scenarios against local, grid or cloud lab browsers")]
#[command(version)]
#[command(styles = cli_styles())]
pub struct Cli {
    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(flatten)]
    pub env: EnvironmentArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Open a session, navigate, optionally check an element, and print the report
    Run {
        /// Page to open
        url: String,
        /// CSS selector that must be present after navigation
        #[arg(short, long, value_name = "SELECTOR")]
        selector: Option<String>,
        /// Scenario title reported to the cloud lab
        #[arg(long, default_value = "specdrive smoke run")]
        title: String,
        /// Scenario tag (repeatable)
        #[arg(long = "tag", value_name = "TAG", action = ArgAction::Append)]
        tags: Vec<String>,
    },

    /// Show which backend, browser and capabilities a scenario would use, without opening anything
    Resolve {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Ask the grid hub which node is running a session
    Node {
        /// Remote session id
        session_id: String,
    },
}

/// Execution environment settings. Every flag falls back to the environment
/// variable the existing CI pipelines already export.
#[derive(Args, Debug, Clone)]
pub struct EnvironmentArgs {
    /// Execution environment: local, grid or saucelabs
    #[arg(long = "environment", global = true, env = "SELENIUM_EXECUTION_ENVIRONMENT", default_value = "local")]
    pub execution_environment: String,

    /// Browser family: firefox, ie, chrome, safari, android, ipad, iphone
    #[arg(long = "browser", global = true, env = "SELENIUM_BROWSER_NAME", default_value = "firefox")]
    pub browser_name: String,

    /// Browser version, or "default"
    #[arg(long, global = true, env = "SELENIUM_BROWSER_VERSION")]
    pub browser_version: Option<String>,

    #[arg(long = "browser-verison", global = true, env = "SELENIUM_BROWSER_VERISON", hide = true)]
    pub legacy_browser_version: Option<String>,

    /// Selenium Grid hub
    #[arg(long, global = true, env = "GRID_HUB_URL", value_name = "URL")]
    pub grid_hub_url: Option<String>,

    /// Operator tag sent to the grid as the `environment` capability
    #[arg(long, global = true, env = "SELENIUM_GRID_IDENTIFIER")]
    pub grid_identifier: Option<String>,

    /// Cloud lab WebDriver hub
    #[arg(long, global = true, env = "SAUCELABS_HUB_URL", value_name = "URL")]
    pub lab_hub_url: Option<String>,

    #[arg(long, global = true, env = "SAUCELABS_USERNAME", default_value = "")]
    pub lab_username: String,

    #[arg(long, global = true, env = "SAUCELABS_ACCESS_KEY", default_value = "", hide_env_values = true)]
    pub lab_access_key: String,

    /// Account owning the shared tunnel
    #[arg(long, global = true, env = "SAUCELABS_PARENT_NAME", default_value = "")]
    pub lab_parent_name: String,

    #[arg(long, global = true, env = "SAUCELABS_TUNNEL_NAME", default_value = "")]
    pub lab_tunnel_name: String,

    /// WebDriver command timeout for local and cloud lab sessions; the grid keeps 900s
    #[arg(long, global = true, env = "SELENIUM_COMMAND_TIMEOUT_SEC", value_name = "SEC")]
    pub command_timeout: Option<u64>,

    /// Implicit element wait applied to every new session
    #[arg(long, global = true, env = "SELENIUM_IMPLICIT_WAIT_TIMEOUT_SEC", value_name = "SEC")]
    pub implicit_wait: Option<u64>,

    #[arg(long, global = true, env = "LOCAL_FIREFOX_BINARY_PATH", value_name = "FILE")]
    pub firefox_binary: Option<PathBuf>,

    #[arg(long, global = true, env = "LOCAL_GECKODRIVER_PATH", value_name = "FILE")]
    pub gecko_driver: Option<PathBuf>,

    #[arg(long, global = true, env = "LOCAL_CHROMEDRIVERSERVER_PATH", value_name = "FILE")]
    pub chrome_driver: Option<PathBuf>,

    #[arg(long, global = true, env = "LOCAL_IEDRIVERSERVER_PATH", value_name = "FILE")]
    pub ie_driver: Option<PathBuf>,

    /// Mirror navigation, lookups, clicks and typing into the report
    #[arg(
        long,
        global = true,
        env = "SELENIUM_ENABLE_LOGGING",
        num_args = 0..=1,
        default_value_t = false,
        default_missing_value = "true",
        value_parser = clap::builder::BoolishValueParser::new(),
        action = ArgAction::Set
    )]
    pub enable_logging: bool,

    /// Where failure screenshots are written
    #[arg(long, global = true, env = "SELENIUM_SCREENSHOT_DIR", value_name = "DIR")]
    pub screenshot_dir: Option<PathBuf>,
}

impl EnvironmentArgs {
    pub fn browser_version(&self) -> String {
        self.browser_version
            .clone()
            .or_else(|| self.legacy_browser_version.clone())
            .unwrap_or_else(|| BrowserIdentity::DEFAULT_VERSION.to_string())
    }

    pub fn to_config(&self) -> HarnessConfig {
        let mut config = HarnessConfig {
            declared_backend: self.execution_environment.clone(),
            browser_name: self.browser_name.clone(),
            browser_version: self.browser_version(),
            enable_logging: self.enable_logging,
            ..Default::default()
        };

        if let Some(url) = &self.grid_hub_url {
            config.grid.hub_url = url.clone();
        }
        if let Some(id) = &self.grid_identifier {
            config.grid.identifier = id.clone();
        }
        if let Some(url) = &self.lab_hub_url {
            config.lab.hub_url = url.clone();
        }
        config.lab.username = self.lab_username.clone();
        config.lab.access_key = self.lab_access_key.clone();
        config.lab.parent_name = self.lab_parent_name.clone();
        config.lab.tunnel_name = self.lab_tunnel_name.clone();

        if let Some(secs) = self.command_timeout {
            config.local.command_timeout = Duration::from_secs(secs);
            config.lab.command_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.implicit_wait {
            config.implicit_wait = Duration::from_secs(secs);
        }

        config.local.firefox_binary = self.firefox_binary.clone();
        if let Some(path) = &self.gecko_driver {
            config.local.gecko_driver = path.clone();
        }
        if let Some(path) = &self.chrome_driver {
            config.local.chrome_driver = path.clone();
        }
        if let Some(path) = &self.ie_driver {
            config.local.ie_driver = path.clone();
        }
        if let Some(dir) = &self.screenshot_dir {
            config.screenshot_dir = dir.clone();
        }
        config
    }
}
