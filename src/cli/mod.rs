//! cli
//!
//! Command-line interface layer for forksync.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Set up logging and load configuration
//! - Delegate to command handlers
//!
//! # Architecture
//!
//! The CLI layer is thin. It parses arguments via clap, builds a [`Context`]
//! and dispatches to [`commands`]. All hosting-side work goes through
//! [`crate::fork::ForkManager`].

pub mod args;
pub mod commands;

pub use args::Cli;

use anyhow::{Context as _, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::core::config::Config;

/// Settings shared by every command.
pub struct Context {
    /// Minimal output
    pub quiet: bool,
    /// Token from `--token`, if given
    pub token: Option<String>,
    /// API base from `--api-base`, if given
    pub api_base: Option<String>,
    /// Loaded configuration
    pub config: Config,
}

impl Context {
    /// API base URL: `--api-base`, else the config file, else GitHub.
    pub fn api_base(&self) -> &str {
        self.api_base
            .as_deref()
            .unwrap_or_else(|| self.config.api_base())
    }
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();
    init_logging(cli.debug, cli.quiet);

    let config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(path) = config.loaded_from() {
        tracing::debug!(path = %path.display(), "using config file");
    }

    let ctx = Context {
        quiet: cli.quiet,
        token: cli.token,
        api_base: cli.api_base,
        config,
    };

    commands::dispatch(cli.command, &ctx)
}

/// Install the stderr log subscriber.
///
/// `--debug` forces debug level and `--quiet` forces errors only; otherwise
/// `RUST_LOG` is honored with `info` as the default.
fn init_logging(debug: bool, quiet: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else if quiet {
        EnvFilter::new("error")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    // A subscriber may already be installed when running under a test harness.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}
