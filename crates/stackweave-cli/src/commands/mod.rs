//! CLI command definitions and dispatch.

pub mod build;
pub mod check;
pub mod new;
pub mod routes;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use stackweave_common::config::ComposeConfig;
use stackweave_common::constants;
use stackweave_common::types::OutputFormat;

/// Compose serverless fragments into deployable templates.
#[derive(Parser, Debug)]
#[command(name = constants::BIN_NAME, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Project configuration file. Defaults to `stackweave.yaml` when present.
    #[arg(long, short, global = true, env = "STACKWEAVE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Environment name bound to `{{env}}`.
    #[arg(long = "env", global = true, env = "STACKWEAVE_ENV")]
    pub environment: Option<String>,

    /// Application name bound to `{{app}}`.
    #[arg(long = "app", global = true, env = "STACKWEAVE_APP")]
    pub app_name: Option<String>,

    /// Directory holding one subdirectory per unit.
    #[arg(long, global = true, env = "STACKWEAVE_UNITS_DIR")]
    pub units_dir: Option<PathBuf>,

    /// Output format of both artifacts (json or yaml).
    #[arg(long, global = true)]
    pub format: Option<OutputFormat>,

    /// Fail when a fragment overrides a skeleton value with a different one.
    #[arg(long, global = true)]
    pub strict: bool,

    /// Log line format written to stderr.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per line.
    Json,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compose all units and write both artifacts.
    Build(build::BuildArgs),
    /// Compose and validate without writing anything.
    Check(check::CheckArgs),
    /// Print the composed route table.
    Routes(routes::RoutesArgs),
    /// Scaffold a new unit fragment.
    New(new::NewArgs),
}

impl Cli {
    /// Loads the project configuration and applies command line overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be loaded or the
    /// resulting configuration is invalid.
    pub fn resolve_config(&self) -> anyhow::Result<ComposeConfig> {
        let mut config = match &self.config {
            Some(path) => load_file(path)?,
            None => {
                let default = Path::new(constants::DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    load_file(default)?
                } else {
                    tracing::debug!("no project file, using defaults");
                    ComposeConfig::default()
                }
            }
        };

        if let Some(environment) = &self.environment {
            config.environment.clone_from(environment);
        }
        if let Some(app_name) = &self.app_name {
            config.app_name.clone_from(app_name);
        }
        if let Some(units_dir) = &self.units_dir {
            config.units_dir.clone_from(units_dir);
        }
        if let Some(format) = self.format {
            config.format = format;
        }
        if self.strict {
            config.strict_divergence = true;
        }

        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

fn load_file(path: &Path) -> anyhow::Result<ComposeConfig> {
    ComposeConfig::load(path)
        .with_context(|| format!("failed to load project file {}", path.display()))
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if configuration loading or the command fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    let config = cli.resolve_config()?;
    match cli.command {
        Command::Build(args) => build::execute(&args, config),
        Command::Check(args) => check::execute(&args, config),
        Command::Routes(args) => routes::execute(&args, config),
        Command::New(args) => new::execute(&args, &config),
    }
}
