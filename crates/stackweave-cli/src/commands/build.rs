//! `swv build`: Compose all units and write both artifacts.

use clap::Args;
use stackweave_common::config::ComposeConfig;
use stackweave_compose::pipeline::Composer;

use crate::output;

/// Arguments for the `build` command.
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Destination of the composed CloudFormation document.
    #[arg(long)]
    pub template_out: Option<std::path::PathBuf>,

    /// Destination of the composed API document.
    #[arg(long)]
    pub api_out: Option<std::path::PathBuf>,
}

/// Executes the `build` command.
///
/// Nothing is written unless every stage succeeds.
///
/// # Errors
///
/// Returns an error if loading, composition, validation or writing fails.
pub fn execute(args: &BuildArgs, mut config: ComposeConfig) -> anyhow::Result<()> {
    if let Some(path) = &args.template_out {
        config.output_template.clone_from(path);
    }
    if let Some(path) = &args.api_out {
        config.output_api.clone_from(path);
    }
    tracing::info!(units_dir = %config.units_dir.display(), "building");

    let composition = Composer::new(config)?.run()?;
    let report = &composition.report;

    println!("Composed {}", output::summary(report));
    output::print_divergences(report);
    for emitted in &report.emitted {
        let outcome = emitted.outcome.to_string();
        println!(
            "  {outcome:<9} {}  {}",
            output::short_digest(&emitted.digest),
            emitted.path.display()
        );
    }
    Ok(())
}
