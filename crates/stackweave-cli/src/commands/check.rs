//! `swv check`: Compose and validate without writing anything.

use clap::Args;
use stackweave_common::config::ComposeConfig;
use stackweave_compose::pipeline::Composer;

use crate::output;

/// Arguments for the `check` command.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Print the resource creation order.
    #[arg(long)]
    pub order: bool,
}

/// Executes the `check` command.
///
/// # Errors
///
/// Returns the first composition or validation error.
pub fn execute(args: &CheckArgs, config: ComposeConfig) -> anyhow::Result<()> {
    let composition = Composer::new(config)?.compose()?;
    let report = &composition.report;

    println!("OK: {}", output::summary(report));
    output::print_divergences(report);
    if args.order {
        println!();
        println!("Creation order:");
        for (i, logical_id) in report.resources.iter().enumerate() {
            println!("  {:>3}. {logical_id}", i + 1);
        }
    }
    Ok(())
}
