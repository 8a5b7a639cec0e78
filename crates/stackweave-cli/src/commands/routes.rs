//! `swv routes`: Print the composed route table.

use clap::Args;
use stackweave_common::config::ComposeConfig;
use stackweave_compose::merger::Route;
use stackweave_compose::pipeline::Composer;

use crate::output;

/// Arguments for the `routes` command.
#[derive(Args, Debug)]
pub struct RoutesArgs {
    /// Print the table as a JSON array.
    #[arg(long)]
    pub json: bool,
}

/// Executes the `routes` command.
///
/// # Errors
///
/// Returns an error if composition fails or the table cannot be serialized.
pub fn execute(args: &RoutesArgs, config: ComposeConfig) -> anyhow::Result<()> {
    let composition = Composer::new(config)?.compose()?;
    let routes = &composition.report.routes;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&routes_json(routes))?);
    } else {
        print!("{}", output::format_table(&["METHOD", "PATH", "UNIT"], &rows(routes)));
    }
    Ok(())
}

fn rows(routes: &[Route]) -> Vec<Vec<String>> {
    routes
        .iter()
        .map(|r| vec![r.method.to_string(), r.path.clone(), r.owner.clone()])
        .collect()
}

fn routes_json(routes: &[Route]) -> serde_json::Value {
    routes
        .iter()
        .map(|r| serde_json::json!({"path": r.path, "method": r.method.as_key(), "unit": r.owner}))
        .collect()
}
