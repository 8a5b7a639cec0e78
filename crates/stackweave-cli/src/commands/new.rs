//! `swv new`: Scaffold a new unit fragment.

use clap::Args;
use stackweave_common::config::ComposeConfig;

/// Arguments for the `new` command.
#[derive(Args, Debug)]
pub struct NewArgs {
    /// Name of the unit; becomes its directory name.
    pub name: String,
}

/// Executes the `new` command.
///
/// # Errors
///
/// Returns an error if the name is invalid, the unit already exists or the
/// fragment cannot be written.
pub fn execute(args: &NewArgs, config: &ComposeConfig) -> anyhow::Result<()> {
    let path = stackweave_compose::scaffold::scaffold_unit(config, &args.name)?;
    println!("Created {}", path.display());
    Ok(())
}
