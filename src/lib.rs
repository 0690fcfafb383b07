#![deny(clippy::disallowed_methods)]

pub mod cli;
pub mod controller;
pub mod expand;
pub mod formats;
pub mod policy;
pub mod tracing;
pub mod worker;

use crate::cli::Cli;
use clap::CommandFactory;
use clap::FromArgMatches;
pub use controller::BatchController;
pub use controller::BatchOutcome;
pub use controller::ControllerEvent;
pub use controller::FileEntry;
pub use controller::Rejection;
pub use policy::ResizePolicy;

/// Entrypoint shared by the binary and integration tests.
///
/// # Errors
///
/// Returns an error if tracing setup or the invoked command fails.
pub fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::command();
    let cli = Cli::from_arg_matches(&cli.get_matches())?;

    crate::tracing::init_tracing(cli.global_args.log_level())?;

    cli.invoke()?;
    Ok(())
}
