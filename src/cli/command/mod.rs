pub mod probe;
pub mod resize;

use crate::cli::command::probe::probe_command::ProbeArgs;
use crate::cli::command::resize::resize_command::ResizeArgs;
use crate::cli::to_args::ToArgs;
use arbitrary::Arbitrary;
use clap::Subcommand;
use std::ffi::OsString;

#[derive(Subcommand, Arbitrary, PartialEq, Debug)]
pub enum Command {
    /// Resize pictures in place (destructive: originals are overwritten)
    Resize(ResizeArgs),

    /// Probe image dimensions and preview target sizes without writing
    Probe(ProbeArgs),
}

impl Command {
    /// # Errors
    ///
    /// Returns an error if the invoked command fails.
    pub fn invoke(self) -> eyre::Result<()> {
        match self {
            Command::Resize(args) => args.invoke(),
            Command::Probe(args) => args.invoke(),
        }
    }
}

impl ToArgs for Command {
    fn to_args(&self) -> Vec<OsString> {
        let mut args = Vec::new();
        match self {
            Command::Resize(resize_args) => {
                args.push("resize".into());
                args.extend(resize_args.to_args());
            }
            Command::Probe(probe_args) => {
                args.push("probe".into());
                args.extend(probe_args.to_args());
            }
        }
        args
    }
}
