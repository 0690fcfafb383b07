use crate::cli::policy_args::PolicyArgs;
use crate::cli::to_args::ToArgs;
use crate::controller::BatchController;
use crate::controller::ControllerEvent;
use crate::policy::ResizePolicy;
use arbitrary::Arbitrary;
use clap::Args;
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

const EVENT_TIMEOUT: Duration = Duration::from_secs(300);

/// Probe image dimensions without modifying any file
#[derive(Args, Arbitrary, Clone, PartialEq, Debug)]
pub struct ProbeArgs {
    /// Files or directories to probe (directories are walked recursively)
    pub paths: Vec<PathBuf>,

    #[clap(flatten)]
    pub policy: PolicyArgs,
}

impl ProbeArgs {
    /// # Errors
    ///
    /// Returns an error if no paths are given or the probe cannot be driven
    /// to completion.
    pub fn invoke(self) -> eyre::Result<()> {
        eyre::ensure!(!self.paths.is_empty(), "no files or directories given");
        // Policy is optional here: without one, only original sizes print.
        // Percentage(100) computes targets equal to the originals
        let policy = match (&self.policy.percentage, &self.policy.max_size) {
            (None, None) => None,
            _ => Some(self.policy.resolve()?),
        };
        let mut controller =
            BatchController::new(policy.unwrap_or(ResizePolicy::Percentage(100)));

        let submitted = controller.drop_paths(&self.paths)?;
        if submitted == 0 {
            println!("Nothing to probe.");
            return Ok(());
        }

        let failures = loop {
            match controller.next_event(EVENT_TIMEOUT) {
                Some(ControllerEvent::Probing(path)) => debug!("Probing {}", path.display()),
                Some(ControllerEvent::IntakeFinished { failures }) => break failures,
                Some(_) => {}
                None => eyre::bail!("timed out waiting for the intake worker"),
            }
        };

        for entry in controller.pending() {
            if policy.is_some() {
                println!(
                    "{}  {}x{} -> {}x{}",
                    entry.path.display(),
                    entry.original.0,
                    entry.original.1,
                    entry.target.0,
                    entry.target.1,
                );
            } else {
                println!(
                    "{}  {}x{}",
                    entry.path.display(),
                    entry.original.0,
                    entry.original.1,
                );
            }
        }

        if !failures.is_empty() {
            println!("Some files couldn't be opened:");
            for path in &failures {
                println!("  {}", path.display());
            }
        }
        Ok(())
    }
}

impl ToArgs for ProbeArgs {
    fn to_args(&self) -> Vec<OsString> {
        let mut args = Vec::new();
        args.extend(self.policy.to_args());
        for path in &self.paths {
            args.push(path.clone().into());
        }
        args
    }
}
