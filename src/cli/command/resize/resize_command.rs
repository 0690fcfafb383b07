use crate::cli::policy_args::PolicyArgs;
use crate::cli::to_args::ToArgs;
use crate::controller::BatchController;
use crate::controller::BatchOutcome;
use crate::controller::ControllerEvent;
use arbitrary::Arbitrary;
use clap::Args;
use std::ffi::OsString;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// Upper bound on the gap between two worker events; a single huge image can
/// take a while to decode, so this is generous.
const EVENT_TIMEOUT: Duration = Duration::from_secs(300);

/// Resize pictures in place
#[derive(Args, Arbitrary, Clone, PartialEq, Debug)]
pub struct ResizeArgs {
    /// Files or directories to resize (directories are walked recursively)
    pub paths: Vec<PathBuf>,

    #[clap(flatten)]
    pub policy: PolicyArgs,

    /// Overwrite without asking for confirmation
    #[clap(long)]
    pub yes: bool,
}

impl ResizeArgs {
    /// # Errors
    ///
    /// Returns an error if no paths are given, the policy flags are invalid,
    /// or the pipeline cannot be driven to completion.
    pub fn invoke(self) -> eyre::Result<()> {
        eyre::ensure!(!self.paths.is_empty(), "no files or directories given");
        let policy = self.policy.resolve()?;

        let mut controller = BatchController::new(policy);
        let submitted = controller.drop_paths(&self.paths)?;
        if submitted == 0 {
            println!("Nothing to do.");
            return Ok(());
        }

        let failures = drain_intake(&mut controller)?;
        if !failures.is_empty() {
            println!("Some files couldn't be opened:");
            for path in &failures {
                println!("  {}", path.display());
            }
        }

        if controller.pending().is_empty() {
            println!("No resizable images found.");
            return Ok(());
        }

        println!("About to resize ({policy}):");
        for entry in controller.pending() {
            println!(
                "  {}  {}x{} -> {}x{}",
                entry.path.display(),
                entry.original.0,
                entry.original.1,
                entry.target.0,
                entry.target.1,
            );
        }

        // The overwrite is destructive, so anything short of an explicit yes
        // aborts
        if !self.yes && !confirm_overwrite(controller.pending().len())? {
            println!("Aborted, nothing was modified.");
            return Ok(());
        }

        // Ctrl-C stops the batch at the next item boundary instead of
        // killing the process mid-write. A handler can only be installed
        // once per process; a repeat is harmless
        let cancel = controller.cancel_handle();
        if let Err(e) = ctrlc::set_handler(move || cancel.cancel()) {
            debug!("Ctrl-C handler not installed: {e}");
        }

        controller.start_resize()?;
        report_resize(&mut controller)
    }
}

fn drain_intake(controller: &mut BatchController) -> eyre::Result<Vec<PathBuf>> {
    loop {
        match controller.next_event(EVENT_TIMEOUT) {
            Some(ControllerEvent::Probing(path)) => debug!("Probing {}", path.display()),
            Some(ControllerEvent::IntakeFinished { failures }) => return Ok(failures),
            Some(_) => {}
            None => eyre::bail!("timed out waiting for the intake worker"),
        }
    }
}

fn report_resize(controller: &mut BatchController) -> eyre::Result<()> {
    loop {
        match controller.next_event(EVENT_TIMEOUT) {
            Some(ControllerEvent::Resizing(path)) => {
                println!("Resizing {}", path.display());
            }
            Some(ControllerEvent::ResizeFinished { outcome, failures }) => {
                if !failures.is_empty() {
                    println!("Some files couldn't be resized:");
                    for path in &failures {
                        println!("  {}", path.display());
                    }
                } else if outcome == BatchOutcome::Completed {
                    println!("Resizing successful!");
                }
                if outcome == BatchOutcome::Aborted {
                    println!("Resizing cancelled.");
                }
                return Ok(());
            }
            Some(_) => {}
            None => eyre::bail!("timed out waiting for the resize worker"),
        }
    }
}

fn confirm_overwrite(count: usize) -> eyre::Result<bool> {
    print!("Overwrite {count} file(s) in place? [y/N] ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(is_affirmative(&line))
}

fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

impl ToArgs for ResizeArgs {
    fn to_args(&self) -> Vec<OsString> {
        let mut args = Vec::new();
        args.extend(self.policy.to_args());
        if self.yes {
            args.push("--yes".into());
        }
        for path in &self.paths {
            args.push(path.clone().into());
        }
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn only_an_explicit_yes_is_affirmative() {
        assert!(is_affirmative("y\n"));
        assert!(is_affirmative("Yes\n"));
        assert!(!is_affirmative("\n"));
        assert!(!is_affirmative("")); // EOF on stdin
        assert!(!is_affirmative("n\n"));
        assert!(!is_affirmative("yeah\n"));
    }

    #[test]
    fn invoke_with_yes_rewrites_files() -> eyre::Result<()> {
        let td = tempdir()?;
        let img = td.path().join("a.png");
        image::RgbImage::new(40, 20).save(&img)?;

        ResizeArgs {
            paths: vec![img.clone()],
            policy: PolicyArgs {
                percentage: Some(50),
                max_size: None,
            },
            yes: true,
        }
        .invoke()?;

        assert_eq!(image::image_dimensions(&img)?, (20, 10));
        Ok(())
    }

    #[test]
    fn invoke_without_paths_is_an_error() {
        let result = ResizeArgs {
            paths: vec![],
            policy: PolicyArgs {
                percentage: Some(50),
                max_size: None,
            },
            yes: true,
        }
        .invoke();
        assert!(result.is_err());
    }

    #[test]
    fn unopenable_files_do_not_fail_the_run() -> eyre::Result<()> {
        let td = tempdir()?;
        let img = td.path().join("a.png");
        let junk = td.path().join("notes.txt");
        image::RgbImage::new(10, 10).save(&img)?;
        std::fs::write(&junk, "plain text")?;

        ResizeArgs {
            paths: vec![img.clone(), junk.clone()],
            policy: PolicyArgs {
                percentage: Some(50),
                max_size: None,
            },
            yes: true,
        }
        .invoke()?;

        assert_eq!(image::image_dimensions(&img)?, (5, 5));
        assert_eq!(std::fs::read_to_string(&junk)?, "plain text");
        Ok(())
    }
}
