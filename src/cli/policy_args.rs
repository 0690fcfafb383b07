use crate::cli::to_args::ToArgs;
use crate::policy::ResizePolicy;
use arbitrary::Arbitrary;
use clap::Args;
use std::ffi::OsString;

/// The two resizing methods, mirrored as flags. Validation happens in
/// `resolve` rather than in clap so rejection messages stay consistent with
/// the rest of the pipeline's error reporting.
#[derive(Args, Arbitrary, Clone, PartialEq, Debug, Default)]
pub struct PolicyArgs {
    /// Scale both dimensions by this percentage (values above 100 enlarge)
    #[clap(long)]
    pub percentage: Option<u32>,

    /// Fit the longer side to this many pixels, preserving aspect ratio
    #[clap(long)]
    pub max_size: Option<u32>,
}

impl PolicyArgs {
    /// # Errors
    ///
    /// Returns an error when both or neither method is given, or when the
    /// parameter is zero.
    pub fn resolve(&self) -> eyre::Result<ResizePolicy> {
        match (self.percentage, self.max_size) {
            (Some(_), Some(_)) => {
                eyre::bail!("--percentage and --max-size are mutually exclusive")
            }
            (Some(pct), None) => {
                eyre::ensure!(pct >= 1, "--percentage must be at least 1");
                Ok(ResizePolicy::Percentage(pct))
            }
            (None, Some(max_dim)) => {
                eyre::ensure!(max_dim >= 1, "--max-size must be at least 1");
                Ok(ResizePolicy::AbsoluteMax(max_dim))
            }
            (None, None) => eyre::bail!("choose a resizing method: --percentage or --max-size"),
        }
    }
}

impl ToArgs for PolicyArgs {
    fn to_args(&self) -> Vec<OsString> {
        let mut args = Vec::new();
        if let Some(pct) = self.percentage {
            args.push("--percentage".into());
            args.push(pct.to_string().into());
        }
        if let Some(max_dim) = self.max_size {
            args.push("--max-size".into());
            args.push(max_dim.to_string().into());
        }
        args
    }
}
