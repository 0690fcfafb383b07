use std::ffi::OsString;

/// Inverse of clap parsing: turn a parsed argument struct back into the
/// argument vector that produces it. Lets tests round-trip arbitrary CLI
/// instances through the parser.
pub trait ToArgs {
    fn to_args(&self) -> Vec<OsString>;
}
