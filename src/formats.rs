//! Which files the pipeline is willing to rewrite.

use std::path::Path;

/// Extensions the probe recognises as images.
const DECODABLE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "bmp", "webp", "tiff", "tif", "gif", "pbm", "pgm",
];

/// Decodable but not round-trippable: these load fine but can't be written
/// back in their own format, so they stay out of the resizable set.
const READ_ONLY_EXTENSIONS: &[&str] = &["gif", "pbm", "pgm"];

/// Returns true if the path's extension is one we can both decode and
/// re-encode in place.
#[must_use]
pub fn is_resizable(path: &Path) -> bool {
    let Some(ext) = extension_lowercase(path) else {
        return false;
    };
    DECODABLE_EXTENSIONS.contains(&ext.as_str()) && !READ_ONLY_EXTENSIONS.contains(&ext.as_str())
}

fn extension_lowercase(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|s| s.to_str())
        .map(str::to_ascii_lowercase)
}
