//! Expansion of dropped paths into a flat, ordered file list.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use tracing::warn;

/// Flatten a set of roots (files and/or directories) into an ordered,
/// de-duplicated list of regular files.
///
/// File roots keep their input order. Directory roots are enumerated
/// name-ascending and depth-first, descending into subdirectories in place.
/// Paths are normalized with `dunce::canonicalize` before de-duplication, so
/// the same file reached through two spellings is only listed once.
///
/// Roots that are neither a file nor a directory are passed through as-is;
/// the intake probe will report them as failures, which is more useful than
/// dropping a typo silently.
#[must_use]
pub fn expand(roots: &[PathBuf]) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    let mut visited_dirs = HashSet::new();
    let mut out = Vec::new();
    for root in roots {
        let root = normalize(root);
        if root.is_dir() {
            expand_dir(&root, &mut seen, &mut visited_dirs, &mut out);
        } else {
            push_unique(root, &mut seen, &mut out);
        }
    }
    out
}

fn expand_dir(
    dir: &Path,
    seen: &mut HashSet<PathBuf>,
    visited_dirs: &mut HashSet<PathBuf>,
    out: &mut Vec<PathBuf>,
) {
    // Symlink cycles would otherwise recurse forever
    if !visited_dirs.insert(dir.to_path_buf()) {
        return;
    }

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Failed to read dir {}: {}", dir.display(), e);
            return;
        }
    };

    let mut children: Vec<PathBuf> = Vec::new();
    for entry in entries {
        match entry {
            Ok(ent) => children.push(ent.path()),
            Err(e) => {
                warn!("Failed to read dir entry in {}: {}", dir.display(), e);
            }
        }
    }
    children.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    for child in children {
        if child.is_dir() {
            let child = normalize(&child);
            expand_dir(&child, seen, visited_dirs, out);
        } else if child.is_file() {
            push_unique(normalize(&child), seen, out);
        }
    }
}

fn push_unique(path: PathBuf, seen: &mut HashSet<PathBuf>, out: &mut Vec<PathBuf>) {
    if seen.insert(path.clone()) {
        out.push(path);
    }
}

/// Canonicalize where possible; nonexistent paths come back unchanged so the
/// caller can still report on them.
fn normalize(path: &Path) -> PathBuf {
    dunce::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
