//! Filename collision resolution for downloaded icons
//!
//! Given a base name and extension, decides which filename an icon should be
//! written to under the configured [`FileCollisionAction`]. The outcome is an
//! explicit tri-state [`Resolution`] consumed by ordinary branching; a
//! collision is not an error.
//!
//! The existence probe and the subsequent file creation form a
//! check-then-act sequence: two workers resolving the same base name
//! concurrently could otherwise observe the same free index. Callers
//! serialize the probe-and-create critical section (the item worker holds a
//! shared lock across resolve and write).

use crate::config::FileCollisionAction;
use std::path::{Path, PathBuf};

/// Maximum number of rename attempts when resolving file collisions
const MAX_RENAME_ATTEMPTS: u32 = 9999;

/// Outcome of resolving an output filename
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// Write to this path
    Resolved(PathBuf),
    /// The file exists and the strategy keeps it; report the item as skipped
    Skip,
    /// Every candidate name up to the probe limit is taken
    Conflict,
}

/// Resolve the output path for `name` + `ext` inside `dir`
///
/// The base name is used exactly as given; characters that are unsafe in a
/// path are the caller's responsibility. An extension without a leading dot
/// gets one.
///
/// - No file at `{dir}/{name}{ext}` → `Resolved` with that path, whatever
///   the action (fast path).
/// - [`FileCollisionAction::Skip`] → [`Resolution::Skip`].
/// - [`FileCollisionAction::Overwrite`] → `Resolved` with the original path.
/// - [`FileCollisionAction::Rename`] → probe `pattern` with index 1, 2, 3, …
///   and return the first free name; [`Resolution::Conflict`] after 9999
///   taken candidates.
///
/// `pattern` uses `{name}`, `{index}` and `{ext}` placeholders, e.g. the
/// default `{name}_{index}{ext}` turns `foo` + `.png` into `foo_1.png`.
pub fn resolve_collision(
    dir: &Path,
    name: &str,
    ext: &str,
    action: FileCollisionAction,
    pattern: &str,
) -> Resolution {
    let ext = normalize_ext(ext);
    let original = dir.join(format!("{name}{ext}"));

    if !original.exists() {
        return Resolution::Resolved(original);
    }

    match action {
        FileCollisionAction::Overwrite => Resolution::Resolved(original),
        FileCollisionAction::Skip => Resolution::Skip,
        FileCollisionAction::Rename => probe_rename(dir, name, &ext, pattern, MAX_RENAME_ATTEMPTS),
    }
}

/// Probe the rename pattern for the first unused index
fn probe_rename(dir: &Path, name: &str, ext: &str, pattern: &str, max_attempts: u32) -> Resolution {
    for index in 1..=max_attempts {
        let candidate = dir.join(format_rename(pattern, name, index, ext));
        if !candidate.exists() {
            return Resolution::Resolved(candidate);
        }
    }
    Resolution::Conflict
}

/// Expand the `{name}`/`{index}`/`{ext}` placeholders in a rename pattern
fn format_rename(pattern: &str, name: &str, index: u32, ext: &str) -> String {
    pattern
        .replace("{name}", name)
        .replace("{index}", &index.to_string())
        .replace("{ext}", ext)
}

fn normalize_ext(ext: &str) -> String {
    if ext.is_empty() || ext.starts_with('.') {
        ext.to_string()
    } else {
        format!(".{ext}")
    }
}
