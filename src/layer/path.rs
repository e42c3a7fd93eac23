//! Search-path composition
//!
//! Activation never touches the process environment. Layers collect the
//! directories they want on `PATH` and callers compose the final value.
//! Values stay `OsString` throughout so a non-UTF-8 `PATH` survives intact.

use crate::error::{ScarbError, ScarbResult};
use std::ffi::{OsStr, OsString};
use std::io;
use std::path::PathBuf;

/// Separator the lifecycle uses when prepending to `PATH`
#[cfg(unix)]
pub const PATH_DELIMITER: &str = ":";
#[cfg(not(unix))]
pub const PATH_DELIMITER: &str = ";";

/// Push `dir` unless an equal entry is already present
pub fn append_if_absent(dirs: &mut Vec<PathBuf>, dir: PathBuf) {
    if !dirs.contains(&dir) {
        dirs.push(dir);
    }
}

/// Put `dirs` in front of an existing `PATH` value.
///
/// Entries already in `existing` are not repeated, so composing twice gives
/// the same result as composing once.
pub fn prepend_to(existing: Option<&OsStr>, dirs: &[PathBuf]) -> ScarbResult<OsString> {
    let current: Vec<PathBuf> = existing
        .map(|p| {
            std::env::split_paths(p)
                .filter(|d| !d.as_os_str().is_empty())
                .collect()
        })
        .unwrap_or_default();

    let mut entries: Vec<PathBuf> = Vec::with_capacity(dirs.len() + current.len());
    for dir in dirs {
        if !current.contains(dir) {
            append_if_absent(&mut entries, dir.clone());
        }
    }
    entries.extend(current);

    std::env::join_paths(entries).map_err(|e| {
        ScarbError::io(
            "composing PATH",
            io::Error::new(io::ErrorKind::InvalidInput, e),
        )
    })
}

/// Join directories into one `PATH`-style value
pub fn join_dirs(dirs: &[PathBuf]) -> ScarbResult<OsString> {
    prepend_to(None, dirs)
}

/// `PATH` for a child process: the layer directories ahead of the inherited value
pub fn child_path(dirs: &[PathBuf]) -> ScarbResult<OsString> {
    prepend_to(std::env::var_os("PATH").as_deref(), dirs)
}
