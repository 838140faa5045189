//! Mapping client selectors onto the served directory tree.
//!
//! Resolution is pure path algebra and never touches the filesystem.

use std::path::{Path, PathBuf};

use log::warn;

use crate::{error::Error, utils::Result};

/// Resolve `selector` below `root`.
///
/// The selector is treated as rooted (`"/" + selector`) and normalized on
/// its own: empty and `.` segments are dropped, `..` removes the previous
/// segment. A `..` with nothing left to remove would climb above the root and
/// fails with [`Error::PathEscape`]. The joined result must still lie within
/// `root`, which is checked again after joining.
///
/// An empty selector resolves to `root` itself.
pub fn resolve(root: &Path, selector: &str) -> Result<PathBuf> {
    if !root.is_absolute() {
        return Err(Error::InvalidRoot {
            path: root.to_owned(),
            reason: "path is not absolute",
        });
    }

    let escape = || Error::PathEscape {
        selector: selector.to_owned(),
    };

    let mut segments: Vec<&str> = Vec::new();
    for segment in selector.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop().ok_or_else(escape)?;
            }
            _ => segments.push(segment),
        }
    }

    let mut path = root.to_path_buf();
    for segment in &segments {
        path.push(segment);
    }

    // A segment that the host reads as absolute or as a prefix
    // (e.g. `C:` on Windows) would replace the root when pushed.
    let expected = root.components().count() + segments.len();
    if !path.starts_with(root) || path.components().count() != expected {
        warn!(
            "selector {:?} expanded to {:?} outside of {:?}",
            selector, path, root
        );
        return Err(escape());
    }

    Ok(path)
}

/// Get the selector for `path`, which must lie within `root`.
pub fn selector_for(root: &Path, path: &Path) -> Result<String> {
    let relative = path.strip_prefix(root).map_err(|_| Error::PathEscape {
        selector: path.to_string_lossy().into_owned(),
    })?;
    Ok(crate::utils::to_selector(relative))
}
