use std::path::{Path, PathBuf};

/// Directory served when none is configured: `~/.gopher`.
pub fn default_root() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".gopher"))
}

/// Replace a leading `~` with the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_owned(),
        },
        Err(_) => path.to_owned(),
    }
}
