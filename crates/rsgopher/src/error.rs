//! Error types and the Gopher+ error code alphabet.

use std::{fmt, io, path::PathBuf, time::Duration};

use thiserror::Error;

/// Error codes carried by Gopher+ `--1` responses.
///
/// Codes 1-3 are defined by Gopher+; there is no list of commonly used
/// codes beyond that, so `4` is taken for everything else.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum ErrorCode {
    ItemNotFound = 1,
    TemporaryError = 2,
    ItemMoved = 3,
    Unknown = 4,
}

impl ErrorCode {
    /// Get the numeric wire value.
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Everything that can go wrong while serving a request.
#[derive(Debug, Error)]
pub enum Error {
    /// The configured root is not an absolute path to an existing directory.
    #[error("invalid root directory {}: {reason}", path.display())]
    InvalidRoot { path: PathBuf, reason: &'static str },

    /// The selector normalizes to a location outside the root.
    #[error("selector {selector:?} escapes the root directory")]
    PathEscape { selector: String },

    /// The resolved path does not exist or may not be read.
    #[error("{} not found", .0.display())]
    NotFound(PathBuf),

    /// A directory entry could not be statted while building a listing.
    #[error("cannot stat {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The client sent more than the allowed number of bytes without a terminator.
    #[error("selector exceeds {0} bytes")]
    SelectorTooLong(usize),

    /// The client did not finish its selector in time.
    #[error("selector not received within {0:?}")]
    SelectorTimeout(Duration),

    /// An item is missing a required field or has a field that breaks the line format.
    #[error("invalid item: {0}")]
    InvalidItem(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Get the Gopher+ error code reported to the client for this error.
    ///
    /// Escapes are reported exactly like missing items so clients cannot
    /// probe the layout outside the root.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Error::PathEscape { .. } | Error::NotFound(_) | Error::Unreadable { .. } => {
                ErrorCode::ItemNotFound
            }
            Error::Io(_) => ErrorCode::TemporaryError,
            Error::SelectorTooLong(_)
            | Error::SelectorTimeout(_)
            | Error::InvalidItem(_)
            | Error::InvalidRoot { .. } => ErrorCode::Unknown,
        }
    }

    /// Whether this error is a server-side bug or misconfiguration rather
    /// than something caused by the client or the environment.
    pub fn is_internal(&self) -> bool {
        matches!(self, Error::InvalidItem(_) | Error::InvalidRoot { .. })
    }

    /// Classify an I/O error raised while looking up `path`.
    ///
    /// Every failure that means the selector can never name an item reads as
    /// "not found": missing or forbidden paths, a file used as a directory, a
    /// name the filesystem cannot represent and symlink loops. Anything else
    /// stays [`Error::Io`].
    pub fn from_lookup(path: impl Into<PathBuf>, e: io::Error) -> Error {
        if names_no_item(&e) {
            Error::NotFound(path.into())
        } else {
            Error::Io(e)
        }
    }
}

fn names_no_item(e: &io::Error) -> bool {
    match e.kind() {
        io::ErrorKind::NotFound
        | io::ErrorKind::PermissionDenied
        | io::ErrorKind::NotADirectory
        | io::ErrorKind::InvalidFilename
        | io::ErrorKind::InvalidInput => true,
        _ => is_symlink_loop(e),
    }
}

#[cfg(unix)]
fn is_symlink_loop(e: &io::Error) -> bool {
    use nix::errno::Errno;

    e.raw_os_error().map(Errno::from_raw) == Some(Errno::ELOOP)
}

#[cfg(not(unix))]
fn is_symlink_loop(_: &io::Error) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_codes() {
        assert_eq!(ErrorCode::ItemNotFound.code(), 1);
        assert_eq!(ErrorCode::TemporaryError.code(), 2);
        assert_eq!(ErrorCode::ItemMoved.code(), 3);
        assert_eq!(ErrorCode::Unknown.to_string(), "4");
    }

    #[test]
    fn escape_reads_as_not_found() {
        let escape = Error::PathEscape {
            selector: "../etc/passwd".to_owned(),
        };
        assert_eq!(escape.error_code(), ErrorCode::ItemNotFound);
        assert_eq!(
            Error::NotFound(PathBuf::from("/srv/x")).error_code(),
            ErrorCode::ItemNotFound
        );
    }

    #[test]
    fn abusive_clients_get_unknown() {
        assert_eq!(Error::SelectorTooLong(16).error_code(), ErrorCode::Unknown);
        assert_eq!(
            Error::SelectorTimeout(Duration::from_secs(1)).error_code(),
            ErrorCode::Unknown
        );
        assert!(!Error::SelectorTooLong(16).is_internal());
    }

    #[test]
    fn invalid_item_is_internal() {
        let e = Error::InvalidItem("host missing");
        assert_eq!(e.error_code(), ErrorCode::Unknown);
        assert!(e.is_internal());
    }

    #[test]
    fn lookup_classification() {
        let denied = io::Error::from(io::ErrorKind::PermissionDenied);
        assert!(matches!(
            Error::from_lookup("/srv/a", denied),
            Error::NotFound(_)
        ));
        let other = io::Error::from(io::ErrorKind::BrokenPipe);
        let e = Error::from_lookup("/srv/a", other);
        assert!(matches!(e, Error::Io(_)));
        assert_eq!(e.error_code(), ErrorCode::TemporaryError);
    }

    #[test]
    fn unnameable_paths_are_not_found() {
        for kind in [
            io::ErrorKind::NotADirectory,
            io::ErrorKind::InvalidFilename,
            io::ErrorKind::InvalidInput,
        ] {
            let e = Error::from_lookup("/srv/a.txt/foo", io::Error::from(kind));
            assert!(matches!(e, Error::NotFound(_)), "{kind:?}");
        }
    }

    #[cfg(unix)]
    #[test]
    fn symlink_loop_is_not_found() {
        let e = io::Error::from_raw_os_error(nix::errno::Errno::ELOOP as i32);
        assert!(matches!(
            Error::from_lookup("/srv/loop", e),
            Error::NotFound(_)
        ));
        let e = io::Error::from_raw_os_error(nix::errno::Errno::EMFILE as i32);
        assert!(matches!(Error::from_lookup("/srv/a", e), Error::Io(_)));
    }
}
