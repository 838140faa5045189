//! Read-only server configuration shared by every connection.

use std::{path::PathBuf, time::Duration};

use crate::{error::Error, utils::Result};

/// Standard Gopher port. Binding to it usually requires elevated privileges.
pub const DEFAULT_PORT: u16 = 70;

/// Listen on every IPv4 interface by default.
pub const DEFAULT_ADDRESS: &str = "0.0.0.0";

/// Contact shown to clients in error responses.
pub const DEFAULT_ADMIN: &str = "root@localhost";

/// Upper bound on the raw request, terminator included.
pub const DEFAULT_MAX_SELECTOR_LEN: usize = 4096;

/// Time a client has to send its complete selector.
pub const DEFAULT_SELECTOR_TIMEOUT: Duration = Duration::from_secs(5);

/// Time to wait for a Gopher+ `\t+` after a complete `\r\n`.
pub const DEFAULT_TERMINATOR_GRACE: Duration = Duration::from_millis(100);

/// Server configuration.
///
/// Built once at startup and then only read. Connection tasks share it
/// through an `Arc`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Absolute path of the directory being served.
    pub root: PathBuf,
    /// Address the listener binds to.
    pub address: String,
    /// Host name placed in gophermap items. Falls back to `address` when empty.
    pub hostname: String,
    /// Port the listener binds to and that items advertise.
    /// `0` asks the OS for an ephemeral port, which is written back after binding.
    pub port: u16,
    /// Administrator contact included in error responses.
    pub admin: String,
    /// Maximum number of request bytes accepted before a terminator.
    pub max_selector_len: usize,
    /// Cumulative time allowed for receiving the selector.
    pub selector_timeout: Duration,
    /// Lookahead window for the Gopher+ marker, never longer than `selector_timeout`.
    pub terminator_grace: Duration,
}

impl Config {
    pub fn new(root: impl Into<PathBuf>) -> Config {
        Config {
            root: root.into(),
            address: DEFAULT_ADDRESS.to_owned(),
            hostname: String::new(),
            port: DEFAULT_PORT,
            admin: DEFAULT_ADMIN.to_owned(),
            max_selector_len: DEFAULT_MAX_SELECTOR_LEN,
            selector_timeout: DEFAULT_SELECTOR_TIMEOUT,
            terminator_grace: DEFAULT_TERMINATOR_GRACE,
        }
    }

    /// Host name advertised in gophermap items.
    pub fn advertised_host(&self) -> &str {
        if self.hostname.is_empty() {
            &self.address
        } else {
            &self.hostname
        }
    }

    /// `address:port` string suitable for binding.
    pub fn bind_addr(&self) -> String {
        if self.address.contains(':') && !self.address.starts_with('[') {
            format!("[{}]:{}", self.address, self.port)
        } else {
            format!("{}:{}", self.address, self.port)
        }
    }

    /// Check that the root is an absolute path to an existing directory.
    pub fn validate(&self) -> Result<()> {
        if !self.root.is_absolute() {
            return Err(Error::InvalidRoot {
                path: self.root.clone(),
                reason: "path is not absolute",
            });
        }
        match std::fs::metadata(&self.root) {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(Error::InvalidRoot {
                path: self.root.clone(),
                reason: "path is not a directory",
            }),
            Err(_) => Err(Error::InvalidRoot {
                path: self.root.clone(),
                reason: "path cannot be read",
            }),
        }
    }
}
