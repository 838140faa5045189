//! Server settings from the command line, the environment and a TOML file.
//!
//! Precedence, highest first: flags, `GOPHERD_*` variables, the configuration
//! file, built-in defaults.

use {
    crate::utils,
    anyhow::{Context, bail},
    log::info,
    rsgopher::Config,
    serde::Deserialize,
    std::{
        path::{Path, PathBuf},
        time::Duration,
    },
};

/// File name searched for in the standard configuration directories.
pub const CONFIG_NAME: &str = "gopherd.toml";

// Every field is optional so that sources can be layered with `Settings::or`.
#[derive(Debug, Default, Clone, PartialEq, Eq, clap::Args, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Directory to serve [default: ~/.gopher]
    #[arg(short = 'g', long, env = "GOPHERD_ROOT")]
    pub root: Option<PathBuf>,

    /// Address to listen on
    #[arg(short, long, env = "GOPHERD_ADDRESS")]
    pub address: Option<String>,

    /// Host name advertised in directory listings [default: the listen address]
    #[arg(long, env = "GOPHERD_HOSTNAME")]
    pub hostname: Option<String>,

    /// Port to listen on, 0 picks a free one. The default of 70 requires root/admin privileges
    #[arg(short, long, env = "GOPHERD_PORT")]
    pub port: Option<u16>,

    /// Administrator contact shown in error responses
    #[arg(long, env = "GOPHERD_ADMIN")]
    pub admin: Option<String>,

    /// Maximum number of bytes a client may send as its request
    #[arg(long, env = "GOPHERD_MAX_SELECTOR_LEN")]
    pub max_selector_len: Option<usize>,

    /// Milliseconds a client has to send its complete selector
    #[arg(long, env = "GOPHERD_SELECTOR_TIMEOUT_MS")]
    pub selector_timeout_ms: Option<u64>,

    /// Milliseconds to wait for a Gopher+ marker after the request line
    #[arg(long, env = "GOPHERD_TERMINATOR_GRACE_MS")]
    pub terminator_grace_ms: Option<u64>,
}

impl Settings {
    /// Fill every field not set in `self` from `fallback`.
    pub fn or(self, fallback: Settings) -> Settings {
        Settings {
            root: self.root.or(fallback.root),
            address: self.address.or(fallback.address),
            hostname: self.hostname.or(fallback.hostname),
            port: self.port.or(fallback.port),
            admin: self.admin.or(fallback.admin),
            max_selector_len: self.max_selector_len.or(fallback.max_selector_len),
            selector_timeout_ms: self.selector_timeout_ms.or(fallback.selector_timeout_ms),
            terminator_grace_ms: self.terminator_grace_ms.or(fallback.terminator_grace_ms),
        }
    }

    /// Apply defaults and produce the validated server configuration.
    pub fn into_config(self) -> anyhow::Result<Config> {
        let root = match self.root {
            Some(root) => utils::expand_tilde(&root),
            None => utils::default_root().context("cannot determine the home directory")?,
        };
        let root = std::path::absolute(&root)
            .with_context(|| format!("failed to expand relative path {}", root.display()))?;

        let mut config = Config::new(root);
        if let Some(address) = self.address {
            config.address = address;
        }
        if let Some(hostname) = self.hostname {
            config.hostname = hostname;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(admin) = self.admin {
            config.admin = admin;
        }
        if let Some(max) = self.max_selector_len {
            if max == 0 {
                bail!("max_selector_len must be positive");
            }
            config.max_selector_len = max;
        }
        if let Some(ms) = self.selector_timeout_ms {
            config.selector_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = self.terminator_grace_ms {
            config.terminator_grace = Duration::from_millis(ms);
        }

        config
            .validate()
            .with_context(|| format!("cannot serve {}", config.root.display()))?;
        Ok(config)
    }
}

/// Locations searched for a configuration file, in order.
pub fn search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(CONFIG_NAME)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("gopherd").join(CONFIG_NAME));
    }
    if cfg!(unix) {
        paths.push(Path::new("/etc/gopherd").join(CONFIG_NAME));
    }
    paths
}

/// Parse a configuration file.
pub fn read_file(path: &Path) -> anyhow::Result<Settings> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read config file {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("invalid config file {}", path.display()))
}

/// Load the explicitly given configuration file, or the first one found in
/// [`search_paths`]. Finding none is not an error.
pub fn load_file(explicit: Option<&Path>) -> anyhow::Result<Settings> {
    if let Some(path) = explicit {
        info!("Loading config file {}", path.display());
        return read_file(path);
    }
    match search_paths().into_iter().find(|path| path.is_file()) {
        Some(path) => {
            info!("Loading config file {}", path.display());
            read_file(&path)
        }
        None => {
            info!("No config file found, relying on env vars/flags/defaults");
            Ok(Settings::default())
        }
    }
}
