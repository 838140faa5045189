use {
    anyhow::Context,
    clap::Parser,
    log::info,
    rsgopher::srv::srv_async,
    std::path::PathBuf,
};

mod settings;
mod utils;
use crate::settings::Settings;

/// Serve a directory tree over Gopher and Gopher+.
#[derive(Debug, clap::Parser)]
#[command(version, about)]
struct Cli {
    /// Configuration file to load instead of searching the default locations
    #[arg(short, long, env = "GOPHERD_CONFIG")]
    config: Option<PathBuf>,

    #[command(flatten)]
    settings: Settings,
}

async fn gopherd_main(Cli { config, settings }: Cli) -> anyhow::Result<i32> {
    info!("gopherd {}", env!("CARGO_PKG_VERSION"));

    let file = settings::load_file(config.as_deref())?;
    let config = settings.or(file).into_config()?;

    srv_async(config).await.context("server failed")?;
    Ok(0)
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let exit_code = gopherd_main(Cli::parse()).await.unwrap_or_else(|e| {
        eprintln!("Error: {:?}", e);
        -1
    });

    std::process::exit(exit_code);
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_fill_settings() {
        let cli = Cli::try_parse_from([
            "gopherd",
            "-g",
            "/srv/gopher",
            "-p",
            "7070",
            "--hostname",
            "gopher.example.org",
            "--selector-timeout-ms",
            "1500",
            "-c",
            "/etc/gopherd/custom.toml",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/etc/gopherd/custom.toml")));
        assert_eq!(cli.settings.root, Some(PathBuf::from("/srv/gopher")));
        assert_eq!(cli.settings.port, Some(7070));
        assert_eq!(
            cli.settings.hostname.as_deref(),
            Some("gopher.example.org")
        );
        assert_eq!(cli.settings.selector_timeout_ms, Some(1500));
    }

    #[test]
    fn invalid_port_is_rejected() {
        assert!(Cli::try_parse_from(["gopherd", "-p", "70000"]).is_err());
    }
}
