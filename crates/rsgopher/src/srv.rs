//! Asynchronous Gopher server.
//!
//! # Protocol
//! Gopher / Gopher+, one request per TCP connection

use {
    crate::{
        config::Config,
        error::Error,
        fs::{Filesystem, LocalFs},
        gophermap::Gophermap,
        path,
        request::{self, Request},
        response,
        utils::Result,
    },
    log::{debug, error, info, warn},
    std::{net::SocketAddr, path::PathBuf, sync::Arc},
    tokio::{
        io::{AsyncRead, AsyncWrite, AsyncWriteExt},
        net::TcpListener,
    },
    tokio_util::{sync::CancellationToken, task::TaskTracker},
};

/// What a resolved request turned into.
#[derive(Debug)]
enum Resolved {
    Listing(Gophermap),
    Transfer(PathBuf),
}

/// Map a request onto the tree and build the listing if it names a directory.
async fn resolve<Fs>(config: &Config, fs: &Fs, req: &Request) -> Result<Resolved>
where
    Fs: Filesystem + ?Sized,
{
    let path = path::resolve(&config.root, &req.selector)?;
    let stat = fs
        .stat(&path)
        .await
        .map_err(|e| Error::from_lookup(&path, e))?;

    if stat.is_dir {
        let map = Gophermap::from_dir(config, fs, &path, req.gopher_plus).await?;
        Ok(Resolved::Listing(map))
    } else {
        Ok(Resolved::Transfer(path))
    }
}

fn log_failure(e: &Error, req: Option<&Request>) {
    let selector = req.map(|r| r.selector.as_str()).unwrap_or("");
    if e.is_internal() {
        error!("internal error serving {:?}: {}", selector, e);
    } else {
        warn!("request {:?} failed: {}", selector, e);
    }
}

/// Serve exactly one request on `stream`.
///
/// The connection moves through reading the selector, resolving it, and
/// either listing a directory or transferring a file. A failure before the
/// response starts is answered with one error response; an I/O failure during
/// a transfer is only logged because part of the body may already be out.
/// The write half is shut down at the end.
pub async fn handle_connection<Fs, S>(config: &Config, fs: &Fs, stream: &mut S) -> Result<()>
where
    Fs: Filesystem + ?Sized,
    S: AsyncRead + AsyncWrite + Unpin + ?Sized,
{
    let result = serve_request(config, fs, stream).await;
    if let Err(e) = stream.shutdown().await {
        debug!("shutdown after response failed: {}", e);
    }
    result
}

async fn serve_request<Fs, S>(config: &Config, fs: &Fs, stream: &mut S) -> Result<()>
where
    Fs: Filesystem + ?Sized,
    S: AsyncRead + AsyncWrite + Unpin + ?Sized,
{
    let req = match request::read_request(
        stream,
        config.max_selector_len,
        config.selector_timeout,
        config.terminator_grace,
    )
    .await
    {
        Ok(req) => req,
        Err(e) => {
            log_failure(&e, None);
            // The protocol variant is unknown, answer the plain Gopher way.
            response::send_error(stream, &config.admin, response::describe(&e, ""), false).await;
            return Err(e);
        }
    };
    debug!("selector {:?} (gopher+: {})", req.selector, req.gopher_plus);

    let resolved = match resolve(config, fs, &req).await {
        Ok(resolved) => resolved,
        Err(e) => {
            log_failure(&e, Some(&req));
            let described = response::describe(&e, &req.selector);
            response::send_error(stream, &config.admin, described, req.gopher_plus).await;
            return Err(e);
        }
    };

    let sent = match resolved {
        Resolved::Listing(map) => {
            debug!("listing {} items for {:?}", map.len(), req.selector);
            response::send_gophermap(stream, &map).await.map(|n| n as u64)
        }
        Resolved::Transfer(path) => {
            debug!("transferring {:?}", path);
            response::send_file(fs, stream, &path, req.gopher_plus).await
        }
    };

    match sent {
        Ok(bytes) => {
            debug!("sent {} bytes for {:?}", bytes, req.selector);
            Ok(())
        }
        Err(Error::Io(e)) => {
            error!("transfer of {:?} aborted: {}", req.selector, e);
            Err(Error::Io(e))
        }
        Err(e) => {
            log_failure(&e, Some(&req));
            let described = response::describe(&e, &req.selector);
            response::send_error(stream, &config.admin, described, req.gopher_plus).await;
            Err(e)
        }
    }
}

/// A bound Gopher server.
pub struct Server<Fs = LocalFs> {
    config: Arc<Config>,
    fs: Arc<Fs>,
    listener: TcpListener,
}

impl<Fs> Server<Fs>
where
    Fs: 'static + Filesystem,
{
    /// Validate `config` and bind the listener.
    ///
    /// If the configured port is `0`, the port assigned by the OS is written
    /// into the configuration before any item can be built from it.
    pub async fn bind(mut config: Config, fs: Fs) -> Result<Self> {
        config.validate()?;
        let listener = TcpListener::bind(config.bind_addr()).await?;
        let local = listener.local_addr()?;
        if config.port == 0 {
            config.port = local.port();
        }

        info!("Serving {:?}", config.root);
        info!(
            "Listening on {} (advertised as {}:{})",
            local,
            config.advertised_host(),
            config.port
        );

        Ok(Server {
            config: Arc::new(config),
            fs: Arc::new(fs),
            listener,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until `shutdown` is cancelled.
    ///
    /// Shutdown happens in two phases: the listener stops accepting, then
    /// every request already dispatched is awaited to completion.
    pub async fn serve(self, shutdown: CancellationToken) -> Result<()> {
        let tracker = TaskTracker::new();

        loop {
            let (mut stream, peer) = tokio::select! {
                _ = shutdown.cancelled() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        error!("failed to accept connection: {}", e);
                        continue;
                    }
                },
            };
            info!("accepted: {:?}", peer);

            let config = self.config.clone();
            let fs = self.fs.clone();
            tracker.spawn(async move {
                if let Err(e) = handle_connection(&config, &*fs, &mut stream).await {
                    debug!("{}: {:?}", peer, e);
                }
            });
        }

        drop(self.listener);
        tracker.close();
        info!(
            "Stopped accepting, waiting for {} request(s) to finish",
            tracker.len()
        );
        tracker.wait().await;
        info!("Server shutdown complete");
        Ok(())
    }
}

/// Resolve once SIGINT or SIGTERM is received (Ctrl-C off Unix).
pub async fn shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down gracefully"),
            _ = sigint.recv() => info!("Received SIGINT, shutting down gracefully"),
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl-C, shutting down gracefully");
    }
    Ok(())
}

/// Serve the local directory tree described by `config` until a shutdown signal arrives.
pub async fn srv_async(config: Config) -> Result<()> {
    let server = Server::bind(config, LocalFs).await?;
    let shutdown = CancellationToken::new();

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = shutdown_signal().await {
                error!("cannot listen for shutdown signals: {}", e);
                return;
            }
            shutdown.cancel();
        });
    }

    server.serve(shutdown).await
}
