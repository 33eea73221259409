use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::http::connection::{Connection, HandlerContext, Outcome};
use crate::http::metadata::{FileMetadataProvider, FsMetadataProvider};
use crate::server::dispatcher::{DrainReport, WorkerDispatcher};
use crate::server::shutdown::Shutdown;

/// Pause after a failed accept, so persistent errors such as EMFILE do not spin.
pub const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// The accept loop and shutdown orchestration.
pub struct Server<P = FsMetadataProvider> {
    listener: TcpListener,
    ctx: HandlerContext<P>,
    dispatcher: WorkerDispatcher,
}

impl<P: FileMetadataProvider> Server<P> {
    /// Binds the listening socket. An error here is fatal for the process.
    pub async fn bind(config: ServerConfig, provider: P) -> anyhow::Result<Self> {
        let addr = config.listen_addr();
        let ctx = HandlerContext::new(config, provider)
            .await
            .context("resolving document root")?;
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("binding {addr}"))?;

        info!(
            "Listening on {} serving {}",
            listener.local_addr()?,
            ctx.root.display()
        );
        Ok(Self {
            listener,
            ctx,
            dispatcher: WorkerDispatcher::new(),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections until `shutdown` is raised, then drains in-flight
    /// workers and releases the listening socket.
    pub async fn run(self, shutdown: Shutdown) -> anyhow::Result<DrainReport> {
        loop {
            tokio::select! {
                biased;
                _ = shutdown.triggered() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((socket, peer)) => self.dispatch(socket, peer),
                    Err(e) => {
                        warn!("Accept failed: {}", e);
                        if back_off(&shutdown).await {
                            break;
                        }
                    }
                },
            }
        }

        info!("Shutdown requested, no longer accepting connections");
        let report = self.dispatcher.drain(self.ctx.config.shutdown_grace()).await;
        drop(self.listener);
        info!(
            in_flight = report.in_flight,
            cancelled = report.cancelled,
            "Server stopped"
        );
        Ok(report)
    }

    fn dispatch(&self, socket: tokio::net::TcpStream, peer: SocketAddr) {
        let conn = Connection::from_tcp(socket, peer, self.ctx.clone(), self.dispatcher.cancel_token());
        let worker = self.dispatcher.submit(async move {
            match conn.run().await {
                Outcome::Responded(_) | Outcome::ClientGone => {}
                Outcome::Cancelled => info!(%peer, "Connection cancelled by shutdown"),
                Outcome::Failed(e) => error!(%peer, "Connection error: {}", e),
            }
        });
        tracing::debug!(%peer, worker, "Accepted connection");
    }
}

/// Sleeps for [`ACCEPT_BACKOFF`], returning `true` early if shutdown is raised.
async fn back_off(shutdown: &Shutdown) -> bool {
    tokio::select! {
        biased;
        _ = shutdown.triggered() => true,
        _ = tokio::time::sleep(ACCEPT_BACKOFF) => false,
    }
}
