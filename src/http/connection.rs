use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::http::metadata::{FileInfo, FileMetadataProvider, http_date};
use crate::http::parser::{ReadError, read_request};
use crate::http::request::ParsedRequest;
use crate::http::response::{ResponseHead, StatusCode};
use crate::http::writer::{ResponseWriter, WriteError};
use crate::server::shutdown::Shutdown;

/// Read-only state shared by every connection handler.
pub struct HandlerContext<P> {
    pub config: Arc<ServerConfig>,
    /// Canonical form of `config.document_root`.
    pub root: Arc<PathBuf>,
    pub provider: Arc<P>,
}

impl<P> Clone for HandlerContext<P> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            root: Arc::clone(&self.root),
            provider: Arc::clone(&self.provider),
        }
    }
}

impl<P: FileMetadataProvider> HandlerContext<P> {
    /// Fails if the document root cannot be canonicalized.
    pub async fn new(config: ServerConfig, provider: P) -> io::Result<Self> {
        let root = tokio::fs::canonicalize(&config.document_root).await?;
        Ok(Self {
            config: Arc::new(config),
            root: Arc::new(root),
            provider: Arc::new(provider),
        })
    }
}

/// A file the request resolved to, inside the document root.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub path: PathBuf,
    pub info: FileInfo,
}

pub enum ConnectionState {
    AwaitingRequest,
    Routing(ParsedRequest),
    Responding(StatusCode, Option<Resolved>),
    Closed(Outcome),
}

/// How a connection ended.
#[derive(Debug)]
pub enum Outcome {
    /// Exactly one response was written and flushed.
    Responded(StatusCode),
    /// The peer closed the stream before sending anything.
    ClientGone,
    /// Shutdown cancelled the handler; no (complete) response was sent.
    Cancelled,
    /// Transport failure; the connection was dropped without a response.
    Failed(io::Error),
}

/// Owns one accepted connection from first read to close.
///
/// The halves are released when the handler returns, write half first.
/// A body file, if any, is opened and closed inside the response step, so it
/// is always released before either half.
pub struct Connection<R, W, P> {
    writer: W,
    reader: R,
    peer: SocketAddr,
    ctx: HandlerContext<P>,
    cancel: Shutdown,
}

impl<P: FileMetadataProvider> Connection<OwnedReadHalf, OwnedWriteHalf, P> {
    pub fn from_tcp(stream: TcpStream, peer: SocketAddr, ctx: HandlerContext<P>, cancel: Shutdown) -> Self {
        let (reader, writer) = stream.into_split();
        Self::new(reader, writer, peer, ctx, cancel)
    }
}

impl<R, W, P> Connection<R, W, P>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    P: FileMetadataProvider,
{
    pub fn new(reader: R, writer: W, peer: SocketAddr, ctx: HandlerContext<P>, cancel: Shutdown) -> Self {
        Self {
            writer,
            reader,
            peer,
            ctx,
            cancel,
        }
    }

    /// Drives the connection to `Closed`, consuming it.
    pub async fn run(mut self) -> Outcome {
        let mut state = ConnectionState::AwaitingRequest;

        loop {
            state = match state {
                ConnectionState::AwaitingRequest => self.await_request().await,

                ConnectionState::Routing(request) => {
                    if self.cancel.is_triggered() {
                        ConnectionState::Closed(Outcome::Cancelled)
                    } else {
                        self.route(&request).await
                    }
                }

                ConnectionState::Responding(status, resolved) => {
                    match self.respond(status, resolved.as_ref()).await {
                        Ok(()) => ConnectionState::Closed(Outcome::Responded(status)),
                        Err(WriteError::Cancelled) => ConnectionState::Closed(Outcome::Cancelled),
                        Err(WriteError::Io(e)) => ConnectionState::Closed(Outcome::Failed(e)),
                    }
                }

                ConnectionState::Closed(outcome) => return outcome,
            };
        }
    }

    async fn await_request(&mut self) -> ConnectionState {
        let config = &self.ctx.config;
        let result = read_request(
            &mut self.reader,
            config.idle_timeout(),
            &self.cancel,
            &config.default_document,
        )
        .await;

        match result {
            Ok(Some(request)) => ConnectionState::Routing(request),
            Ok(None) => ConnectionState::Closed(Outcome::ClientGone),
            Err(ReadError::TimedOut) => {
                debug!(peer = %self.peer, "Idle timeout waiting for request");
                ConnectionState::Responding(StatusCode::RequestTimeout, None)
            }
            Err(ReadError::Cancelled) => ConnectionState::Closed(Outcome::Cancelled),
            Err(ReadError::Io(e)) => ConnectionState::Closed(Outcome::Failed(e)),
        }
    }

    async fn route(&self, request: &ParsedRequest) -> ConnectionState {
        if !request.well_formed {
            return ConnectionState::Responding(StatusCode::BadRequest, None);
        }

        match self.resolve(request).await {
            Some(resolved) => ConnectionState::Responding(StatusCode::Ok, Some(resolved)),
            None => ConnectionState::Responding(StatusCode::NotFound, None),
        }
    }

    /// Maps the request path to a regular file under the document root.
    ///
    /// The joined path is canonicalized, so `..` segments and symlinks that
    /// lead outside the root resolve to `None`.
    async fn resolve(&self, request: &ParsedRequest) -> Option<Resolved> {
        let root: &Path = &self.ctx.root;
        let path = tokio::fs::canonicalize(root.join(request.relative_path()))
            .await
            .ok()?;

        if !path.starts_with(root) {
            warn!(peer = %self.peer, path = %request.path, "Rejected path outside document root");
            return None;
        }

        match self.ctx.provider.lookup(&path).await {
            Ok(info) => info.map(|info| Resolved { path, info }),
            Err(e) => {
                warn!(peer = %self.peer, path = %path.display(), "Metadata lookup failed: {}", e);
                None
            }
        }
    }

    async fn respond(&mut self, status: StatusCode, resolved: Option<&Resolved>) -> Result<(), WriteError> {
        let mut head = ResponseHead::new(
            status,
            http_date(SystemTime::now()),
            self.ctx.config.server_name.as_str(),
        );
        if let Some(resolved) = resolved {
            head = head.with_file(&resolved.info);
        }

        let mut writer = ResponseWriter::new(&self.cancel);
        writer.write_head(&head, &mut self.writer).await?;
        if let Some(resolved) = resolved {
            writer.stream_body(&resolved.path, &mut self.writer).await?;
        }
        writer.finish(&mut self.writer).await?;

        info!(
            peer = %self.peer,
            status = status.as_u16(),
            bytes = writer.written(),
            "{}",
            status.status_line().trim_end()
        );
        Ok(())
    }
}
