use std::fmt;
use std::future::Future;
use std::io;
use std::path::Path;

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::http::response::ResponseHead;
use crate::server::shutdown::Shutdown;

/// Size of the buffer used to copy a file onto the socket.
pub const BUFFER_SIZE: usize = 4096;

#[derive(Debug)]
pub enum WriteError {
    /// The connection was cancelled part way through the response.
    Cancelled,
    Io(io::Error),
}

impl fmt::Display for WriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteError::Cancelled => write!(f, "cancelled while writing response"),
            WriteError::Io(e) => write!(f, "write failed: {e}"),
        }
    }
}

impl std::error::Error for WriteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WriteError::Io(e) => Some(e),
            WriteError::Cancelled => None,
        }
    }
}

impl From<io::Error> for WriteError {
    fn from(e: io::Error) -> Self {
        WriteError::Io(e)
    }
}

/// Writes one response onto a sink.
///
/// Every socket write and the final flush race the cancellation token, so a
/// peer that stops reading cannot hold the writer past a forced shutdown.
pub struct ResponseWriter<'a> {
    cancel: &'a Shutdown,
    written: u64,
}

impl<'a> ResponseWriter<'a> {
    pub fn new(cancel: &'a Shutdown) -> Self {
        Self { cancel, written: 0 }
    }

    /// Total bytes put on the wire so far, head included.
    pub fn written(&self) -> u64 {
        self.written
    }

    pub async fn write_head<W>(&mut self, head: &ResponseHead, sink: &mut W) -> Result<(), WriteError>
    where
        W: AsyncWrite + Unpin,
    {
        self.check()?;
        let bytes = head.encode();
        self.guarded(sink.write_all(&bytes)).await?;
        self.written += bytes.len() as u64;
        Ok(())
    }

    /// Copies the file at `path` onto `sink` in [`BUFFER_SIZE`] chunks.
    ///
    /// The file handle is opened here and closed before returning, on every path.
    pub async fn stream_body<W>(&mut self, path: &Path, sink: &mut W) -> Result<(), WriteError>
    where
        W: AsyncWrite + Unpin,
    {
        let mut file = File::open(path).await?;
        let mut buffer = [0u8; BUFFER_SIZE];

        loop {
            let n = file.read(&mut buffer).await?;
            self.check()?;
            if n == 0 {
                break;
            }
            self.guarded(sink.write_all(&buffer[..n])).await?;
            self.written += n as u64;
        }
        Ok(())
    }

    pub async fn finish<W>(&mut self, sink: &mut W) -> Result<(), WriteError>
    where
        W: AsyncWrite + Unpin,
    {
        self.check()?;
        self.guarded(sink.flush()).await
    }

    /// Runs one socket operation, abandoning it if cancellation fires first.
    async fn guarded<F>(&self, op: F) -> Result<(), WriteError>
    where
        F: Future<Output = io::Result<()>>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.triggered() => Err(WriteError::Cancelled),
            res = op => res.map_err(WriteError::Io),
        }
    }

    fn check(&self) -> Result<(), WriteError> {
        if self.cancel.is_triggered() {
            return Err(WriteError::Cancelled);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::response::StatusCode;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use std::time::Duration;

    /// Accepts the first write, then raises `cancel`.
    struct CancelAfterFirstWrite {
        cancel: Shutdown,
        received: Vec<u8>,
    }

    impl AsyncWrite for CancelAfterFirstWrite {
        fn poll_write(mut self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
            self.received.extend_from_slice(buf);
            self.cancel.trigger();
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    fn scratch_file(name: &str, len: usize) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("driftwood-writer-{}-{}", name, std::process::id()));
        std::fs::write(&path, vec![7u8; len]).unwrap();
        path
    }

    #[tokio::test]
    async fn cancellation_between_chunks_stops_the_body() {
        let path = scratch_file("chunks", BUFFER_SIZE * 4);
        let cancel = Shutdown::new();
        let mut sink = CancelAfterFirstWrite {
            cancel: cancel.clone(),
            received: Vec::new(),
        };

        let mut writer = ResponseWriter::new(&cancel);
        let result = writer.stream_body(&path, &mut sink).await;

        assert!(matches!(result, Err(WriteError::Cancelled)));
        assert_eq!(sink.received.len(), BUFFER_SIZE);
        assert_eq!(writer.written(), BUFFER_SIZE as u64);
    }

    #[tokio::test]
    async fn cancellation_releases_a_blocked_write() {
        let path = scratch_file("blocked", BUFFER_SIZE * 16);
        let cancel = Shutdown::new();
        // Nobody reads the other end, so the pipe fills after one chunk.
        let (_peer, mut sink) = tokio::io::duplex(BUFFER_SIZE);

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            trigger.trigger();
        });

        let mut writer = ResponseWriter::new(&cancel);
        let result = tokio::time::timeout(Duration::from_secs(2), writer.stream_body(&path, &mut sink))
            .await
            .expect("blocked write should observe cancellation");

        assert!(matches!(result, Err(WriteError::Cancelled)));
    }

    #[tokio::test]
    async fn head_is_written_verbatim() {
        let cancel = Shutdown::new();
        let head = ResponseHead::new(StatusCode::BadRequest, "today", "test");
        let mut sink = Vec::new();

        let mut writer = ResponseWriter::new(&cancel);
        writer.write_head(&head, &mut sink).await.unwrap();
        writer.finish(&mut sink).await.unwrap();

        assert_eq!(sink, head.encode().to_vec());
        assert_eq!(writer.written(), sink.len() as u64);
    }

    #[tokio::test]
    async fn cancelled_writer_writes_nothing() {
        let cancel = Shutdown::new();
        cancel.trigger();
        let head = ResponseHead::new(StatusCode::Ok, "today", "test");
        let mut sink = Vec::new();

        let result = ResponseWriter::new(&cancel).write_head(&head, &mut sink).await;

        assert!(matches!(result, Err(WriteError::Cancelled)));
        assert!(sink.is_empty());
    }
}
