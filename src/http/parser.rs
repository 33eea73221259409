use std::fmt;
use std::io;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::timeout;
use tracing::debug;

use crate::http::request::{HTTP_METHOD, HTTP_VERSION, ParsedRequest};
use crate::server::shutdown::Shutdown;

const CR: u8 = b'\r';
const LF: u8 = b'\n';
const END_OF_HEADERS: &[u8] = b"\r\n";

/// Bytes pulled from the socket per read call.
const READ_CHUNK: usize = 1024;
/// Longest line kept in memory; anything past it is dropped.
pub const MAX_LINE_LEN: usize = 8192;

#[derive(Debug)]
pub enum ReadError {
    /// No bytes arrived within the idle timeout.
    TimedOut,
    /// The connection was cancelled during shutdown.
    Cancelled,
    Io(io::Error),
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadError::TimedOut => write!(f, "idle timeout waiting for request"),
            ReadError::Cancelled => write!(f, "cancelled while reading request"),
            ReadError::Io(e) => write!(f, "read failed: {e}"),
        }
    }
}

impl std::error::Error for ReadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReadError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ReadError {
    fn from(e: io::Error) -> Self {
        ReadError::Io(e)
    }
}

/// One CRLF-terminated line, terminator included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub bytes: Bytes,
    /// Set when the line exceeded [`MAX_LINE_LEN`] and was cut short.
    pub truncated: bool,
}

impl Line {
    pub fn is_end_of_headers(&self) -> bool {
        !self.truncated && self.bytes.as_ref() == END_OF_HEADERS
    }
}

/// Splits a byte stream into CRLF-terminated lines.
///
/// Works one byte at a time with a two-byte lookback window, so it never
/// needs to see more of the stream than has already been read.
#[derive(Debug, Default)]
pub struct LineScanner {
    line: BytesMut,
    prev: Option<u8>,
    truncated: bool,
}

impl LineScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one byte, returning a line once its CRLF terminator is complete.
    pub fn push(&mut self, byte: u8) -> Option<Line> {
        if self.line.len() < MAX_LINE_LEN {
            self.line.extend_from_slice(&[byte]);
        } else {
            self.truncated = true;
        }

        if self.prev == Some(CR) && byte == LF {
            self.prev = None;
            let truncated = std::mem::take(&mut self.truncated);
            return Some(Line {
                bytes: self.line.split().freeze(),
                truncated,
            });
        }

        self.prev = Some(byte);
        None
    }
}

/// Validates a request line and applies default-document substitution.
pub fn parse_request_line(line: &Line, default_document: &str) -> ParsedRequest {
    if line.truncated {
        return ParsedRequest::malformed();
    }

    let raw = line.bytes.as_ref();
    let raw = raw.strip_suffix(END_OF_HEADERS).unwrap_or(raw);
    let Ok(text) = std::str::from_utf8(raw) else {
        return ParsedRequest::malformed();
    };

    let fields: Vec<&str> = text.split(' ').collect();
    let [method, path, version] = fields.as_slice() else {
        return ParsedRequest::malformed();
    };

    let well_formed =
        *method == HTTP_METHOD && *version == HTTP_VERSION && path.starts_with('/');
    let path = if *path == "/" {
        default_document.to_string()
    } else {
        path.to_string()
    };

    ParsedRequest {
        method: method.to_string(),
        path,
        version: version.to_string(),
        well_formed,
    }
}

/// Reads a request off `reader` up to and including the blank line that ends
/// the header block.
///
/// A malformed request line does not stop the read; header lines are drained
/// either way so the stream is left at a consistent point. Returns `Ok(None)`
/// when the peer closes the stream without sending a single byte.
pub async fn read_request<R>(
    reader: &mut R,
    idle_timeout: Option<Duration>,
    cancel: &Shutdown,
    default_document: &str,
) -> Result<Option<ParsedRequest>, ReadError>
where
    R: AsyncRead + Unpin,
{
    let mut scanner = LineScanner::new();
    let mut chunk = [0u8; READ_CHUNK];
    let mut request: Option<ParsedRequest> = None;
    let mut raw = Vec::new();
    let mut received = 0usize;

    loop {
        let n = read_chunk(reader, &mut chunk, idle_timeout, cancel).await?;
        if n == 0 {
            break;
        }
        received += n;

        for &byte in &chunk[..n] {
            let Some(line) = scanner.push(byte) else {
                continue;
            };

            append_capped(&mut raw, &line.bytes);
            if request.is_none() {
                request = Some(parse_request_line(&line, default_document));
            }
            if line.is_end_of_headers() {
                debug!(request = %String::from_utf8_lossy(&raw), "Received request");
                return Ok(request);
            }
        }
    }

    if received == 0 {
        return Ok(None);
    }

    debug!(request = %String::from_utf8_lossy(&raw), "Stream ended before end of headers");
    Ok(Some(request.unwrap_or_else(ParsedRequest::malformed)))
}

/// Appends to the request log buffer without letting it exceed [`MAX_LINE_LEN`].
fn append_capped(raw: &mut Vec<u8>, bytes: &[u8]) {
    let room = MAX_LINE_LEN.saturating_sub(raw.len());
    raw.extend_from_slice(&bytes[..bytes.len().min(room)]);
}

/// One read, bounded by the idle timeout and interrupted by cancellation.
async fn read_chunk<R>(
    reader: &mut R,
    buf: &mut [u8],
    idle_timeout: Option<Duration>,
    cancel: &Shutdown,
) -> Result<usize, ReadError>
where
    R: AsyncRead + Unpin,
{
    let read = async {
        match idle_timeout {
            Some(limit) => match timeout(limit, reader.read(buf)).await {
                Ok(result) => result.map_err(ReadError::Io),
                Err(_) => Err(ReadError::TimedOut),
            },
            None => reader.read(buf).await.map_err(ReadError::Io),
        }
    };

    let n = tokio::select! {
        biased;
        _ = cancel.triggered() => return Err(ReadError::Cancelled),
        res = read => res?,
    };

    if cancel.is_triggered() {
        return Err(ReadError::Cancelled);
    }
    Ok(n)
}
