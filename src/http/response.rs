use bytes::{BufMut, Bytes, BytesMut};

use crate::http::metadata::FileInfo;
use crate::http::request::HTTP_VERSION;

const EOL: &str = "\r\n";

/// HTTP status codes the server can answer with.
///
/// - `Ok` (200): file found and served
/// - `BadRequest` (400): malformed request line
/// - `NotFound` (404): no regular file at the requested path
/// - `RequestTimeout` (408): no complete request before the idle timeout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK
    Ok,
    /// 400 Bad Request
    BadRequest,
    /// 404 Not Found
    NotFound,
    /// 408 Request Timeout
    RequestTimeout,
}

impl StatusCode {
    /// Returns the numeric HTTP status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use driftwood::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// assert_eq!(StatusCode::RequestTimeout.as_u16(), 408);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::BadRequest => 400,
            StatusCode::NotFound => 404,
            StatusCode::RequestTimeout => 408,
        }
    }

    /// Returns the standard HTTP reason phrase for this status code.
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::NotFound => "Not Found",
            StatusCode::RequestTimeout => "Request Timeout",
        }
    }

    /// `HTTP/1.1 <code> <phrase>\r\n`
    pub fn status_line(&self) -> String {
        format!(
            "{} {} {}{EOL}",
            HTTP_VERSION,
            self.as_u16(),
            self.reason_phrase()
        )
    }
}

/// Status line and header block of a response.
///
/// Headers are kept in wire order. `Date`, `Server` and `Connection: close`
/// are always present; [`ResponseHead::with_file`] adds the entity headers a
/// 200 carries.
#[derive(Debug, Clone)]
pub struct ResponseHead {
    pub status: StatusCode,
    pub headers: Vec<(&'static str, String)>,
}

impl ResponseHead {
    pub fn new(status: StatusCode, date: impl Into<String>, server: impl Into<String>) -> Self {
        Self {
            status,
            headers: vec![("Date", date.into()), ("Server", server.into())],
        }
    }

    /// Adds `Last-Modified`, `Content-Length` and `Content-Type` for `file`.
    pub fn with_file(mut self, file: &FileInfo) -> Self {
        self.headers.push(("Last-Modified", file.last_modified()));
        self.headers.push(("Content-Length", file.len.to_string()));
        self.headers.push(("Content-Type", file.content_type.to_string()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Serializes the head, blank line included, as 7-bit ASCII.
    pub fn encode(&self) -> Bytes {
        let mut text = self.status.status_line();
        for (name, value) in &self.headers {
            text.push_str(name);
            text.push_str(": ");
            text.push_str(value);
            text.push_str(EOL);
        }
        text.push_str("Connection: close");
        text.push_str(EOL);
        text.push_str(EOL);

        encode_ascii(&text)
    }
}

/// Encodes `text` as US-ASCII, substituting `?` for anything outside it.
pub fn encode_ascii(text: &str) -> Bytes {
    let mut buf = BytesMut::with_capacity(text.len());
    for c in text.chars() {
        buf.put_u8(if c.is_ascii() { c as u8 } else { b'?' });
    }
    buf.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_ascii_is_replaced() {
        assert_eq!(encode_ascii("caf\u{e9}").as_ref(), b"caf?");
    }

    #[test]
    fn connection_close_is_last_header() {
        let head = ResponseHead::new(StatusCode::NotFound, "d", "s").encode();
        assert!(head.ends_with(b"Connection: close\r\n\r\n"));
    }
}
