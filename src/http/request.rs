/// The only method the server answers.
pub const HTTP_METHOD: &str = "GET";
/// The only protocol version the server answers.
pub const HTTP_VERSION: &str = "HTTP/1.1";

/// A request line as read off the wire.
///
/// Only the request line is validated; header lines are consumed but never
/// interpreted. When `well_formed` is false the other fields hold whatever
/// could be recovered and should not be used for routing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRequest {
    /// The request method, e.g. `GET`
    pub method: String,
    /// The requested path, with `/` already rewritten to the default document
    pub path: String,
    /// Protocol version, e.g. `HTTP/1.1`
    pub version: String,
    /// Whether the request line has exactly three fields, a `GET` method,
    /// an `HTTP/1.1` version and a path starting with `/`
    pub well_formed: bool,
}

impl ParsedRequest {
    /// A request that never produced a usable request line.
    pub fn malformed() -> Self {
        Self {
            method: String::new(),
            path: String::new(),
            version: String::new(),
            well_formed: false,
        }
    }

    /// Path relative to the document root, without the leading slash.
    pub fn relative_path(&self) -> &str {
        self.path.trim_start_matches('/')
    }
}
