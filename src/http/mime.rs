//! Content-Type lookup by file extension.

use std::path::Path;

const FALLBACK: &str = "application/octet-stream";

/// Resolves the `Content-Type` for a file from its extension.
///
/// Matching is case-insensitive; unknown or missing extensions fall back to
/// `application/octet-stream`.
///
/// ```
/// use std::path::Path;
/// use driftwood::http::mime::content_type;
/// assert_eq!(content_type(Path::new("/srv/index.HTML")), "text/html");
/// assert_eq!(content_type(Path::new("/srv/README")), "application/octet-stream");
/// ```
pub fn content_type(path: &Path) -> &'static str {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return FALLBACK;
    };

    match ext.to_ascii_lowercase().as_str() {
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "txt" | "text" => "text/plain",
        "csv" => "text/csv",
        "xml" => "application/xml",
        "js" | "mjs" => "text/javascript",
        "json" => "application/json",
        "wasm" => "application/wasm",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "webp" => "image/webp",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        _ => FALLBACK,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_extensions() {
        assert_eq!(content_type(Path::new("a/b.css")), "text/css");
        assert_eq!(content_type(Path::new("photo.JPeG")), "image/jpeg");
        assert_eq!(content_type(Path::new("doc.pdf")), "application/pdf");
    }

    #[test]
    fn unknown_or_missing_extension() {
        assert_eq!(content_type(Path::new("blob.xyz")), FALLBACK);
        assert_eq!(content_type(Path::new("Makefile")), FALLBACK);
        assert_eq!(content_type(Path::new(".hidden")), FALLBACK);
    }
}
