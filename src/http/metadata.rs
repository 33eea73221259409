//! File metadata used to build `200 OK` headers.

use std::future::Future;
use std::io;
use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Utc};

use crate::http::mime;

/// What the response builder needs to know about a file it is about to serve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Exact size in bytes
    pub len: u64,
    pub modified: SystemTime,
    pub content_type: &'static str,
}

impl FileInfo {
    pub fn last_modified(&self) -> String {
        http_date(self.modified)
    }
}

/// Source of file metadata for the connection handler.
pub trait FileMetadataProvider: Send + Sync + 'static {
    /// Metadata for `path`, or `None` when it is missing or not a regular file.
    fn lookup(&self, path: &Path) -> impl Future<Output = io::Result<Option<FileInfo>>> + Send;
}

/// Reads metadata straight from the filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsMetadataProvider;

impl FileMetadataProvider for FsMetadataProvider {
    async fn lookup(&self, path: &Path) -> io::Result<Option<FileInfo>> {
        let meta = match tokio::fs::metadata(path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        if !meta.is_file() {
            return Ok(None);
        }

        Ok(Some(FileInfo {
            len: meta.len(),
            modified: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            content_type: mime::content_type(path),
        }))
    }
}

/// Formats `time` as an RFC 7231 IMF-fixdate, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`.
pub fn http_date(time: SystemTime) -> String {
    DateTime::<Utc>::from(time)
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn formats_imf_fixdate() {
        let time = SystemTime::UNIX_EPOCH + Duration::from_secs(784_111_777);
        assert_eq!(http_date(time), "Sun, 06 Nov 1994 08:49:37 GMT");
    }

    #[tokio::test]
    async fn directories_are_not_files() {
        let dir = std::env::temp_dir();
        let found = FsMetadataProvider.lookup(&dir).await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn missing_path_is_none() {
        let path = std::env::temp_dir().join("driftwood-definitely-missing.bin");
        let found = FsMetadataProvider.lookup(&path).await.unwrap();
        assert!(found.is_none());
    }
}
