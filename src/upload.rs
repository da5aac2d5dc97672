//! File storage for multipart uploads.
use std::{
    future::Future,
    io,
    path::PathBuf,
    sync::atomic::{AtomicU64, Ordering},
    time::{SystemTime, UNIX_EPOCH},
};
use tokio::fs::{File, OpenOptions};

use crate::log;

/// A file backed multipart part.
///
/// The file at `path` is not removed by this crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub path: PathBuf,
    pub content_type: Option<String>,
    pub filename: String,
}

/// Creates the files multipart file parts are written into.
pub trait UploadStore: Send + Sync + 'static {
    /// Create a new, uniquely named, writable file.
    fn create(&self) -> impl Future<Output = io::Result<(PathBuf, File)>> + Send;
}

/// [`UploadStore`] that creates files in a directory, the system temp directory by default.
#[derive(Debug, Clone)]
pub struct TempUploads {
    dir: PathBuf,
    prefix: String,
}

static COUNTER: AtomicU64 = AtomicU64::new(0);

impl TempUploads {
    /// Create new [`TempUploads`] in the given directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), prefix: "plume-upload".into() }
    }

    /// Set the file name prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Returns the directory files are created in.
    pub fn dir(&self) -> &std::path::Path {
        &self.dir
    }

    fn next_path(&self) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.subsec_nanos())
            .unwrap_or_default();
        let count = COUNTER.fetch_add(1, Ordering::Relaxed);
        self.dir
            .join(format!("{}-{}-{nanos}-{count}", self.prefix, std::process::id()))
    }
}

impl Default for TempUploads {
    fn default() -> Self {
        Self::new(std::env::temp_dir())
    }
}

impl UploadStore for TempUploads {
    async fn create(&self) -> io::Result<(PathBuf, File)> {
        const ATTEMPTS: usize = 10;

        let mut last = None;
        for _ in 0..ATTEMPTS {
            let path = self.next_path();
            match OpenOptions::new().write(true).create_new(true).open(&path).await {
                Ok(file) => {
                    log::debug!("created upload file {}", path.display());
                    return Ok((path, file));
                }
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => last = Some(err),
                Err(err) => return Err(err),
            }
        }

        Err(last.unwrap_or_else(|| io::Error::other("failed to create upload file")))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn test_temp_uploads() {
        let dir = tempfile::tempdir().unwrap();
        let store = TempUploads::new(dir.path()).with_prefix("test");

        let (a, _) = store.create().await.unwrap();
        let (b, _) = store.create().await.unwrap();

        assert_ne!(a, b);
        assert!(a.starts_with(dir.path()));
        assert!(a.file_name().unwrap().to_str().unwrap().starts_with("test-"));
        assert!(a.exists() && b.exists());
    }
}
