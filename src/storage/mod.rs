//! Upload storage module
//!
//! Decides where an uploaded file lands and streams its bytes to disk.
//! Only the bytes persist; the [`StoredFile`] record lives for one request.

mod path;

pub use path::destination_path;

use hyper::body::Bytes;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::logger;

/// Upload failures
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("invalid file name: {0:?}")]
    InvalidFileName(String),
    #[error("upload exceeds the limit of {limit} bytes")]
    TooLarge { limit: u64 },
    #[error("failed to read upload body: {0}")]
    Source(String),
    #[error("failed to write upload: {0}")]
    Io(#[from] std::io::Error),
}

const PARTIAL_PREFIX: &str = ".upload-";
const PARTIAL_SUFFIX: &str = ".part";

/// Whether `name` has the shape of an in-flight upload
pub fn is_partial_name(name: &str) -> bool {
    name.len() > PARTIAL_PREFIX.len() + PARTIAL_SUFFIX.len()
        && name.starts_with(PARTIAL_PREFIX)
        && name.ends_with(PARTIAL_SUFFIX)
}

/// A stream of file chunks, e.g. one multipart field
pub trait ChunkSource {
    /// Next chunk, or `None` once the file is complete
    fn next_chunk(&mut self) -> impl Future<Output = Result<Option<Bytes>, UploadError>> + Send;
}

/// Result of a successful upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// On-disk (and URL) file name
    pub name: String,
    pub size: u64,
    pub path: PathBuf,
}

/// Writes uploads into the single configured upload directory
#[derive(Debug)]
pub struct UploadStore {
    root: PathBuf,
    max_size: u64,
    sequence: AtomicU64,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>, max_size: u64) -> Self {
        Self {
            root: root.into(),
            max_size,
            sequence: AtomicU64::new(0),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stream `source` to `<root>/<client_filename>`, replacing any existing file.
    ///
    /// Bytes go to a hidden sibling first and are renamed into place once
    /// complete. Concurrent uploads of the same name still race: whichever
    /// rename happens last wins.
    pub async fn store<S>(&self, client_filename: &str, mut source: S) -> Result<StoredFile, UploadError>
    where
        S: ChunkSource + Send,
    {
        let path = destination_path(&self.root, client_filename)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let temp = self.temp_path();

        let size = match self.write_to(&temp, &mut source).await {
            Ok(size) => size,
            Err(e) => {
                discard(&temp).await;
                return Err(e);
            }
        };

        if let Err(e) = fs::rename(&temp, &path).await {
            discard(&temp).await;
            return Err(e.into());
        }

        logger::log_debug(&format!("Stored upload '{name}' ({size} bytes)"));
        Ok(StoredFile { name, size, path })
    }

    /// Temp names have a fixed shape so any client name that fits on disk still
    /// fits once the upload is in flight
    fn temp_path(&self) -> PathBuf {
        let n = self.sequence.fetch_add(1, Ordering::Relaxed);
        self.root
            .join(format!("{PARTIAL_PREFIX}{}-{n}{PARTIAL_SUFFIX}", std::process::id()))
    }

    /// Delete partial uploads left behind by an earlier run
    pub fn remove_stale_partials(&self) -> std::io::Result<usize> {
        let mut removed = 0;
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            let is_partial = entry.file_name().to_str().is_some_and(is_partial_name);
            if is_partial && entry.file_type()?.is_file() {
                std::fs::remove_file(entry.path())?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn write_to<S: ChunkSource>(&self, temp: &Path, source: &mut S) -> Result<u64, UploadError> {
        let mut file = fs::File::create(temp).await?;
        let mut size = 0u64;

        while let Some(chunk) = source.next_chunk().await? {
            size += chunk.len() as u64;
            if size > self.max_size {
                return Err(UploadError::TooLarge {
                    limit: self.max_size,
                });
            }
            file.write_all(&chunk).await?;
        }

        file.flush().await?;
        Ok(size)
    }
}

async fn discard(temp: &Path) {
    if let Err(e) = fs::remove_file(temp).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            logger::log_warning(&format!(
                "Failed to remove partial upload '{}': {e}",
                temp.display()
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    struct Chunks(VecDeque<Bytes>);

    impl Chunks {
        fn of(parts: &[&'static [u8]]) -> Self {
            Self(parts.iter().map(|p| Bytes::from_static(p)).collect())
        }
    }

    impl ChunkSource for Chunks {
        async fn next_chunk(&mut self) -> Result<Option<Bytes>, UploadError> {
            Ok(self.0.pop_front())
        }
    }

    /// Yields one chunk, then fails like a dropped connection
    struct Broken(bool);

    impl ChunkSource for Broken {
        async fn next_chunk(&mut self) -> Result<Option<Bytes>, UploadError> {
            if self.0 {
                Err(UploadError::Source("connection reset".to_string()))
            } else {
                self.0 = true;
                Ok(Some(Bytes::from_static(b"partial")))
            }
        }
    }

    fn leftovers(dir: &Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| n.ends_with(".part"))
            .collect()
    }

    #[tokio::test]
    async fn test_store_writes_exact_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path(), 1024);

        let stored = store
            .store("mesh.obj", Chunks::of(&[b"v 0 0 0\n", b"v 1 0 0\n"]))
            .await
            .unwrap();

        assert_eq!(stored.name, "mesh.obj");
        assert_eq!(stored.size, 16);
        assert_eq!(stored.path, dir.path().join("mesh.obj"));
        assert_eq!(
            std::fs::read(dir.path().join("mesh.obj")).unwrap(),
            b"v 0 0 0\nv 1 0 0\n"
        );
        assert!(leftovers(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_second_upload_overwrites_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path(), 1024);

        store
            .store("scene.glb", Chunks::of(&[b"first version, longer"]))
            .await
            .unwrap();
        store
            .store("scene.glb", Chunks::of(&[b"second"]))
            .await
            .unwrap();

        assert_eq!(std::fs::read(dir.path().join("scene.glb")).unwrap(), b"second");
    }

    #[tokio::test]
    async fn test_empty_file_is_stored() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path(), 1024);

        let stored = store.store("empty.txt", Chunks::of(&[])).await.unwrap();
        assert_eq!(stored.size, 0);
        assert!(dir.path().join("empty.txt").is_file());
    }

    #[tokio::test]
    async fn test_too_large_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path(), 8);

        let err = store
            .store("big.bin", Chunks::of(&[b"12345", b"67890"]))
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::TooLarge { limit: 8 }));
        assert!(!dir.path().join("big.bin").exists());
        assert!(leftovers(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_failed_stream_keeps_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path(), 1024);
        std::fs::write(dir.path().join("model.stl"), b"old").unwrap();

        let err = store.store("model.stl", Broken(false)).await.unwrap_err();

        assert!(matches!(err, UploadError::Source(_)));
        assert_eq!(std::fs::read(dir.path().join("model.stl")).unwrap(), b"old");
        assert!(leftovers(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_missing_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path().join("gone"), 1024);

        let err = store.store("a.png", Chunks::of(&[b"png"])).await.unwrap_err();
        assert!(matches!(err, UploadError::Io(_)));
    }

    #[tokio::test]
    async fn test_invalid_name_never_touches_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path(), 1024);

        let err = store.store("..", Chunks::of(&[b"x"])).await.unwrap_err();
        assert!(matches!(err, UploadError::InvalidFileName(_)));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_name_at_filesystem_limit() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path(), 1024);
        let name = format!("{}.glb", "a".repeat(246));
        assert_eq!(name.len(), 250);

        let stored = store.store(&name, Chunks::of(&[b"glTF"])).await.unwrap();
        assert_eq!(stored.name, name);
        assert_eq!(std::fs::read(dir.path().join(&name)).unwrap(), b"glTF");
        assert!(leftovers(dir.path()).is_empty());
    }

    #[test]
    fn test_partial_names() {
        assert!(is_partial_name(".upload-4242-0.part"));
        assert!(!is_partial_name(".upload-.part"));
        assert!(!is_partial_name("model.part"));
        assert!(!is_partial_name(".upload-notes.txt"));
    }

    #[test]
    fn test_stale_partials_removed() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".upload-1-0.part"), b"half").unwrap();
        std::fs::write(dir.path().join("keep.glb"), b"glb").unwrap();
        std::fs::write(dir.path().join("notes.part"), b"user file").unwrap();

        let store = UploadStore::new(dir.path(), 1024);
        assert_eq!(store.remove_stale_partials().unwrap(), 1);
        assert!(!dir.path().join(".upload-1-0.part").exists());
        assert!(dir.path().join("keep.glb").exists());
        assert!(dir.path().join("notes.part").exists());
    }
}
