//! On-disk content store.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::error::{LoaderError, Result};
use crate::key::ContentKey;

/// Flat directory of cached image blobs, one file per [`ContentKey`].
///
/// Entries are raw encoded image bytes with no sidecar metadata. Nothing in
/// this crate removes entries once written.
#[derive(Clone, Debug)]
pub struct ContentStore {
    root: PathBuf,
}

impl ContentStore {
    /// Store rooted at `root`; the directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Cache directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Final path of the entry for `key`.
    pub fn path_for(&self, key: &ContentKey) -> PathBuf {
        self.root.join(key.as_str())
    }

    /// Create the cache directory if missing.
    pub async fn ensure_root(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|err| LoaderError::io(&self.root, err))
    }

    /// `true` iff a regular file exists for `key`. Never fails; any error
    /// looking the entry up counts as absent.
    pub async fn exists(&self, key: &ContentKey) -> bool {
        match tokio::fs::metadata(self.path_for(key)).await {
            Ok(meta) => meta.is_file(),
            Err(err) => {
                if err.kind() != ErrorKind::NotFound {
                    tracing::debug!(
                        %key,
                        error = %err,
                        "cache entry not readable"
                    );
                }
                false
            }
        }
    }

    /// Bytes previously written under `key`; `NotFound` when absent.
    pub async fn read(&self, key: &ContentKey) -> Result<Vec<u8>> {
        let path = self.path_for(key);
        tokio::fs::read(&path).await.map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                LoaderError::NotFound(key.to_string())
            } else {
                LoaderError::io(path, err)
            }
        })
    }

    /// Store `bytes` under `key`, replacing any existing entry.
    ///
    /// Bytes land in a uniquely named temp file first and are renamed into
    /// place, so readers only ever observe complete entries. Concurrent
    /// writers of one key resolve last-writer-wins.
    pub async fn write(&self, key: &ContentKey, bytes: &[u8]) -> Result<()> {
        self.ensure_root().await?;
        let path = self.path_for(key);
        let tmp = self
            .root
            .join(format!(".{key}.tmp-{}", Uuid::new_v4().simple()));

        if let Err(err) = write_file(&tmp, bytes).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(err);
        }

        if let Err(err) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(LoaderError::io(path, err));
        }

        tracing::trace!(%key, len = bytes.len(), "cache entry written");
        Ok(())
    }
}

async fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = tokio::fs::File::create(path)
        .await
        .map_err(|err| LoaderError::io(path, err))?;
    file.write_all(bytes)
        .await
        .map_err(|err| LoaderError::io(path, err))?;
    file.flush().await.map_err(|err| LoaderError::io(path, err))?;
    file.sync_all()
        .await
        .map_err(|err| LoaderError::io(path, err))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::KeyStrategy;

    fn key(name: &str) -> ContentKey {
        ContentKey::derive(name, KeyStrategy::LastSegment).unwrap()
    }

    #[tokio::test]
    async fn write_then_read_round_trips_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::new(dir.path());

        let samples: Vec<Vec<u8>> = vec![
            vec![0],
            vec![0xff; 3],
            (0..=255u8).collect(),
            (0..100_000u32).map(|i| (i.wrapping_mul(31) >> 3) as u8).collect(),
        ];

        for (i, bytes) in samples.iter().enumerate() {
            let k = key(&format!("blob-{i}.bin"));
            store.write(&k, bytes).await.unwrap();
            assert!(store.exists(&k).await);
            assert_eq!(&store.read(&k).await.unwrap(), bytes);
        }
    }

    #[tokio::test]
    async fn missing_entry_is_absent_and_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::new(dir.path().join("never-created"));
        let k = key("missing.png");

        assert!(!store.exists(&k).await);
        let err = store.read(&k).await.unwrap_err();
        assert!(err.is_not_found(), "unexpected error: {err}");
    }

    #[tokio::test]
    async fn overwrite_replaces_only_that_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::new(dir.path());
        let a = key("a.png");
        let b = key("b.png");

        store.write(&a, b"first").await.unwrap();
        store.write(&b, b"other").await.unwrap();
        store.write(&a, b"second").await.unwrap();

        assert_eq!(store.read(&a).await.unwrap(), b"second");
        assert_eq!(store.read(&b).await.unwrap(), b"other");
    }

    #[tokio::test]
    async fn write_creates_root_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("nested").join("cache");
        let store = ContentStore::new(&root);

        store.write(&key("a.png"), b"data").await.unwrap();

        let names: Vec<String> = std::fs::read_dir(&root)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.png".to_string()]);
    }

    #[tokio::test]
    async fn write_into_unusable_root_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"not a directory").unwrap();
        let store = ContentStore::new(&blocker);

        let err = store.write(&key("a.png"), b"data").await.unwrap_err();
        assert!(matches!(err, LoaderError::Io { .. }), "got {err}");
    }

    #[tokio::test]
    async fn concurrent_writes_of_one_key_leave_a_complete_entry() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::new(dir.path());
        let k = key("hot.png");

        let payloads: Vec<Vec<u8>> =
            (0..8u8).map(|i| vec![i; 64 * 1024]).collect();
        let mut tasks = Vec::new();
        for bytes in payloads.clone() {
            let store = store.clone();
            let k = k.clone();
            tasks.push(tokio::spawn(async move {
                store.write(&k, &bytes).await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let stored = store.read(&k).await.unwrap();
        assert!(payloads.contains(&stored));
    }
}
