//! Local filesystem implementation of `MediaStorage`.
//! Content-addressable storage with two-level directory sharding.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use domains::{DomainError, DomainResult, ImageFormat, MediaStorage};
use tokio::fs;
use tracing::debug;

use super::content_key;

pub struct LocalMediaStorage {
    /// Root directory for all uploads (e.g., "./data/media")
    root_path: PathBuf,
}

impl LocalMediaStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root_path: root.into(),
        }
    }

    /// Maps a storage key to a path under the root, refusing anything that
    /// could climb out of it.
    fn resolve(&self, storage_key: &str) -> DomainResult<PathBuf> {
        let relative = Path::new(storage_key);
        let plain = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
        if !plain || storage_key.is_empty() {
            return Err(DomainError::internal(format!(
                "invalid storage key `{storage_key}`"
            )));
        }
        Ok(self.root_path.join(relative))
    }
}

#[async_trait]
impl MediaStorage for LocalMediaStorage {
    /// Saves an upload using its SHA-256 hash as the filename.
    /// This automatically deduplicates files.
    fn storage_key(&self, data: &[u8], format: ImageFormat) -> String {
        content_key(data, format)
    }

    async fn put(&self, data: Bytes, format: ImageFormat) -> DomainResult<String> {
        let key = self.storage_key(&data, format);
        let target_path = self.resolve(&key)?;
        if let Some(parent) = target_path.parent() {
            fs::create_dir_all(parent).await.map_err(DomainError::internal)?;
        }

        if fs::try_exists(&target_path).await.map_err(DomainError::internal)? {
            debug!(storage_key = %key, "blob already stored");
            return Ok(key);
        }
        // Write under a temporary name so readers never see a partial file.
        let partial = target_path.with_extension("part");
        fs::write(&partial, &data).await.map_err(DomainError::internal)?;
        fs::rename(&partial, &target_path)
            .await
            .map_err(DomainError::internal)?;
        Ok(key)
    }

    async fn get(&self, storage_key: &str) -> DomainResult<Bytes> {
        let path = self.resolve(storage_key)?;
        match fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Err(DomainError::not_found("Media", storage_key))
            }
            Err(err) => Err(DomainError::internal(err)),
        }
    }

    async fn delete(&self, storage_key: &str) -> DomainResult<()> {
        let path = self.resolve(storage_key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(DomainError::internal(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("sellpoint-media-{name}-{}", std::process::id()))
    }

    #[tokio::test]
    async fn put_get_delete_on_disk() {
        let root = scratch_dir("roundtrip");
        let storage = LocalMediaStorage::new(&root);

        let key = storage
            .put(Bytes::from_static(b"pixels"), ImageFormat::Png)
            .await
            .unwrap();
        assert!(root.join(&key).exists());
        assert_eq!(storage.get(&key).await.unwrap(), Bytes::from_static(b"pixels"));

        storage.delete(&key).await.unwrap();
        assert!(matches!(
            storage.get(&key).await,
            Err(DomainError::NotFound { .. })
        ));
        // Deleting twice is fine.
        storage.delete(&key).await.unwrap();

        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn keys_cannot_escape_root() {
        let storage = LocalMediaStorage::new(scratch_dir("escape"));
        assert!(storage.get("../etc/passwd").await.is_err());
        assert!(storage.get("/etc/passwd").await.is_err());
    }
}
