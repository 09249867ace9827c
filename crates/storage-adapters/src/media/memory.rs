use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use domains::{DomainError, DomainResult, ImageFormat, MediaStorage};

use super::content_key;

/// Keeps blobs in process memory. Same keying as the filesystem storage.
#[derive(Default)]
pub struct InMemoryMediaStorage {
    blobs: DashMap<String, Bytes>,
}

impl InMemoryMediaStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

#[async_trait]
impl MediaStorage for InMemoryMediaStorage {
    fn storage_key(&self, data: &[u8], format: ImageFormat) -> String {
        content_key(data, format)
    }

    async fn put(&self, data: Bytes, format: ImageFormat) -> DomainResult<String> {
        let key = self.storage_key(&data, format);
        self.blobs.entry(key.clone()).or_insert(data);
        Ok(key)
    }

    async fn get(&self, storage_key: &str) -> DomainResult<Bytes> {
        self.blobs
            .get(storage_key)
            .map(|blob| blob.clone())
            .ok_or_else(|| DomainError::not_found("Media", storage_key))
    }

    async fn delete(&self, storage_key: &str) -> DomainResult<()> {
        self.blobs.remove(storage_key);
        Ok(())
    }
}
