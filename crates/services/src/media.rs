//! # Media library
//!
//! Image bytes are content-addressed, so identical uploads share one blob and
//! a blob may only be removed once no image row references it. Storing a blob
//! together with its row, and the reference check before removal, run under a
//! per-key lock so a delete can never drop a blob an upload is about to use.

use std::sync::Arc;

use bytes::Bytes;
use dashmap::DashMap;
use domains::{DomainResult, Image, ImageRepository, MediaStorage, NewImage};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, warn};

pub struct MediaLibrary {
    images: Arc<dyn ImageRepository>,
    media: Arc<dyn MediaStorage>,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

/// Exclusive hold on one storage key. The lock entry is dropped with the last
/// holder.
struct KeyGuard<'a> {
    library: &'a MediaLibrary,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.library
            .locks
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

impl MediaLibrary {
    pub fn new(images: Arc<dyn ImageRepository>, media: Arc<dyn MediaStorage>) -> Self {
        Self {
            images,
            media,
            locks: DashMap::new(),
        }
    }

    async fn lock(&self, key: &str) -> KeyGuard<'_> {
        let lock = self.locks.entry(key.to_string()).or_default().clone();
        KeyGuard {
            library: self,
            key: key.to_string(),
            guard: Some(lock.lock_owned().await),
        }
    }

    /// Stores `payload` and inserts the image row that points at it. The blob
    /// is released again when the insert fails.
    pub async fn attach(&self, payload: Bytes, image: NewImage) -> DomainResult<Image> {
        let key = self.media.storage_key(&payload, image.format);
        let _held = self.lock(&key).await;

        let storage_key = self.media.put(payload, image.format).await?;
        let created = self
            .images
            .create(NewImage {
                storage_key: storage_key.clone(),
                ..image
            })
            .await;
        if created.is_err() {
            self.remove_unreferenced(&storage_key).await;
        }
        created
    }

    pub async fn read(&self, storage_key: &str) -> DomainResult<Bytes> {
        self.media.get(storage_key).await
    }

    /// Removes the blob if no image row references it any more. Failures are
    /// logged; a leftover blob is harmless.
    pub async fn release(&self, storage_key: &str) {
        let _held = self.lock(storage_key).await;
        self.remove_unreferenced(storage_key).await;
    }

    async fn remove_unreferenced(&self, storage_key: &str) {
        match self.images.count_by_storage_key(storage_key).await {
            Ok(0) => match self.media.delete(storage_key).await {
                Ok(()) => debug!(storage_key, "media removed"),
                Err(err) => warn!(storage_key, error = %err, "failed to remove media"),
            },
            Ok(_) => {}
            Err(err) => warn!(storage_key, error = %err, "could not count media references"),
        }
    }

    #[cfg(test)]
    fn held_keys(&self) -> usize {
        self.locks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::{DomainError, ImageFormat, MockImageRepository, MockMediaStorage};

    fn new_image() -> NewImage {
        NewImage {
            ad: 4,
            description: None,
            format: ImageFormat::Png,
            storage_key: String::new(),
        }
    }

    #[tokio::test]
    async fn attach_stores_blob_then_row() {
        let mut images = MockImageRepository::new();
        let mut media = MockMediaStorage::new();
        media
            .expect_storage_key()
            .returning(|_, _| "ab/cd/abcd.png".into());
        media
            .expect_put()
            .returning(|_, _| Ok("ab/cd/abcd.png".into()));
        images
            .expect_create()
            .withf(|new| new.storage_key == "ab/cd/abcd.png" && new.ad == 4)
            .returning(|new| {
                Ok(Image {
                    id: 1,
                    ad: new.ad,
                    description: new.description,
                    format: new.format,
                    storage_key: new.storage_key,
                })
            });

        let library = MediaLibrary::new(Arc::new(images), Arc::new(media));
        let image = library
            .attach(Bytes::from_static(b"data"), new_image())
            .await
            .unwrap();
        assert_eq!(image.storage_key, "ab/cd/abcd.png");
        assert_eq!(library.held_keys(), 0);
    }

    #[tokio::test]
    async fn failed_insert_releases_the_blob() {
        let mut images = MockImageRepository::new();
        let mut media = MockMediaStorage::new();
        media.expect_storage_key().returning(|_, _| "k".into());
        media.expect_put().returning(|_, _| Ok("k".into()));
        images
            .expect_create()
            .returning(|new| Err(DomainError::not_found("Ad", new.ad)));
        images
            .expect_count_by_storage_key()
            .withf(|key| key == "k")
            .returning(|_| Ok(0));
        media
            .expect_delete()
            .withf(|key| key == "k")
            .times(1)
            .returning(|_| Ok(()));

        let library = MediaLibrary::new(Arc::new(images), Arc::new(media));
        let err = library
            .attach(Bytes::from_static(b"data"), new_image())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn release_keeps_referenced_blobs() {
        let mut images = MockImageRepository::new();
        let mut media = MockMediaStorage::new();
        images
            .expect_count_by_storage_key()
            .returning(|key| Ok(if key == "shared" { 2 } else { 0 }));
        media
            .expect_delete()
            .withf(|key| key == "own")
            .times(1)
            .returning(|_| Ok(()));

        let library = MediaLibrary::new(Arc::new(images), Arc::new(media));
        library.release("shared").await;
        library.release("own").await;
        assert_eq!(library.held_keys(), 0);
    }
}
