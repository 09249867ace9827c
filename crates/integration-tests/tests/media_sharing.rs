//! Shared blobs under concurrent upload and delete.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use domains::{
    AdRepository, Address, DomainResult, ImageFormat, MediaStorage, NewAd, NewUser, UserId,
    UserRepository,
};
use integration_tests::png;
use services::{ImageService, MediaLibrary};
use storage_adapters::{ImageProcessor, InMemoryMediaStorage, InMemoryStore};

/// Media storage whose next `put` stops after writing until resumed.
struct PausingMedia {
    inner: InMemoryMediaStorage,
    pause_next: AtomicBool,
    paused: tokio::sync::Notify,
    resume: tokio::sync::Notify,
}

impl PausingMedia {
    fn new() -> Self {
        Self {
            inner: InMemoryMediaStorage::new(),
            pause_next: AtomicBool::new(false),
            paused: tokio::sync::Notify::new(),
            resume: tokio::sync::Notify::new(),
        }
    }
}

#[async_trait]
impl MediaStorage for PausingMedia {
    fn storage_key(&self, data: &[u8], format: ImageFormat) -> String {
        self.inner.storage_key(data, format)
    }

    async fn put(&self, data: Bytes, format: ImageFormat) -> DomainResult<String> {
        let key = self.inner.put(data, format).await?;
        if self.pause_next.swap(false, Ordering::SeqCst) {
            self.paused.notify_one();
            self.resume.notified().await;
        }
        Ok(key)
    }

    async fn get(&self, storage_key: &str) -> DomainResult<Bytes> {
        self.inner.get(storage_key).await
    }

    async fn delete(&self, storage_key: &str) -> DomainResult<()> {
        self.inner.delete(storage_key).await
    }
}

async fn owner_with_ad(store: &InMemoryStore) -> (UserId, i64) {
    let owner = UserRepository::create(
        store,
        NewUser {
            username: "alice".into(),
            email: "alice@example.com".into(),
            first_name: String::new(),
            last_name: String::new(),
            phone_number: None,
            password_hash: "$argon2id$placeholder".into(),
            address: Address::default(),
        },
    )
    .await
    .unwrap()
    .id;
    let ad = AdRepository::create(
        store,
        NewAd {
            title: "Camera".into(),
            description: String::new(),
            price: 250,
            owner,
            category: None,
        },
    )
    .await
    .unwrap();
    (owner, ad.id)
}

#[tokio::test]
async fn delete_during_identical_upload_keeps_the_blob() {
    let store = Arc::new(InMemoryStore::new());
    let media = Arc::new(PausingMedia::new());
    let library = Arc::new(MediaLibrary::new(store.clone(), media.clone()));
    let images = Arc::new(ImageService::new(
        store.clone(),
        store.clone(),
        library,
        Arc::new(ImageProcessor::new()),
    ));
    let (owner, ad_id) = owner_with_ad(&store).await;
    let data = Bytes::from(png(4));

    let first = images
        .create(owner, ad_id, Some(data.clone()), None)
        .await
        .unwrap();

    // Second upload of the same bytes: blob written, row not yet inserted.
    media.pause_next.store(true, Ordering::SeqCst);
    let uploading = tokio::spawn({
        let images = images.clone();
        let data = data.clone();
        async move { images.create(owner, ad_id, Some(data), None).await }
    });
    media.paused.notified().await;

    let deleting = tokio::spawn({
        let images = images.clone();
        async move { images.delete(owner, first.id).await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(
        !deleting.is_finished(),
        "blob release must wait for the in-flight upload"
    );

    media.resume.notify_one();
    let second = uploading.await.unwrap().unwrap();
    deleting.await.unwrap().unwrap();

    assert_eq!(second.storage_key, first.storage_key);
    assert_eq!(media.inner.len(), 1);
    let content = images.fetch(second.clone(), ImageFormat::Png).await.unwrap();
    assert_eq!(content.data, data);

    images.delete(owner, second.id).await.unwrap();
    assert!(media.inner.is_empty());
}
