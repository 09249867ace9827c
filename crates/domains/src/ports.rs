//! # Ports
//!
//! Any adapter must implement these traits to be wired into the binary.
//! Services only ever see `Arc<dyn Port>`.

use async_trait::async_trait;
use bytes::Bytes;

use crate::errors::DomainResult;
use crate::models::{
    Ad, AdChanges, AdFilter, AdId, AddressChanges, Category, CategoryId, Credentials, FavoriteAd,
    Image, ImageFormat, ImageId, NewAd, NewImage, NewUser, ProfileChanges, TokenPair, User, UserId,
};

/// Persistence contract for users and their addresses.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `Conflict` when the username is taken.
    async fn create(&self, user: NewUser) -> DomainResult<User>;
    async fn find_by_id(&self, id: UserId) -> DomainResult<Option<User>>;
    async fn credentials_by_username(&self, username: &str) -> DomainResult<Option<Credentials>>;
    async fn credentials_by_id(&self, id: UserId) -> DomainResult<Option<Credentials>>;
    async fn update_profile(&self, id: UserId, changes: ProfileChanges) -> DomainResult<User>;
    async fn update_address(&self, id: UserId, changes: AddressChanges) -> DomainResult<User>;
    async fn set_password_hash(&self, id: UserId, password_hash: String) -> DomainResult<()>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Fails with `Conflict` when the name is taken.
    async fn create(&self, name: String) -> DomainResult<Category>;
    async fn find_by_id(&self, id: CategoryId) -> DomainResult<Option<Category>>;
    async fn list(&self) -> DomainResult<Vec<Category>>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait AdRepository: Send + Sync {
    async fn create(&self, ad: NewAd) -> DomainResult<Ad>;
    async fn find_by_id(&self, id: AdId) -> DomainResult<Option<Ad>>;
    /// Results are ordered by ascending id.
    async fn list(&self, filter: AdFilter) -> DomainResult<Vec<Ad>>;
    /// Applies already-validated changes and refreshes `last_modified`.
    async fn update(&self, id: AdId, changes: AdChanges) -> DomainResult<Ad>;
    /// Deletes the ad together with its images and favorites.
    /// Returns the storage keys of the removed images.
    async fn delete(&self, id: AdId) -> DomainResult<Vec<String>>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ImageRepository: Send + Sync {
    async fn create(&self, image: NewImage) -> DomainResult<Image>;
    async fn find_by_id(&self, id: ImageId) -> DomainResult<Option<Image>>;
    async fn list_by_ad(&self, ad: AdId) -> DomainResult<Vec<Image>>;
    async fn update_description(
        &self,
        id: ImageId,
        description: Option<String>,
    ) -> DomainResult<Image>;
    async fn delete(&self, id: ImageId) -> DomainResult<()>;
    /// Number of image rows still pointing at a stored blob.
    async fn count_by_storage_key(&self, storage_key: &str) -> DomainResult<i64>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait FavoriteRepository: Send + Sync {
    /// Fails with `Conflict` when the pair already exists.
    async fn create(&self, user: UserId, ad: AdId) -> DomainResult<FavoriteAd>;
    async fn find(&self, user: UserId, ad: AdId) -> DomainResult<Option<FavoriteAd>>;
    async fn list_all(&self) -> DomainResult<Vec<FavoriteAd>>;
    async fn list_by_user(&self, user: UserId) -> DomainResult<Vec<FavoriteAd>>;
    /// Returns `false` when nothing matched.
    async fn delete(&self, user: UserId, ad: AdId) -> DomainResult<bool>;
}

/// Blob storage for image bytes.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait MediaStorage: Send + Sync {
    /// The key `put` will return for these bytes. Identical payloads map to
    /// the same key.
    fn storage_key(&self, data: &[u8], format: ImageFormat) -> String;
    /// Saves the bytes and returns the storage key to keep on the image row.
    async fn put(&self, data: Bytes, format: ImageFormat) -> DomainResult<String>;
    async fn get(&self, storage_key: &str) -> DomainResult<Bytes>;
    async fn delete(&self, storage_key: &str) -> DomainResult<()>;
}

/// CPU-bound image inspection and conversion.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait MediaProcessor: Send + Sync {
    /// Sniffs and decodes the payload; only JPEG and PNG are accepted.
    fn inspect(&self, data: &[u8]) -> DomainResult<ImageFormat>;
    fn transcode(&self, data: &[u8], target: ImageFormat) -> DomainResult<Bytes>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> DomainResult<String>;
    fn verify(&self, password: &str, password_hash: &str) -> bool;
}

/// Bearer token issuance and verification.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait TokenService: Send + Sync {
    fn issue(&self, user: UserId) -> DomainResult<TokenPair>;
    /// Exchanges a refresh token for a new access token.
    fn refresh(&self, refresh_token: &str) -> DomainResult<String>;
    fn verify_access(&self, access_token: &str) -> DomainResult<UserId>;
}
