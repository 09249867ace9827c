//! # services
//!
//! Business rules of the marketplace: validation, ownership checks and the
//! cascades that span more than one repository. Depends only on `domains`
//! ports, so every adapter set (Postgres, in-memory, mocks) plugs in.

pub mod accounts;
pub mod ads;
pub mod categories;
pub mod favorites;
pub mod images;
pub mod media;
pub mod validation;

pub use accounts::{AccountService, PasswordChange, ProfileUpdate, Registration};
pub use ads::{AdDraft, AdService};
pub use categories::CategoryService;
pub use favorites::FavoriteService;
pub use images::{ImageContent, ImageService};
pub use media::MediaLibrary;

use domains::{DomainError, DomainResult};

/// Runs CPU-bound work (password hashing, image codecs) on the blocking pool.
pub(crate) async fn blocking<T, F>(work: F) -> DomainResult<T>
where
    F: FnOnce() -> DomainResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(DomainError::internal)?
}
