//! # Storage adapters
//!
//! Implementations of the persistence and media ports from `domains`:
//!
//! - [`memory::InMemoryStore`]: every repository, backed by `dashmap`
//! - [`postgres::PgStore`]: every repository on Postgres (feature `db-postgres`)
//! - [`media`]: blob storage backends and the image processor

pub mod media;
pub mod memory;
#[cfg(feature = "db-postgres")]
pub mod postgres;

#[cfg(feature = "media-local")]
pub use media::local::LocalMediaStorage;
pub use media::memory::InMemoryMediaStorage;
pub use media::processor::ImageProcessor;
pub use memory::InMemoryStore;
#[cfg(feature = "db-postgres")]
pub use postgres::PgStore;
