//! # Media
//!
//! Blob storage for image bytes plus the `image`-crate backed processor.
//! Blobs are content-addressed: the key is the SHA-256 of the bytes, sharded
//! into two directory levels, so identical uploads share one blob.

#[cfg(feature = "media-local")]
pub mod local;
pub mod memory;
pub mod processor;

use domains::ImageFormat;
use sha2::{Digest, Sha256};

/// Builds the sharded storage key "ab/cd/abcd....ext" for a payload.
pub fn content_key(data: &[u8], format: ImageFormat) -> String {
    let hash = hex::encode(Sha256::digest(data));
    format!(
        "{}/{}/{}.{}",
        &hash[0..2],
        &hash[2..4],
        hash,
        format.extension()
    )
}
