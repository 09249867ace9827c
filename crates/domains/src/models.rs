//! # Domain Models
//!
//! These structs represent the core entities of the marketplace.
//! Identifiers are database-assigned integers, matching the relational schema.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

pub type UserId = i64;
pub type CategoryId = i64;
pub type AdId = i64;
pub type ImageId = i64;
pub type FavoriteId = i64;

/// Postal address attached to every user. Fields start out empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub street_address: String,
    pub postal_code: String,
    pub city: String,
}

/// A registered account. The password hash lives in [`Credentials`] and is
/// never part of this struct, so it cannot leak through serialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
    pub date_joined: DateTime<Utc>,
    pub address: Address,
}

/// A user together with the stored password hash (PHC string).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: User,
    pub password_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
    pub password_hash: String,
    pub address: Address,
}

/// Partial profile update. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileChanges {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<Option<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AddressChanges {
    pub street_address: Option<String>,
    pub postal_code: Option<String>,
    pub city: Option<String>,
}

/// Flat named lookup table for ads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

/// A marketplace listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ad {
    pub id: AdId,
    pub title: String,
    pub description: String,
    pub price: i32,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    pub is_sold: bool,
    /// Immutable after creation.
    pub owner: UserId,
    pub category: Option<CategoryId>,
    pub thumbnail: Option<ImageId>,
}

/// A validated ad ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAd {
    pub title: String,
    pub description: String,
    pub price: i32,
    pub owner: UserId,
    pub category: Option<CategoryId>,
}

/// Partial ad update. The outer `Option` means "field present in the request",
/// the inner one distinguishes clearing a nullable reference from setting it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AdChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub is_sold: Option<bool>,
    #[serde(default, deserialize_with = "present_nullable")]
    pub category: Option<Option<CategoryId>>,
    #[serde(default, deserialize_with = "present_nullable")]
    pub thumbnail: Option<Option<ImageId>>,
}

impl AdChanges {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Read projections over the ad table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdFilter {
    All,
    Unsold,
    Owner(UserId),
    Category(CategoryId),
    FavoritedBy(UserId),
}

/// Encodings accepted for uploads and served back to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Jpeg,
    Png,
}

impl ImageFormat {
    pub fn mime(self) -> mime::Mime {
        match self {
            Self::Jpeg => mime::IMAGE_JPEG,
            Self::Png => mime::IMAGE_PNG,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "jpeg" | "jpg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            _ => None,
        }
    }
}

/// Metadata row for an uploaded image. The bytes live in media storage
/// under `storage_key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub id: ImageId,
    pub ad: AdId,
    pub description: Option<String>,
    pub format: ImageFormat,
    #[serde(skip_serializing)]
    pub storage_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewImage {
    pub ad: AdId,
    pub description: Option<String>,
    pub format: ImageFormat,
    pub storage_key: String,
}

/// A user-curated bookmark of an ad.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteAd {
    pub id: FavoriteId,
    pub user: UserId,
    pub favorite_ad: AdId,
}

/// Bearer tokens handed out at login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Deserializes a field that may be absent, `null`, or a value.
/// Absent stays `None` through `#[serde(default)]`; `null` becomes `Some(None)`.
fn present_nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ad_changes_distinguish_null_from_absent() {
        let changes: AdChanges =
            serde_json::from_str(r#"{"title":"Bike","category":null}"#).unwrap();
        assert_eq!(changes.title.as_deref(), Some("Bike"));
        assert_eq!(changes.category, Some(None));
        assert_eq!(changes.thumbnail, None);

        let changes: AdChanges = serde_json::from_str(r#"{"thumbnail":7}"#).unwrap();
        assert_eq!(changes.thumbnail, Some(Some(7)));
        assert!(!changes.is_empty());
        assert!(AdChanges::default().is_empty());
    }

    #[test]
    fn image_serialization_hides_storage_key() {
        let image = Image {
            id: 1,
            ad: 2,
            description: None,
            format: ImageFormat::Png,
            storage_key: "ab/cd/abcd.png".into(),
        };
        let json = serde_json::to_value(&image).unwrap();
        assert!(json.get("storage_key").is_none());
        assert_eq!(json["format"], "png");
    }

    #[test]
    fn image_format_round_trips_through_names() {
        assert_eq!(ImageFormat::parse("jpg"), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::parse(ImageFormat::Png.as_str()), Some(ImageFormat::Png));
        assert_eq!(ImageFormat::parse("gif"), None);
        assert_eq!(ImageFormat::Jpeg.mime(), mime::IMAGE_JPEG);
    }
}
