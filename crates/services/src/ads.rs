//! # Ad lifecycle
//!
//! Creation, ownership-checked mutation, cascading deletion and the read
//! projections over listings.

use std::sync::Arc;

use domains::{
    Ad, AdChanges, AdFilter, AdId, AdRepository, CategoryId, CategoryRepository, DomainError,
    DomainResult, ImageRepository, NewAd, UserId,
};
use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::media::MediaLibrary;
use crate::validation;

/// Raw create-ad input as sent by a client.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdDraft {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub category: Option<CategoryId>,
}

pub struct AdService {
    ads: Arc<dyn AdRepository>,
    images: Arc<dyn ImageRepository>,
    categories: Arc<dyn CategoryRepository>,
    library: Arc<MediaLibrary>,
}

impl AdService {
    pub fn new(
        ads: Arc<dyn AdRepository>,
        images: Arc<dyn ImageRepository>,
        categories: Arc<dyn CategoryRepository>,
        library: Arc<MediaLibrary>,
    ) -> Self {
        Self {
            ads,
            images,
            categories,
            library,
        }
    }

    #[instrument(skip(self, draft))]
    pub async fn create(&self, owner: UserId, draft: AdDraft) -> DomainResult<Ad> {
        let title = validation::text(
            "title",
            draft.title.as_deref().unwrap_or_default(),
            1,
            validation::TITLE_MAX,
        )?;
        let description = match draft.description.as_deref() {
            Some(description) => {
                validation::text("description", description, 0, validation::DESCRIPTION_MAX)?
            }
            None => String::new(),
        };
        let price = match draft.price {
            Some(price) => validation::price(price)?,
            None => return Err(DomainError::validation("price", "this field is required")),
        };
        if let Some(category) = draft.category {
            self.ensure_category(category).await?;
        }

        let ad = self
            .ads
            .create(NewAd {
                title,
                description,
                price,
                owner,
                category: draft.category,
            })
            .await?;
        info!(ad_id = ad.id, "ad created");
        Ok(ad)
    }

    pub async fn get(&self, id: AdId) -> DomainResult<Ad> {
        self.ads
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Ad", id))
    }

    pub async fn list(&self, filter: AdFilter) -> DomainResult<Vec<Ad>> {
        self.ads.list(filter).await
    }

    /// Owner-only partial update. Ownership is checked before the changes are
    /// looked at, so a non-owner can never cause a write.
    #[instrument(skip(self, changes))]
    pub async fn update(
        &self,
        requester: UserId,
        id: AdId,
        changes: AdChanges,
    ) -> DomainResult<Ad> {
        let ad = self.owned(requester, id).await?;
        let changes = self.validate_changes(&ad, changes).await?;
        if changes.is_empty() {
            return Ok(ad);
        }
        let ad = self.ads.update(id, changes).await?;
        info!(ad_id = ad.id, "ad updated");
        Ok(ad)
    }

    /// Owner-only delete. Images and favorites go with the ad; blobs no other
    /// image row points at are removed from media storage.
    #[instrument(skip(self))]
    pub async fn delete(&self, requester: UserId, id: AdId) -> DomainResult<()> {
        self.owned(requester, id).await?;
        let storage_keys = self.ads.delete(id).await?;
        for key in storage_keys {
            self.library.release(&key).await;
        }
        info!(ad_id = id, "ad deleted");
        Ok(())
    }

    async fn owned(&self, requester: UserId, id: AdId) -> DomainResult<Ad> {
        let ad = self.get(id).await?;
        if ad.owner != requester {
            warn!(ad_id = id, requester, "ad mutation by non-owner rejected");
            return Err(DomainError::Unauthorized(
                "only the owner may modify this ad".into(),
            ));
        }
        Ok(ad)
    }

    async fn ensure_category(&self, id: CategoryId) -> DomainResult<()> {
        match self.categories.find_by_id(id).await? {
            Some(_) => Ok(()),
            None => Err(DomainError::validation(
                "category",
                format!("category {id} does not exist"),
            )),
        }
    }

    async fn validate_changes(&self, ad: &Ad, changes: AdChanges) -> DomainResult<AdChanges> {
        let title = changes
            .title
            .as_deref()
            .map(|title| validation::text("title", title, 1, validation::TITLE_MAX))
            .transpose()?;
        let description = changes
            .description
            .as_deref()
            .map(|text| validation::text("description", text, 0, validation::DESCRIPTION_MAX))
            .transpose()?;
        let price = changes
            .price
            .map(|price| validation::price(price).map(i64::from))
            .transpose()?;
        if let Some(Some(category)) = changes.category {
            self.ensure_category(category).await?;
        }
        if let Some(Some(thumbnail)) = changes.thumbnail {
            let belongs = self
                .images
                .find_by_id(thumbnail)
                .await?
                .is_some_and(|image| image.ad == ad.id);
            if !belongs {
                return Err(DomainError::validation(
                    "thumbnail",
                    "thumbnail must be one of this ad's images",
                ));
            }
        }

        Ok(AdChanges {
            title,
            description,
            price,
            is_sold: changes.is_sold,
            category: changes.category,
            thumbnail: changes.thumbnail,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domains::{
        Category, Image, ImageFormat, MockAdRepository, MockCategoryRepository,
        MockImageRepository, MockMediaStorage,
    };
    use mockall::predicate::eq;

    fn ad(id: AdId, owner: UserId) -> Ad {
        let now = Utc::now();
        Ad {
            id,
            title: "Bike".into(),
            description: String::new(),
            price: 100,
            created_at: now,
            last_modified: now,
            is_sold: false,
            owner,
            category: None,
            thumbnail: None,
        }
    }

    struct Mocks {
        ads: MockAdRepository,
        images: MockImageRepository,
        categories: MockCategoryRepository,
        media: MockMediaStorage,
    }

    impl Mocks {
        fn new() -> Self {
            Self {
                ads: MockAdRepository::new(),
                images: MockImageRepository::new(),
                categories: MockCategoryRepository::new(),
                media: MockMediaStorage::new(),
            }
        }

        fn service(self) -> AdService {
            let images = Arc::new(self.images);
            AdService::new(
                Arc::new(self.ads),
                images.clone(),
                Arc::new(self.categories),
                Arc::new(MediaLibrary::new(images, Arc::new(self.media))),
            )
        }
    }

    #[tokio::test]
    async fn create_sets_owner_and_defaults_description() {
        let mut mocks = Mocks::new();
        mocks
            .ads
            .expect_create()
            .withf(|new| new.owner == 7 && new.description.is_empty() && new.title == "Bike")
            .returning(|new| Ok(ad(1, new.owner)));

        let created = mocks
            .service()
            .create(
                7,
                AdDraft {
                    title: Some(" Bike ".into()),
                    price: Some(100),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(created.owner, 7);
        assert!(!created.is_sold);
    }

    #[tokio::test]
    async fn create_requires_price() {
        let mocks = Mocks::new();
        let err = mocks
            .service()
            .create(
                7,
                AdDraft {
                    title: Some("Bike".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation { ref field, .. } if field == "price"));
    }

    #[tokio::test]
    async fn create_rejects_unknown_category() {
        let mut mocks = Mocks::new();
        mocks
            .categories
            .expect_find_by_id()
            .with(eq(9))
            .returning(|_| Ok(None));
        let err = mocks
            .service()
            .create(
                7,
                AdDraft {
                    title: Some("Bike".into()),
                    price: Some(1),
                    category: Some(9),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation { ref field, .. } if field == "category"));
    }

    #[tokio::test]
    async fn update_by_non_owner_never_writes() {
        let mut mocks = Mocks::new();
        mocks
            .ads
            .expect_find_by_id()
            .returning(|id| Ok(Some(ad(id, 1))));
        mocks.ads.expect_update().never();

        let err = mocks
            .service()
            .update(
                2,
                5,
                AdChanges {
                    price: Some(-5),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn update_missing_ad_is_not_found() {
        let mut mocks = Mocks::new();
        mocks.ads.expect_find_by_id().returning(|_| Ok(None));
        let err = mocks
            .service()
            .update(1, 5, AdChanges::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { entity: "Ad", .. }));
    }

    #[tokio::test]
    async fn update_rejects_thumbnail_from_other_ad() {
        let mut mocks = Mocks::new();
        mocks
            .ads
            .expect_find_by_id()
            .returning(|id| Ok(Some(ad(id, 1))));
        mocks.images.expect_find_by_id().returning(|id| {
            Ok(Some(Image {
                id,
                ad: 99,
                description: None,
                format: ImageFormat::Png,
                storage_key: "k".into(),
            }))
        });
        mocks.ads.expect_update().never();

        let err = mocks
            .service()
            .update(
                1,
                5,
                AdChanges {
                    thumbnail: Some(Some(3)),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation { ref field, .. } if field == "thumbnail"));
    }

    #[tokio::test]
    async fn update_passes_trimmed_changes_to_store() {
        let mut mocks = Mocks::new();
        mocks
            .ads
            .expect_find_by_id()
            .returning(|id| Ok(Some(ad(id, 1))));
        mocks
            .categories
            .expect_find_by_id()
            .returning(|id| Ok(Some(Category { id, name: "Sport".into() })));
        mocks
            .ads
            .expect_update()
            .withf(|id, changes| {
                *id == 5
                    && changes.title.as_deref() == Some("Racer")
                    && changes.category == Some(Some(2))
                    && changes.is_sold == Some(true)
            })
            .returning(|id, _| Ok(ad(id, 1)));

        mocks
            .service()
            .update(
                1,
                5,
                AdChanges {
                    title: Some(" Racer".into()),
                    is_sold: Some(true),
                    category: Some(Some(2)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn delete_removes_only_orphaned_media() {
        let mut mocks = Mocks::new();
        mocks
            .ads
            .expect_find_by_id()
            .returning(|id| Ok(Some(ad(id, 1))));
        mocks
            .ads
            .expect_delete()
            .with(eq(5))
            .returning(|_| Ok(vec!["shared".into(), "own".into()]));
        mocks
            .images
            .expect_count_by_storage_key()
            .returning(|key| Ok(if key == "shared" { 1 } else { 0 }));
        mocks
            .media
            .expect_delete()
            .withf(|key| key == "own")
            .times(1)
            .returning(|_| Ok(()));

        mocks.service().delete(1, 5).await.unwrap();
    }

    #[tokio::test]
    async fn delete_by_non_owner_is_unauthorized() {
        let mut mocks = Mocks::new();
        mocks
            .ads
            .expect_find_by_id()
            .returning(|id| Ok(Some(ad(id, 1))));
        mocks.ads.expect_delete().never();

        let err = tokio_test::assert_err!(mocks.service().delete(2, 5).await);
        assert!(matches!(err, DomainError::Unauthorized(_)));
    }
}
