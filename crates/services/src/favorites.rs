//! # Favorites
//!
//! Many-to-many bookmarks between users and ads, keyed by the (user, ad) pair.

use std::sync::Arc;

use domains::{
    AdId, AdRepository, DomainError, DomainResult, FavoriteAd, FavoriteRepository, UserId,
};
use tracing::{info, instrument};

pub struct FavoriteService {
    favorites: Arc<dyn FavoriteRepository>,
    ads: Arc<dyn AdRepository>,
}

impl FavoriteService {
    pub fn new(favorites: Arc<dyn FavoriteRepository>, ads: Arc<dyn AdRepository>) -> Self {
        Self { favorites, ads }
    }

    /// Links the requester to an ad. A pair can only exist once.
    #[instrument(skip(self))]
    pub async fn create(&self, user: UserId, ad: AdId) -> DomainResult<FavoriteAd> {
        if self.ads.find_by_id(ad).await?.is_none() {
            return Err(DomainError::not_found("Ad", ad));
        }
        if self.favorites.find(user, ad).await?.is_some() {
            return Err(DomainError::Conflict(format!(
                "ad {ad} is already a favorite"
            )));
        }
        let favorite = self.favorites.create(user, ad).await?;
        info!(favorite_id = favorite.id, "favorite created");
        Ok(favorite)
    }

    pub async fn list_all(&self) -> DomainResult<Vec<FavoriteAd>> {
        self.favorites.list_all().await
    }

    pub async fn list_for_user(&self, user: UserId) -> DomainResult<Vec<FavoriteAd>> {
        self.favorites.list_by_user(user).await
    }

    pub async fn get(&self, user: UserId, ad: AdId) -> DomainResult<FavoriteAd> {
        self.favorites
            .find(user, ad)
            .await?
            .ok_or_else(|| DomainError::not_found("FavoriteAd", format!("{user}/{ad}")))
    }

    /// Users may only remove their own favorites.
    #[instrument(skip(self))]
    pub async fn delete(&self, requester: UserId, user: UserId, ad: AdId) -> DomainResult<()> {
        if requester != user {
            return Err(DomainError::Forbidden(
                "cannot remove another user's favorite".into(),
            ));
        }
        if !self.favorites.delete(user, ad).await? {
            return Err(DomainError::not_found("FavoriteAd", format!("{user}/{ad}")));
        }
        info!(user, ad, "favorite deleted");
        Ok(())
    }
}
