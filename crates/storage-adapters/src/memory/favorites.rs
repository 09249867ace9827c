use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use domains::{AdId, DomainError, DomainResult, FavoriteAd, FavoriteRepository, UserId};

use super::{sorted, InMemoryStore};

#[async_trait]
impl FavoriteRepository for InMemoryStore {
    async fn create(&self, user: UserId, ad: AdId) -> DomainResult<FavoriteAd> {
        if !self.ads.contains_key(&ad) {
            return Err(DomainError::not_found("Ad", ad));
        }
        let id = match self.favorite_pairs.entry((user, ad)) {
            Entry::Occupied(_) => {
                return Err(DomainError::Conflict(format!(
                    "ad {ad} is already a favorite"
                )))
            }
            Entry::Vacant(slot) => *slot.insert(self.favorite_ids.next()),
        };
        let favorite = FavoriteAd {
            id,
            user,
            favorite_ad: ad,
        };
        self.favorites.insert(id, favorite.clone());
        Ok(favorite)
    }

    async fn find(&self, user: UserId, ad: AdId) -> DomainResult<Option<FavoriteAd>> {
        let Some(id) = self.favorite_pairs.get(&(user, ad)).map(|entry| *entry) else {
            return Ok(None);
        };
        Ok(self.favorites.get(&id).map(|entry| entry.clone()))
    }

    async fn list_all(&self) -> DomainResult<Vec<FavoriteAd>> {
        Ok(sorted(&self.favorites, |_| true))
    }

    async fn list_by_user(&self, user: UserId) -> DomainResult<Vec<FavoriteAd>> {
        Ok(sorted(&self.favorites, |favorite| favorite.user == user))
    }

    async fn delete(&self, user: UserId, ad: AdId) -> DomainResult<bool> {
        match self.favorite_pairs.remove(&(user, ad)) {
            Some((_, id)) => {
                self.favorites.remove(&id);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
