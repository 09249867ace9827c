use async_trait::async_trait;
use chrono::Utc;
use domains::{
    Ad, AdChanges, AdFilter, AdId, AdRepository, DomainError, DomainResult, NewAd,
};

use super::{sorted, InMemoryStore};

#[async_trait]
impl AdRepository for InMemoryStore {
    async fn create(&self, ad: NewAd) -> DomainResult<Ad> {
        let now = Utc::now();
        let created = Ad {
            id: self.ad_ids.next(),
            title: ad.title,
            description: ad.description,
            price: ad.price,
            created_at: now,
            last_modified: now,
            is_sold: false,
            owner: ad.owner,
            category: ad.category,
            thumbnail: None,
        };
        self.ads.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: AdId) -> DomainResult<Option<Ad>> {
        Ok(self.ads.get(&id).map(|entry| entry.clone()))
    }

    async fn list(&self, filter: AdFilter) -> DomainResult<Vec<Ad>> {
        let ads = match filter {
            AdFilter::All => sorted(&self.ads, |_| true),
            AdFilter::Unsold => sorted(&self.ads, |ad| !ad.is_sold),
            AdFilter::Owner(owner) => sorted(&self.ads, |ad| ad.owner == owner),
            AdFilter::Category(category) => {
                sorted(&self.ads, |ad| ad.category == Some(category))
            }
            AdFilter::FavoritedBy(user) => {
                let favorited: Vec<AdId> = self
                    .favorite_pairs
                    .iter()
                    .filter(|entry| entry.key().0 == user)
                    .map(|entry| entry.key().1)
                    .collect();
                sorted(&self.ads, |ad| favorited.contains(&ad.id))
            }
        };
        Ok(ads)
    }

    async fn update(&self, id: AdId, changes: AdChanges) -> DomainResult<Ad> {
        let price = changes
            .price
            .map(i32::try_from)
            .transpose()
            .map_err(|_| DomainError::validation("price", "out of range"))?;
        let mut ad = self
            .ads
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("Ad", id))?;
        if let Some(title) = changes.title {
            ad.title = title;
        }
        if let Some(description) = changes.description {
            ad.description = description;
        }
        if let Some(price) = price {
            ad.price = price;
        }
        if let Some(is_sold) = changes.is_sold {
            ad.is_sold = is_sold;
        }
        if let Some(category) = changes.category {
            ad.category = category;
        }
        if let Some(thumbnail) = changes.thumbnail {
            ad.thumbnail = thumbnail;
        }
        ad.last_modified = Utc::now();
        Ok(ad.clone())
    }

    async fn delete(&self, id: AdId) -> DomainResult<Vec<String>> {
        if self.ads.remove(&id).is_none() {
            return Err(DomainError::not_found("Ad", id));
        }

        let image_ids: Vec<_> = self
            .images
            .iter()
            .filter(|entry| entry.ad == id)
            .map(|entry| *entry.key())
            .collect();
        let storage_keys = image_ids
            .into_iter()
            .filter_map(|image_id| self.images.remove(&image_id))
            .map(|(_, image)| image.storage_key)
            .collect();

        let pairs: Vec<_> = self
            .favorite_pairs
            .iter()
            .filter(|entry| entry.key().1 == id)
            .map(|entry| (*entry.key(), *entry.value()))
            .collect();
        for (pair, favorite_id) in pairs {
            self.favorite_pairs.remove(&pair);
            self.favorites.remove(&favorite_id);
        }

        Ok(storage_keys)
    }
}
