use async_trait::async_trait;
use domains::{
    AdId, DomainError, DomainResult, Image, ImageId, ImageRepository, NewImage,
};

use super::{sorted, InMemoryStore};

#[async_trait]
impl ImageRepository for InMemoryStore {
    async fn create(&self, image: NewImage) -> DomainResult<Image> {
        if !self.ads.contains_key(&image.ad) {
            return Err(DomainError::not_found("Ad", image.ad));
        }
        let created = Image {
            id: self.image_ids.next(),
            ad: image.ad,
            description: image.description,
            format: image.format,
            storage_key: image.storage_key,
        };
        self.images.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: ImageId) -> DomainResult<Option<Image>> {
        Ok(self.images.get(&id).map(|entry| entry.clone()))
    }

    async fn list_by_ad(&self, ad: AdId) -> DomainResult<Vec<Image>> {
        Ok(sorted(&self.images, |image| image.ad == ad))
    }

    async fn update_description(
        &self,
        id: ImageId,
        description: Option<String>,
    ) -> DomainResult<Image> {
        let mut image = self
            .images
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("Image", id))?;
        image.description = description;
        Ok(image.clone())
    }

    async fn delete(&self, id: ImageId) -> DomainResult<()> {
        // Same restriction the thumbnail foreign key enforces in Postgres.
        if self.ads.iter().any(|ad| ad.thumbnail == Some(id)) {
            return Err(DomainError::Conflict(format!(
                "image {id} is still used as a thumbnail"
            )));
        }
        self.images
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| DomainError::not_found("Image", id))
    }

    async fn count_by_storage_key(&self, storage_key: &str) -> DomainResult<i64> {
        let count = self
            .images
            .iter()
            .filter(|image| image.storage_key == storage_key)
            .count();
        Ok(count as i64)
    }
}
