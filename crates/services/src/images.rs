//! # Image attachments
//!
//! Upload, retrieval, description edits and deletion of ad images.

use std::sync::Arc;

use bytes::Bytes;
use domains::{
    AdId, AdRepository, DomainError, DomainResult, Image, ImageFormat, ImageId, ImageRepository,
    MediaProcessor, NewImage, UserId,
};
use tracing::{info, instrument, warn};

use crate::media::MediaLibrary;
use crate::{blocking, validation};

/// Image bytes ready to be served, in the requested encoding.
#[derive(Debug, Clone)]
pub struct ImageContent {
    pub image: Image,
    pub format: ImageFormat,
    pub data: Bytes,
}

pub struct ImageService {
    ads: Arc<dyn AdRepository>,
    images: Arc<dyn ImageRepository>,
    library: Arc<MediaLibrary>,
    processor: Arc<dyn MediaProcessor>,
}

impl ImageService {
    pub fn new(
        ads: Arc<dyn AdRepository>,
        images: Arc<dyn ImageRepository>,
        library: Arc<MediaLibrary>,
        processor: Arc<dyn MediaProcessor>,
    ) -> Self {
        Self {
            ads,
            images,
            library,
            processor,
        }
    }

    /// Attaches an uploaded image to an ad owned by the requester.
    ///
    /// Checks run in a fixed order: payload present, ad exists, requester owns
    /// the ad, payload decodes as JPEG/PNG. Nothing is stored unless all pass.
    #[instrument(
        skip(self, payload, description),
        fields(bytes = payload.as_ref().map_or(0, Bytes::len))
    )]
    pub async fn create(
        &self,
        requester: UserId,
        ad_id: AdId,
        payload: Option<Bytes>,
        description: Option<String>,
    ) -> DomainResult<Image> {
        let payload = match payload {
            Some(payload) if !payload.is_empty() => payload,
            _ => return Err(DomainError::BadRequest("no image was submitted".into())),
        };
        let ad = self
            .ads
            .find_by_id(ad_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Ad", ad_id))?;
        if ad.owner != requester {
            warn!(ad_id, requester, "image upload by non-owner rejected");
            return Err(DomainError::Forbidden(
                "only the ad owner may add images".into(),
            ));
        }
        let description = validation::optional_text(
            "description",
            description.as_deref(),
            validation::IMAGE_DESCRIPTION_MAX,
        )?;
        let format = {
            let processor = Arc::clone(&self.processor);
            let payload = payload.clone();
            blocking(move || processor.inspect(&payload)).await?
        };

        let image = self
            .library
            .attach(
                payload,
                NewImage {
                    ad: ad_id,
                    description,
                    format,
                    storage_key: String::new(),
                },
            )
            .await?;
        info!(image_id = image.id, ad_id, "image attached");
        Ok(image)
    }

    pub async fn get(&self, id: ImageId) -> DomainResult<Image> {
        self.images
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Image", id))
    }

    /// Loads the bytes of `image` in `format`, converting them when it differs
    /// from the stored encoding.
    pub async fn fetch(&self, image: Image, format: ImageFormat) -> DomainResult<ImageContent> {
        let data = self.library.read(&image.storage_key).await?;
        if format == image.format {
            return Ok(ImageContent {
                image,
                format,
                data,
            });
        }
        let processor = Arc::clone(&self.processor);
        let data = blocking(move || processor.transcode(&data, format)).await?;
        Ok(ImageContent {
            image,
            format,
            data,
        })
    }

    pub async fn list_for_ad(&self, ad_id: AdId) -> DomainResult<Vec<Image>> {
        if self.ads.find_by_id(ad_id).await?.is_none() {
            return Err(DomainError::not_found("Ad", ad_id));
        }
        self.images.list_by_ad(ad_id).await
    }

    #[instrument(skip(self, description))]
    pub async fn update_description(
        &self,
        requester: UserId,
        id: ImageId,
        description: Option<String>,
    ) -> DomainResult<Image> {
        self.owned(requester, id).await?;
        let description = validation::optional_text(
            "description",
            description.as_deref(),
            validation::IMAGE_DESCRIPTION_MAX,
        )?;
        self.images.update_description(id, description).await
    }

    /// Owner-only delete. The current thumbnail of an ad cannot be deleted
    /// until the ad points elsewhere.
    #[instrument(skip(self))]
    pub async fn delete(&self, requester: UserId, id: ImageId) -> DomainResult<()> {
        let (image, ad_thumbnail) = self.owned(requester, id).await?;
        if ad_thumbnail == Some(image.id) {
            return Err(DomainError::Conflict(
                "image is the ad's thumbnail; choose another thumbnail first".into(),
            ));
        }
        self.images.delete(id).await?;
        self.library.release(&image.storage_key).await;
        info!(image_id = id, "image deleted");
        Ok(())
    }

    /// Returns the image and the parent ad's thumbnail if the requester owns
    /// the parent ad.
    async fn owned(
        &self,
        requester: UserId,
        id: ImageId,
    ) -> DomainResult<(Image, Option<ImageId>)> {
        let image = self.get(id).await?;
        let ad = self
            .ads
            .find_by_id(image.ad)
            .await?
            .ok_or_else(|| DomainError::not_found("Ad", image.ad))?;
        if ad.owner != requester {
            warn!(image_id = id, requester, "image mutation by non-owner rejected");
            return Err(DomainError::Forbidden(
                "only the ad owner may modify its images".into(),
            ));
        }
        Ok((image, ad.thumbnail))
    }
}
