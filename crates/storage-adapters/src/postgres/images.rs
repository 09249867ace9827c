use async_trait::async_trait;
use domains::{
    AdId, DomainError, DomainResult, Image, ImageFormat, ImageId, ImageRepository, NewImage,
};
use sqlx::postgres::PgRow;
use sqlx::Row;

use super::{db_error, violation, PgStore, Violation};

const IMAGE_COLUMNS: &str = "id, ad_id, description, format, storage_key";

fn map_image(row: &PgRow) -> DomainResult<Image> {
    let format: String = row.try_get("format").map_err(db_error)?;
    Ok(Image {
        id: row.try_get("id").map_err(db_error)?,
        ad: row.try_get("ad_id").map_err(db_error)?,
        description: row.try_get("description").map_err(db_error)?,
        format: ImageFormat::parse(&format)
            .ok_or_else(|| DomainError::internal(format!("unknown image format `{format}`")))?,
        storage_key: row.try_get("storage_key").map_err(db_error)?,
    })
}

#[async_trait]
impl ImageRepository for PgStore {
    async fn create(&self, image: NewImage) -> DomainResult<Image> {
        let sql = format!(
            "INSERT INTO images (ad_id, description, format, storage_key) \
             VALUES ($1, $2, $3, $4) RETURNING {IMAGE_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(image.ad)
            .bind(image.description)
            .bind(image.format.as_str())
            .bind(image.storage_key)
            .fetch_one(&self.pool)
            .await
            .map_err(|err| match violation(&err) {
                Some(Violation::ForeignKey) => DomainError::not_found("Ad", image.ad),
                _ => db_error(err),
            })?;
        map_image(&row)
    }

    async fn find_by_id(&self, id: ImageId) -> DomainResult<Option<Image>> {
        let sql = format!("SELECT {IMAGE_COLUMNS} FROM images WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        row.as_ref().map(map_image).transpose()
    }

    async fn list_by_ad(&self, ad: AdId) -> DomainResult<Vec<Image>> {
        let sql = format!("SELECT {IMAGE_COLUMNS} FROM images WHERE ad_id = $1 ORDER BY id");
        let rows = sqlx::query(&sql)
            .bind(ad)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
        rows.iter().map(map_image).collect()
    }

    async fn update_description(
        &self,
        id: ImageId,
        description: Option<String>,
    ) -> DomainResult<Image> {
        let sql = format!(
            "UPDATE images SET description = $2 WHERE id = $1 RETURNING {IMAGE_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(description)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .ok_or_else(|| DomainError::not_found("Image", id))?;
        map_image(&row)
    }

    async fn delete(&self, id: ImageId) -> DomainResult<()> {
        let result = sqlx::query("DELETE FROM images WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|err| match violation(&err) {
                Some(Violation::ForeignKey) => {
                    DomainError::Conflict(format!("image {id} is still used as a thumbnail"))
                }
                _ => db_error(err),
            })?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("Image", id));
        }
        Ok(())
    }

    async fn count_by_storage_key(&self, storage_key: &str) -> DomainResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM images WHERE storage_key = $1")
            .bind(storage_key)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)
    }
}
