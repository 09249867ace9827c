use async_trait::async_trait;
use domains::{
    Ad, AdChanges, AdFilter, AdId, AdRepository, DomainError, DomainResult, NewAd,
};
use sqlx::postgres::PgRow;
use sqlx::Row;

use super::{db_error, PgStore};

const AD_COLUMNS: &str = "ads.id, ads.title, ads.description, ads.price, ads.created_at, \
     ads.last_modified, ads.is_sold, ads.owner_id, ads.category_id, ads.thumbnail_id";

fn map_ad(row: &PgRow) -> Result<Ad, sqlx::Error> {
    Ok(Ad {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        price: row.try_get("price")?,
        created_at: row.try_get("created_at")?,
        last_modified: row.try_get("last_modified")?,
        is_sold: row.try_get("is_sold")?,
        owner: row.try_get("owner_id")?,
        category: row.try_get("category_id")?,
        thumbnail: row.try_get("thumbnail_id")?,
    })
}

fn map_ads(rows: Vec<PgRow>) -> DomainResult<Vec<Ad>> {
    rows.iter()
        .map(map_ad)
        .collect::<Result<_, _>>()
        .map_err(db_error)
}

#[async_trait]
impl AdRepository for PgStore {
    async fn create(&self, ad: NewAd) -> DomainResult<Ad> {
        let sql = format!(
            "INSERT INTO ads (title, description, price, owner_id, category_id) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {AD_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(ad.title)
            .bind(ad.description)
            .bind(ad.price)
            .bind(ad.owner)
            .bind(ad.category)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)?;
        map_ad(&row).map_err(db_error)
    }

    async fn find_by_id(&self, id: AdId) -> DomainResult<Option<Ad>> {
        let sql = format!("SELECT {AD_COLUMNS} FROM ads WHERE ads.id = $1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        row.as_ref().map(map_ad).transpose().map_err(db_error)
    }

    async fn list(&self, filter: AdFilter) -> DomainResult<Vec<Ad>> {
        let (clause, key) = match filter {
            AdFilter::All => ("", None),
            AdFilter::Unsold => ("WHERE NOT ads.is_sold", None),
            AdFilter::Owner(owner) => ("WHERE ads.owner_id = $1", Some(owner)),
            AdFilter::Category(category) => ("WHERE ads.category_id = $1", Some(category)),
            AdFilter::FavoritedBy(user) => (
                "JOIN favorite_ads f ON f.ad_id = ads.id WHERE f.user_id = $1",
                Some(user),
            ),
        };
        let sql = format!("SELECT {AD_COLUMNS} FROM ads {clause} ORDER BY ads.id");
        let mut query = sqlx::query(&sql);
        if let Some(key) = key {
            query = query.bind(key);
        }
        let rows = query.fetch_all(&self.pool).await.map_err(db_error)?;
        map_ads(rows)
    }

    async fn update(&self, id: AdId, changes: AdChanges) -> DomainResult<Ad> {
        let price = changes
            .price
            .map(i32::try_from)
            .transpose()
            .map_err(|_| DomainError::validation("price", "out of range"))?;
        let sql = format!(
            "UPDATE ads SET \
               title = COALESCE($2, title), \
               description = COALESCE($3, description), \
               price = COALESCE($4, price), \
               is_sold = COALESCE($5, is_sold), \
               category_id = CASE WHEN $6 THEN $7 ELSE category_id END, \
               thumbnail_id = CASE WHEN $8 THEN $9 ELSE thumbnail_id END, \
               last_modified = now() \
             WHERE ads.id = $1 RETURNING {AD_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(changes.title)
            .bind(changes.description)
            .bind(price)
            .bind(changes.is_sold)
            .bind(changes.category.is_some())
            .bind(changes.category.flatten())
            .bind(changes.thumbnail.is_some())
            .bind(changes.thumbnail.flatten())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .ok_or_else(|| DomainError::not_found("Ad", id))?;
        map_ad(&row).map_err(db_error)
    }

    /// Collects the image keys, then deletes the ad in the same transaction.
    /// Images and favorites follow through `ON DELETE CASCADE`.
    async fn delete(&self, id: AdId) -> DomainResult<Vec<String>> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let storage_keys: Vec<String> =
            sqlx::query_scalar("SELECT storage_key FROM images WHERE ad_id = $1 ORDER BY id")
                .bind(id)
                .fetch_all(&mut *tx)
                .await
                .map_err(db_error)?;

        let result = sqlx::query("DELETE FROM ads WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("Ad", id));
        }

        tx.commit().await.map_err(db_error)?;
        Ok(storage_keys)
    }
}
