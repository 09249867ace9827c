use async_trait::async_trait;
use domains::{AdId, DomainError, DomainResult, FavoriteAd, FavoriteRepository, UserId};
use sqlx::postgres::PgRow;
use sqlx::Row;

use super::{db_error, violation, PgStore, Violation};

fn map_favorite(row: &PgRow) -> Result<FavoriteAd, sqlx::Error> {
    Ok(FavoriteAd {
        id: row.try_get("id")?,
        user: row.try_get("user_id")?,
        favorite_ad: row.try_get("ad_id")?,
    })
}

fn map_favorites(rows: Vec<PgRow>) -> DomainResult<Vec<FavoriteAd>> {
    rows.iter()
        .map(map_favorite)
        .collect::<Result<_, _>>()
        .map_err(db_error)
}

#[async_trait]
impl FavoriteRepository for PgStore {
    async fn create(&self, user: UserId, ad: AdId) -> DomainResult<FavoriteAd> {
        let row = sqlx::query(
            "INSERT INTO favorite_ads (user_id, ad_id) VALUES ($1, $2) \
             RETURNING id, user_id, ad_id",
        )
        .bind(user)
        .bind(ad)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| match violation(&err) {
            Some(Violation::Unique) => {
                DomainError::Conflict(format!("ad {ad} is already a favorite"))
            }
            Some(Violation::ForeignKey) => DomainError::not_found("Ad", ad),
            None => db_error(err),
        })?;
        map_favorite(&row).map_err(db_error)
    }

    async fn find(&self, user: UserId, ad: AdId) -> DomainResult<Option<FavoriteAd>> {
        let row = sqlx::query(
            "SELECT id, user_id, ad_id FROM favorite_ads WHERE user_id = $1 AND ad_id = $2",
        )
        .bind(user)
        .bind(ad)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        row.as_ref().map(map_favorite).transpose().map_err(db_error)
    }

    async fn list_all(&self) -> DomainResult<Vec<FavoriteAd>> {
        let rows = sqlx::query("SELECT id, user_id, ad_id FROM favorite_ads ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
        map_favorites(rows)
    }

    async fn list_by_user(&self, user: UserId) -> DomainResult<Vec<FavoriteAd>> {
        let rows = sqlx::query(
            "SELECT id, user_id, ad_id FROM favorite_ads WHERE user_id = $1 ORDER BY id",
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        map_favorites(rows)
    }

    async fn delete(&self, user: UserId, ad: AdId) -> DomainResult<bool> {
        let result = sqlx::query("DELETE FROM favorite_ads WHERE user_id = $1 AND ad_id = $2")
            .bind(user)
            .bind(ad)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected() > 0)
    }
}
