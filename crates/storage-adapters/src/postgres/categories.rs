use async_trait::async_trait;
use domains::{Category, CategoryId, CategoryRepository, DomainError, DomainResult};
use sqlx::postgres::PgRow;
use sqlx::Row;

use super::{db_error, violation, PgStore, Violation};

fn map_category(row: &PgRow) -> Result<Category, sqlx::Error> {
    Ok(Category {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
    })
}

#[async_trait]
impl CategoryRepository for PgStore {
    async fn create(&self, name: String) -> DomainResult<Category> {
        let row = sqlx::query("INSERT INTO categories (name) VALUES ($1) RETURNING id, name")
            .bind(&name)
            .fetch_one(&self.pool)
            .await
            .map_err(|err| match violation(&err) {
                Some(Violation::Unique) => {
                    DomainError::Conflict(format!("category `{name}` already exists"))
                }
                _ => db_error(err),
            })?;
        map_category(&row).map_err(db_error)
    }

    async fn find_by_id(&self, id: CategoryId) -> DomainResult<Option<Category>> {
        let row = sqlx::query("SELECT id, name FROM categories WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        row.as_ref().map(map_category).transpose().map_err(db_error)
    }

    async fn list(&self) -> DomainResult<Vec<Category>> {
        let rows = sqlx::query("SELECT id, name FROM categories ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
        rows.iter()
            .map(map_category)
            .collect::<Result<_, _>>()
            .map_err(db_error)
    }
}
