use std::sync::Arc;

use domains::{Category, CategoryId, CategoryRepository, DomainError, DomainResult};
use tracing::info;

use crate::validation;

pub struct CategoryService {
    categories: Arc<dyn CategoryRepository>,
}

impl CategoryService {
    pub fn new(categories: Arc<dyn CategoryRepository>) -> Self {
        Self { categories }
    }

    pub async fn create(&self, name: &str) -> DomainResult<Category> {
        let name = validation::text("name", name, 1, validation::CATEGORY_NAME_MAX)?;
        let category = self.categories.create(name).await?;
        info!(category_id = category.id, name = %category.name, "category created");
        Ok(category)
    }

    pub async fn list(&self) -> DomainResult<Vec<Category>> {
        self.categories.list().await
    }

    pub async fn get(&self, id: CategoryId) -> DomainResult<Category> {
        self.categories
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Category", id))
    }
}
