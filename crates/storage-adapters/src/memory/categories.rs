use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use domains::{Category, CategoryId, CategoryRepository, DomainError, DomainResult};

use super::{sorted, InMemoryStore};

#[async_trait]
impl CategoryRepository for InMemoryStore {
    async fn create(&self, name: String) -> DomainResult<Category> {
        let id = match self.category_names.entry(name.clone()) {
            Entry::Occupied(_) => {
                return Err(DomainError::Conflict(format!(
                    "category `{name}` already exists"
                )))
            }
            Entry::Vacant(slot) => *slot.insert(self.category_ids.next()),
        };
        let category = Category { id, name };
        self.categories.insert(id, category.clone());
        Ok(category)
    }

    async fn find_by_id(&self, id: CategoryId) -> DomainResult<Option<Category>> {
        Ok(self.categories.get(&id).map(|entry| entry.clone()))
    }

    async fn list(&self) -> DomainResult<Vec<Category>> {
        Ok(sorted(&self.categories, |_| true))
    }
}
