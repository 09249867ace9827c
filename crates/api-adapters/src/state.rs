use std::sync::Arc;

use services::{AccountService, AdService, CategoryService, FavoriteService, ImageService};

use crate::metrics::HttpMetrics;

/// Shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<AccountService>,
    pub ads: Arc<AdService>,
    pub images: Arc<ImageService>,
    pub favorites: Arc<FavoriteService>,
    pub categories: Arc<CategoryService>,
    pub metrics: Arc<HttpMetrics>,
}
