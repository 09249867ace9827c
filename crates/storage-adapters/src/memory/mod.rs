//! # In-memory store
//!
//! A `dashmap`-backed implementation of every repository port. It mirrors the
//! relational schema's constraints (unique usernames, category names and
//! favorite pairs) and its cascades (ad → images, ad → favorites), so the
//! services behave the same against it as against Postgres. Used by tests and
//! by local runs without a database.

mod ads;
mod categories;
mod favorites;
mod images;
mod users;

use std::sync::atomic::{AtomicI64, Ordering};

use dashmap::DashMap;
use domains::{
    Ad, AdId, Category, CategoryId, FavoriteAd, FavoriteId, Image, ImageId, User, UserId,
};

#[derive(Default)]
struct Sequence(AtomicI64);

impl Sequence {
    fn next(&self) -> i64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }
}

#[derive(Default)]
pub struct InMemoryStore {
    users: DashMap<UserId, (User, String)>,
    usernames: DashMap<String, UserId>,
    categories: DashMap<CategoryId, Category>,
    category_names: DashMap<String, CategoryId>,
    ads: DashMap<AdId, Ad>,
    images: DashMap<ImageId, Image>,
    favorites: DashMap<FavoriteId, FavoriteAd>,
    favorite_pairs: DashMap<(UserId, AdId), FavoriteId>,
    user_ids: Sequence,
    category_ids: Sequence,
    ad_ids: Sequence,
    image_ids: Sequence,
    favorite_ids: Sequence,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Clones matching values out of a map, ordered by key.
fn sorted<K, V>(map: &DashMap<K, V>, keep: impl Fn(&V) -> bool) -> Vec<V>
where
    K: Eq + std::hash::Hash + Ord + Copy,
    V: Clone,
{
    let mut rows: Vec<(K, V)> = map
        .iter()
        .filter(|entry| keep(entry.value()))
        .map(|entry| (*entry.key(), entry.value().clone()))
        .collect();
    rows.sort_by_key(|(key, _)| *key);
    rows.into_iter().map(|(_, value)| value).collect()
}
