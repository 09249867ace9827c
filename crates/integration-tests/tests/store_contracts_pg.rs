//! Repository contracts checked against a throwaway Postgres container.
//! Needs a Docker daemon; built only with `--features db-postgres`.

use domains::{AdRepository, CategoryRepository, DomainError, FavoriteRepository, NewAd};
use integration_tests::contracts::{self, ad, user};
use storage_adapters::PgStore;
use testcontainers_modules::postgres::Postgres;
use testcontainers_modules::testcontainers::runners::AsyncRunner;
use testcontainers_modules::testcontainers::ContainerAsync;
use tokio_test::assert_ok;

/// A migrated store. The container lives as long as the returned handle.
async fn pg_store() -> (ContainerAsync<Postgres>, PgStore) {
    let container = Postgres::default().start().await.unwrap();
    let host = container.get_host().await.unwrap();
    let port = container.get_host_port_ipv4(5432).await.unwrap();
    let url = format!("postgres://postgres:postgres@{host}:{port}/postgres");

    let store = PgStore::connect(&url, 5).await.unwrap();
    store.migrate().await.unwrap();
    (container, store)
}

#[tokio::test]
async fn usernames_and_category_names_are_unique() {
    let (_db, store) = pg_store().await;
    contracts::usernames_and_category_names_are_unique(&store).await;
}

#[tokio::test]
async fn deleting_an_ad_cascades_and_returns_storage_keys() {
    let (_db, store) = pg_store().await;
    contracts::deleting_an_ad_cascades_and_returns_storage_keys(&store).await;
}

#[tokio::test]
async fn thumbnail_image_cannot_be_deleted() {
    let (_db, store) = pg_store().await;
    contracts::thumbnail_image_cannot_be_deleted(&store).await;
}

#[tokio::test]
async fn storage_keys_are_reference_counted() {
    let (_db, store) = pg_store().await;
    contracts::storage_keys_are_reference_counted(&store).await;
}

#[tokio::test]
async fn favorites_are_unique_per_pair_and_filter_ads() {
    let (_db, store) = pg_store().await;
    contracts::favorites_are_unique_per_pair_and_filter_ads(&store).await;
}

#[tokio::test]
async fn missing_ads_are_not_found() {
    let (_db, store) = pg_store().await;
    contracts::missing_ads_are_not_found(&store).await;
}

#[tokio::test]
async fn partial_updates_distinguish_absent_from_null() {
    let (_db, store) = pg_store().await;
    contracts::partial_updates_distinguish_absent_from_null(&store).await;
}

#[tokio::test]
async fn deleting_a_category_keeps_its_ads_uncategorised() {
    let (_db, store) = pg_store().await;
    let alice = user(&store, "alice").await;
    let books = CategoryRepository::create(&store, "Books".into()).await.unwrap();
    let novel = AdRepository::create(
        &store,
        NewAd {
            title: "Novel".into(),
            description: String::new(),
            price: 5,
            owner: alice,
            category: Some(books.id),
        },
    )
    .await
    .unwrap();

    assert_ok!(
        sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(books.id)
            .execute(store.pool())
            .await
    );
    let reloaded = AdRepository::find_by_id(&store, novel.id).await.unwrap();
    assert_eq!(reloaded.map(|ad| ad.category), Some(None));
}

#[tokio::test]
async fn deleting_a_user_removes_their_ads_and_favorites() {
    let (_db, store) = pg_store().await;
    let alice = user(&store, "alice").await;
    let bob = user(&store, "bob").await;
    let bike = ad(&store, alice, "Bike").await;
    let lamp = ad(&store, bob, "Lamp").await;
    FavoriteRepository::create(&store, bob, bike.id).await.unwrap();
    FavoriteRepository::create(&store, alice, lamp.id).await.unwrap();

    assert_ok!(
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(alice)
            .execute(store.pool())
            .await
    );
    assert!(AdRepository::find_by_id(&store, bike.id).await.unwrap().is_none());
    assert!(AdRepository::find_by_id(&store, lamp.id).await.unwrap().is_some());
    assert!(FavoriteRepository::list_by_user(&store, bob).await.unwrap().is_empty());
    assert!(FavoriteRepository::list_by_user(&store, alice).await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_category_on_update_is_a_bad_request() {
    let (_db, store) = pg_store().await;
    let alice = user(&store, "alice").await;
    let bike = ad(&store, alice, "Bike").await;

    let changes = domains::AdChanges {
        category: Some(Some(9_999)),
        ..domains::AdChanges::default()
    };
    let err = AdRepository::update(&store, bike.id, changes).await.unwrap_err();
    assert!(matches!(err, DomainError::BadRequest(_)), "got {err:?}");
}
