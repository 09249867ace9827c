//! Repository behaviour the services rely on, written once and run against
//! every store backend.

use domains::{
    Ad, AdChanges, AdFilter, AdRepository, Address, CategoryRepository, DomainError,
    FavoriteRepository, ImageFormat, ImageId, ImageRepository, NewAd, NewImage, NewUser, UserId,
    UserRepository,
};

/// Everything a complete store backend implements.
pub trait Store:
    UserRepository + CategoryRepository + AdRepository + ImageRepository + FavoriteRepository
{
}

impl<S> Store for S where
    S: UserRepository + CategoryRepository + AdRepository + ImageRepository + FavoriteRepository
{
}

fn new_user(username: &str) -> NewUser {
    NewUser {
        username: username.into(),
        email: format!("{username}@example.com"),
        first_name: String::new(),
        last_name: String::new(),
        phone_number: None,
        password_hash: "$argon2id$placeholder".into(),
        address: Address::default(),
    }
}

pub async fn user<S: Store>(store: &S, username: &str) -> UserId {
    UserRepository::create(store, new_user(username))
        .await
        .unwrap()
        .id
}

pub async fn ad<S: Store>(store: &S, owner: UserId, title: &str) -> Ad {
    AdRepository::create(
        store,
        NewAd {
            title: title.into(),
            description: String::new(),
            price: 10,
            owner,
            category: None,
        },
    )
    .await
    .unwrap()
}

pub async fn image<S: Store>(store: &S, ad: &Ad, key: &str) -> ImageId {
    ImageRepository::create(
        store,
        NewImage {
            ad: ad.id,
            description: None,
            format: ImageFormat::Png,
            storage_key: key.into(),
        },
    )
    .await
    .unwrap()
    .id
}

pub async fn usernames_and_category_names_are_unique<S: Store>(store: &S) {
    user(store, "alice").await;
    let mut duplicate = new_user("alice");
    duplicate.email = "other@example.com".into();
    let err = UserRepository::create(store, duplicate).await.unwrap_err();
    assert!(matches!(err, DomainError::Conflict(_)), "got {err:?}");

    CategoryRepository::create(store, "Books".into()).await.unwrap();
    let err = CategoryRepository::create(store, "Books".into())
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Conflict(_)), "got {err:?}");
}

pub async fn deleting_an_ad_cascades_and_returns_storage_keys<S: Store>(store: &S) {
    let alice = user(store, "alice").await;
    let bob = user(store, "bob").await;
    let bike = ad(store, alice, "Bike").await;
    let lamp = ad(store, alice, "Lamp").await;
    image(store, &bike, "aa/one.png").await;
    image(store, &bike, "bb/two.png").await;
    image(store, &lamp, "cc/three.png").await;
    FavoriteRepository::create(store, bob, bike.id).await.unwrap();

    let mut keys = AdRepository::delete(store, bike.id).await.unwrap();
    keys.sort();
    assert_eq!(keys, vec!["aa/one.png", "bb/two.png"]);

    let remaining = ImageRepository::list_by_ad(store, bike.id).await.unwrap();
    assert!(remaining.is_empty());
    let untouched = ImageRepository::list_by_ad(store, lamp.id).await.unwrap();
    assert_eq!(untouched.len(), 1);
    let favorites = FavoriteRepository::list_by_user(store, bob).await.unwrap();
    assert!(favorites.is_empty());

    let err = AdRepository::delete(store, bike.id).await.unwrap_err();
    assert!(matches!(err, DomainError::NotFound { .. }), "got {err:?}");
}

pub async fn thumbnail_image_cannot_be_deleted<S: Store>(store: &S) {
    let alice = user(store, "alice").await;
    let bike = ad(store, alice, "Bike").await;
    let thumb = image(store, &bike, "aa/thumb.png").await;

    let changes = AdChanges {
        thumbnail: Some(Some(thumb)),
        ..AdChanges::default()
    };
    AdRepository::update(store, bike.id, changes).await.unwrap();
    let err = ImageRepository::delete(store, thumb).await.unwrap_err();
    assert!(matches!(err, DomainError::Conflict(_)), "got {err:?}");

    let changes = AdChanges {
        thumbnail: Some(None),
        ..AdChanges::default()
    };
    AdRepository::update(store, bike.id, changes).await.unwrap();
    ImageRepository::delete(store, thumb).await.unwrap();
}

pub async fn storage_keys_are_reference_counted<S: Store>(store: &S) {
    let alice = user(store, "alice").await;
    let bike = ad(store, alice, "Bike").await;
    let first = image(store, &bike, "aa/shared.png").await;
    image(store, &bike, "aa/shared.png").await;

    let count = |key: &'static str| ImageRepository::count_by_storage_key(store, key);
    assert_eq!(count("aa/shared.png").await.unwrap(), 2);
    ImageRepository::delete(store, first).await.unwrap();
    assert_eq!(count("aa/shared.png").await.unwrap(), 1);
    assert_eq!(count("zz/none.png").await.unwrap(), 0);
}

pub async fn favorites_are_unique_per_pair_and_filter_ads<S: Store>(store: &S) {
    let alice = user(store, "alice").await;
    let bob = user(store, "bob").await;
    let bike = ad(store, alice, "Bike").await;
    ad(store, alice, "Lamp").await;

    FavoriteRepository::create(store, bob, bike.id).await.unwrap();
    let err = FavoriteRepository::create(store, bob, bike.id)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Conflict(_)), "got {err:?}");
    FavoriteRepository::create(store, alice, bike.id).await.unwrap();

    let favorited = AdRepository::list(store, AdFilter::FavoritedBy(bob)).await.unwrap();
    assert_eq!(favorited, vec![bike.clone()]);

    assert!(FavoriteRepository::delete(store, bob, bike.id).await.unwrap());
    assert!(!FavoriteRepository::delete(store, bob, bike.id).await.unwrap());
    assert!(FavoriteRepository::find(store, bob, bike.id).await.unwrap().is_none());
    let favorited = AdRepository::list(store, AdFilter::FavoritedBy(bob)).await.unwrap();
    assert!(favorited.is_empty());
}

/// Missing parents surface as `NotFound`, never as a duplicate.
pub async fn missing_ads_are_not_found<S: Store>(store: &S) {
    let alice = user(store, "alice").await;

    let err = FavoriteRepository::create(store, alice, 9_999)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotFound { .. }), "got {err:?}");

    let err = ImageRepository::create(
        store,
        NewImage {
            ad: 9_999,
            description: None,
            format: ImageFormat::Jpeg,
            storage_key: "aa/orphan.jpg".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, DomainError::NotFound { .. }), "got {err:?}");
}

/// Absent fields stay untouched; `Some(None)` clears a nullable reference.
pub async fn partial_updates_distinguish_absent_from_null<S: Store>(store: &S) {
    let alice = user(store, "alice").await;
    let books = CategoryRepository::create(store, "Books".into()).await.unwrap();
    let bike = ad(store, alice, "Bike").await;
    let thumb = image(store, &bike, "aa/thumb.png").await;

    let changes = AdChanges {
        category: Some(Some(books.id)),
        thumbnail: Some(Some(thumb)),
        ..AdChanges::default()
    };
    AdRepository::update(store, bike.id, changes).await.unwrap();

    let changes = AdChanges {
        price: Some(42),
        ..AdChanges::default()
    };
    let updated = AdRepository::update(store, bike.id, changes).await.unwrap();
    assert_eq!(updated.price, 42);
    assert_eq!(updated.title, "Bike");
    assert_eq!(updated.category, Some(books.id));
    assert_eq!(updated.thumbnail, Some(thumb));

    let changes = AdChanges {
        category: Some(None),
        ..AdChanges::default()
    };
    let cleared = AdRepository::update(store, bike.id, changes).await.unwrap();
    assert_eq!(cleared.category, None);
    assert_eq!(cleared.thumbnail, Some(thumb));
}
