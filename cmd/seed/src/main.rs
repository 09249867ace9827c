//! # Seed
//!
//! Applies migrations and loads the category catalogue. Pass `--demo` to also
//! create a `demo` account (password `demo-password`). Safe to re-run.

use std::sync::Arc;

use anyhow::{Context, Result};
use auth_adapters::{Argon2Hasher, JwtTokenService};
use configs::Settings;
use domains::{Address, DomainError};
use secrecy::ExposeSecret;
use services::{AccountService, CategoryService, Registration};
use storage_adapters::PgStore;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const CATEGORIES: &[&str] = &[
    "Electronics",
    "Furniture",
    "Vehicles",
    "Clothing",
    "Sports & Outdoors",
    "Books",
    "Home & Garden",
    "Other",
];

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let settings = Settings::load().context("failed to load configuration")?;
    let store = Arc::new(
        PgStore::connect(settings.database.url.expose_secret(), 2)
            .await
            .context("failed to connect to postgres")?,
    );
    store.migrate().await.context("failed to run migrations")?;

    let categories = CategoryService::new(store.clone());
    for name in CATEGORIES {
        match categories.create(name).await {
            Ok(category) => info!(id = category.id, name, "category created"),
            Err(DomainError::Conflict(_)) => info!(name, "category already present"),
            Err(err) => return Err(err).context(format!("failed to create category {name}")),
        }
    }

    if std::env::args().any(|arg| arg == "--demo") {
        let accounts = AccountService::new(
            store,
            Arc::new(Argon2Hasher::new()),
            Arc::new(JwtTokenService::new(
                settings.auth.jwt_secret.expose_secret().as_bytes(),
                settings.auth.access_ttl_secs,
                settings.auth.refresh_ttl_secs,
            )),
        );
        let demo = Registration {
            username: "demo".into(),
            email: "demo@sellpoint.local".into(),
            password: "demo-password".into(),
            first_name: "Demo".into(),
            last_name: "User".into(),
            phone_number: None,
            address: Some(Address {
                street_address: "Storgata 1".into(),
                postal_code: "0155".into(),
                city: "Oslo".into(),
            }),
        };
        match accounts.register(demo).await {
            Ok(user) => info!(id = user.id, "demo user created"),
            Err(DomainError::Conflict(_)) => warn!("demo user already exists"),
            Err(err) => return Err(err).context("failed to create demo user"),
        }
    }

    info!("seeding finished");
    Ok(())
}
