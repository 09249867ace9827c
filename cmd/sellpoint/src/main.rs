//! # Sellpoint
//!
//! Assembles the adapters selected at compile time and serves the REST API.

use std::sync::Arc;

use anyhow::{Context, Result};
use api_adapters::{build_router, AppState, HttpMetrics, RouterOptions};
use auth_adapters::{Argon2Hasher, JwtTokenService};
use configs::{LogFormat, LogSettings, Settings};
use domains::{
    AdRepository, CategoryRepository, FavoriteRepository, ImageRepository, MediaStorage,
    UserRepository,
};
use secrecy::ExposeSecret;
use services::{
    AccountService, AdService, CategoryService, FavoriteService, ImageService, MediaLibrary,
};
use storage_adapters::ImageProcessor;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[cfg(feature = "db-postgres")]
use storage_adapters::PgStore;
#[cfg(not(feature = "db-postgres"))]
use storage_adapters::InMemoryStore;

#[cfg(feature = "media-local")]
use storage_adapters::LocalMediaStorage;
#[cfg(not(feature = "media-local"))]
use storage_adapters::InMemoryMediaStorage;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load().context("failed to load configuration")?;
    init_tracing(&settings.log)?;

    #[cfg(feature = "db-postgres")]
    let store = {
        let store = PgStore::connect(
            settings.database.url.expose_secret(),
            settings.database.max_connections,
        )
        .await
        .context("failed to connect to postgres")?;
        store.migrate().await.context("failed to run migrations")?;
        Arc::new(store)
    };
    #[cfg(not(feature = "db-postgres"))]
    let store = {
        tracing::warn!("built without db-postgres; data lives in memory only");
        Arc::new(InMemoryStore::new())
    };

    #[cfg(feature = "media-local")]
    let media: Arc<dyn MediaStorage> =
        Arc::new(LocalMediaStorage::new(settings.media.root.clone()));
    #[cfg(not(feature = "media-local"))]
    let media: Arc<dyn MediaStorage> = Arc::new(InMemoryMediaStorage::new());

    let users: Arc<dyn UserRepository> = store.clone();
    let categories: Arc<dyn CategoryRepository> = store.clone();
    let ads: Arc<dyn AdRepository> = store.clone();
    let images: Arc<dyn ImageRepository> = store.clone();
    let favorites: Arc<dyn FavoriteRepository> = store;

    let tokens = Arc::new(JwtTokenService::new(
        settings.auth.jwt_secret.expose_secret().as_bytes(),
        settings.auth.access_ttl_secs,
        settings.auth.refresh_ttl_secs,
    ));

    let library = Arc::new(MediaLibrary::new(images.clone(), media));

    let state = AppState {
        accounts: Arc::new(AccountService::new(users, Arc::new(Argon2Hasher::new()), tokens)),
        ads: Arc::new(AdService::new(
            ads.clone(),
            images.clone(),
            categories.clone(),
            library.clone(),
        )),
        images: Arc::new(ImageService::new(
            ads.clone(),
            images,
            library,
            Arc::new(ImageProcessor::new()),
        )),
        favorites: Arc::new(FavoriteService::new(favorites, ads)),
        categories: Arc::new(CategoryService::new(categories)),
        metrics: Arc::new(HttpMetrics::new()),
    };

    let app = build_router(
        state,
        RouterOptions {
            cors_origins: settings.server.cors_origins.clone(),
            max_upload_bytes: settings.server.max_upload_bytes,
        },
    );

    let addr = settings.server.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, version = env!("CARGO_PKG_VERSION"), "sellpoint listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server terminated unexpectedly")?;

    info!("sellpoint stopped");
    Ok(())
}

/// `RUST_LOG` wins over the configured filter.
fn init_tracing(log: &LogSettings) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&log.filter))
        .context("invalid log filter")?;
    let registry = tracing_subscriber::registry().with(filter);
    match log.format {
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
        LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init(),
    }
    .context("failed to install tracing subscriber")
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(%err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(%err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
