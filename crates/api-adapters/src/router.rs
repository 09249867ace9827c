//! Route table and the middleware stack.

use axum::body::Body;
use axum::extract::DefaultBodyLimit;
use axum::http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method, Request};
use axum::middleware;
use axum::routing::{get, post, put};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{info_span, warn};

use crate::handlers::{ads, auth, categories, favorites, health, images};
use crate::metrics;
use crate::state::AppState;

#[derive(Debug, Clone)]
pub struct RouterOptions {
    /// Allowed CORS origins; empty allows any origin.
    pub cors_origins: Vec<String>,
    /// Request body cap, sized for image uploads.
    pub max_upload_bytes: usize,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            cors_origins: Vec::new(),
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

pub fn build_router(state: AppState, options: RouterOptions) -> Router {
    let api = Router::new()
        // auth
        .route("/api/auth/token", post(auth::token))
        .route("/api/auth/refresh", post(auth::refresh))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/self", get(auth::me).put(auth::update_me))
        .route("/api/auth/self/address", put(auth::update_address))
        .route("/api/auth/self/password", put(auth::change_password))
        .route("/api/auth/user/{id}", get(auth::user))
        // ads
        .route("/api/ad/create", post(ads::create))
        .route("/api/ad/list", get(ads::list))
        .route("/api/ad/list/unsold", get(ads::list_unsold))
        .route("/api/ad/list/self", get(ads::list_own))
        .route("/api/ad/list/favorite", get(ads::list_favorited))
        .route("/api/ad/list/category/{id}", get(ads::list_by_category))
        .route(
            "/api/ad/{id}",
            get(ads::get).put(ads::update).delete(ads::delete),
        )
        .route("/api/ad/{id}/image", post(images::upload))
        .route("/api/ad/{id}/images", get(images::list_for_ad))
        // images
        .route(
            "/api/image/{id}",
            get(images::download)
                .put(images::update)
                .delete(images::delete),
        )
        // categories
        .route("/api/category/list", get(categories::list))
        .route("/api/category/{id}", get(categories::get))
        // favorites
        .route("/api/favorite/create", post(favorites::create))
        .route("/api/favorite/list", get(favorites::list))
        .route("/api/favorite/user/{user_id}", get(favorites::list_for_user))
        .route(
            "/api/favorite/{user_id}/{ad_id}",
            get(favorites::get).delete(favorites::delete),
        )
        // ops
        .route("/health", get(health::health))
        .route("/metrics", get(metrics::export));

    let http = ServiceBuilder::new()
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
            let request_id = req
                .headers()
                .get("x-request-id")
                .and_then(|value| value.to_str().ok())
                .unwrap_or("-");
            info_span!(
                "http",
                method = %req.method(),
                uri = %req.uri(),
                request_id = %request_id,
            )
        }))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(cors(&options.cors_origins))
        .layer(CompressionLayer::new());

    api.layer(middleware::from_fn_with_state(
        state.metrics.clone(),
        metrics::track,
    ))
    .layer(DefaultBodyLimit::max(options.max_upload_bytes))
    .layer(http)
    .with_state(state)
}

fn cors(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);
    if origins.is_empty() {
        return layer.allow_origin(Any);
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "ignoring malformed CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}
