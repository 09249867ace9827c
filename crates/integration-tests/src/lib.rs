//! # Integration test harness
//!
//! Builds the full router on the in-memory store and media backend with the
//! real Argon2 and JWT adapters, and drives it with `tower::ServiceExt::oneshot`.

use std::io::Cursor;
use std::sync::Arc;

use api_adapters::{build_router, AppState, HttpMetrics, RouterOptions};
use auth_adapters::{Argon2Hasher, JwtTokenService};
use axum::body::{to_bytes, Body};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use domains::{CategoryId, CategoryRepository, UserId};
use image::{ImageFormat as Encoding, Rgb, RgbImage};
use serde_json::{json, Value};
use services::{
    AccountService, AdService, CategoryService, FavoriteService, ImageService, MediaLibrary,
};
use storage_adapters::{ImageProcessor, InMemoryMediaStorage, InMemoryStore};
use tower::ServiceExt;

pub mod contracts;

pub const JWT_SECRET: &[u8] = b"integration-tests-secret-with-enough-bytes";
pub const PASSWORD: &str = "hunter22-but-longer";
const BOUNDARY: &str = "sellpoint-test-boundary";

pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryStore>,
    pub media: Arc<InMemoryMediaStorage>,
    pub metrics: Arc<HttpMetrics>,
}

/// A registered user and a fresh access token.
pub struct Session {
    pub id: UserId,
    pub access: String,
    pub refresh: String,
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_options(RouterOptions::default())
    }

    pub fn with_options(options: RouterOptions) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let media = Arc::new(InMemoryMediaStorage::new());
        let metrics = Arc::new(HttpMetrics::new());
        let hasher = Argon2Hasher::with_params(1024, 1, 1).expect("cheap argon2 params are valid");
        let library = Arc::new(MediaLibrary::new(store.clone(), media.clone()));

        let state = AppState {
            accounts: Arc::new(AccountService::new(
                store.clone(),
                Arc::new(hasher),
                Arc::new(JwtTokenService::new(JWT_SECRET, 300, 86_400)),
            )),
            ads: Arc::new(AdService::new(
                store.clone(),
                store.clone(),
                store.clone(),
                library.clone(),
            )),
            images: Arc::new(ImageService::new(
                store.clone(),
                store.clone(),
                library,
                Arc::new(ImageProcessor::new()),
            )),
            favorites: Arc::new(FavoriteService::new(store.clone(), store.clone())),
            categories: Arc::new(CategoryService::new(store.clone())),
            metrics: metrics.clone(),
        };

        Self {
            router: build_router(state, options),
            store,
            media,
            metrics,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    /// Sends a JSON request and decodes the JSON response (`Null` when empty).
    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("valid request");
        json_response(self.send(request).await).await
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.call(Method::GET, uri, None, None).await
    }

    /// Registers `username` and logs in.
    pub async fn signup(&self, username: &str) -> Session {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({
                    "username": username,
                    "email": format!("{username}@example.com"),
                    "password": PASSWORD,
                    "first_name": "Test",
                    "last_name": username,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "register failed: {body}");
        let id = body["user"]["id"].as_i64().expect("user id");

        let (status, tokens) = self
            .call(
                Method::POST,
                "/api/auth/token",
                None,
                Some(json!({ "username": username, "password": PASSWORD })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {tokens}");

        Session {
            id,
            access: tokens["access"].as_str().expect("access token").to_string(),
            refresh: tokens["refresh"].as_str().expect("refresh token").to_string(),
        }
    }

    pub async fn category(&self, name: &str) -> CategoryId {
        CategoryRepository::create(self.store.as_ref(), name.to_string())
            .await
            .expect("category created")
            .id
    }

    /// Creates an ad through the API and returns its JSON.
    pub async fn post_ad(&self, session: &Session, body: Value) -> Value {
        let (status, ad) = self
            .call(Method::POST, "/api/ad/create", Some(&session.access), Some(body))
            .await;
        assert_eq!(status, StatusCode::OK, "ad create failed: {ad}");
        ad
    }

    /// Uploads `data` as the `image` part of a multipart request.
    pub async fn upload(
        &self,
        token: Option<&str>,
        ad_id: i64,
        data: Option<&[u8]>,
        description: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut parts = Vec::new();
        if let Some(data) = data {
            parts.push(Part::file("image", "upload.bin", "application/octet-stream", data));
        }
        if let Some(description) = description {
            parts.push(Part::text("description", description));
        }
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(format!("/api/ad/{ad_id}/image"))
            .header(CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"));
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = builder
            .body(Body::from(multipart_body(&parts)))
            .expect("valid request");
        json_response(self.send(request).await).await
    }
}

pub async fn body_bytes(response: Response) -> bytes::Bytes {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("readable body")
}

pub async fn json_response(response: Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = body_bytes(response).await;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("JSON body")
    };
    (status, value)
}

pub struct Part<'a> {
    name: &'a str,
    filename: Option<&'a str>,
    content_type: Option<&'a str>,
    data: &'a [u8],
}

impl<'a> Part<'a> {
    pub fn file(name: &'a str, filename: &'a str, content_type: &'a str, data: &'a [u8]) -> Self {
        Self {
            name,
            filename: Some(filename),
            content_type: Some(content_type),
            data,
        }
    }

    pub fn text(name: &'a str, value: &'a str) -> Self {
        Self {
            name,
            filename: None,
            content_type: None,
            data: value.as_bytes(),
        }
    }
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        let mut disposition = format!("Content-Disposition: form-data; name=\"{}\"", part.name);
        if let Some(filename) = part.filename {
            disposition.push_str(&format!("; filename=\"{filename}\""));
        }
        body.extend_from_slice(disposition.as_bytes());
        body.extend_from_slice(b"\r\n");
        if let Some(content_type) = part.content_type {
            body.extend_from_slice(format!("Content-Type: {content_type}\r\n").as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn encode(encoding: Encoding, seed: u8) -> Vec<u8> {
    let picture = RgbImage::from_fn(8, 8, |x, y| Rgb([seed, x as u8 * 16, y as u8 * 16]));
    let mut out = Cursor::new(Vec::new());
    picture
        .write_to(&mut out, encoding)
        .expect("in-memory encode");
    out.into_inner()
}

/// A small PNG; different seeds give different bytes.
pub fn png(seed: u8) -> Vec<u8> {
    encode(Encoding::Png, seed)
}

pub fn jpeg(seed: u8) -> Vec<u8> {
    encode(Encoding::Jpeg, seed)
}
