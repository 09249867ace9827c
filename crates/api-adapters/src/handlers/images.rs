//! Image upload, download and metadata endpoints.

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::http::header::{CONTENT_TYPE, VARY};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use domains::{AdId, Image, ImageId};
use serde::Deserialize;
use tracing::debug;

use super::Message;
use crate::error::{ApiError, ApiResult};
use crate::extract::{AuthUser, JsonBody, PathParams};
use crate::negotiate;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DescriptionUpdate {
    #[serde(default)]
    pub description: Option<String>,
}

/// `POST /api/ad/{id}/image`, multipart with an `image` file part and an
/// optional `description` text part. Unknown parts are ignored.
pub async fn upload(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    PathParams(ad_id): PathParams<AdId>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<Image>> {
    let mut multipart =
        multipart.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    let mut payload: Option<Bytes> = None;
    let mut description: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::bad_request(err.body_text()))?
    {
        match field.name() {
            Some("image") => {
                let data = field
                    .bytes()
                    .await
                    .map_err(|err| ApiError::bad_request(err.body_text()))?;
                payload = Some(data);
            }
            Some("description") => {
                let text = field
                    .text()
                    .await
                    .map_err(|err| ApiError::bad_request(err.body_text()))?;
                description = Some(text);
            }
            other => debug!(part = ?other, "ignoring unknown multipart part"),
        }
    }

    let image = state
        .images
        .create(user.id, ad_id, payload, description)
        .await?;
    Ok(Json(image))
}

/// `GET /api/ad/{id}/images`
pub async fn list_for_ad(
    State(state): State<AppState>,
    PathParams(ad_id): PathParams<AdId>,
) -> ApiResult<Json<Vec<Image>>> {
    Ok(Json(state.images.list_for_ad(ad_id).await?))
}

/// `GET /api/image/{id}` serves the bytes, as JPEG or PNG per `Accept`.
pub async fn download(
    State(state): State<AppState>,
    PathParams(id): PathParams<ImageId>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let image = state.images.get(id).await?;
    let format = negotiate::image_format(&headers, image.format)?;
    let content = state.images.fetch(image, format).await?;
    Ok((
        [
            (CONTENT_TYPE, content.format.mime().to_string()),
            (VARY, "accept".to_string()),
        ],
        content.data,
    )
        .into_response())
}

/// `PUT /api/image/{id}`
pub async fn update(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    PathParams(id): PathParams<ImageId>,
    JsonBody(body): JsonBody<DescriptionUpdate>,
) -> ApiResult<Json<Image>> {
    let image = state
        .images
        .update_description(user.id, id, body.description)
        .await?;
    Ok(Json(image))
}

/// `DELETE /api/image/{id}`
pub async fn delete(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    PathParams(id): PathParams<ImageId>,
) -> ApiResult<Json<Message>> {
    state.images.delete(user.id, id).await?;
    Ok(Json(Message::new("Image deleted")))
}
