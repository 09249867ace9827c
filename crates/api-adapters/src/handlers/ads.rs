use axum::extract::State;
use axum::Json;
use domains::{Ad, AdChanges, AdFilter, AdId, CategoryId};
use services::AdDraft;

use super::Message;
use crate::error::ApiResult;
use crate::extract::{AuthUser, JsonBody, PathParams};
use crate::state::AppState;

/// `POST /api/ad/create`
pub async fn create(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    JsonBody(draft): JsonBody<AdDraft>,
) -> ApiResult<Json<Ad>> {
    Ok(Json(state.ads.create(user.id, draft).await?))
}

pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<Ad>>> {
    Ok(Json(state.ads.list(AdFilter::All).await?))
}

pub async fn list_unsold(State(state): State<AppState>) -> ApiResult<Json<Vec<Ad>>> {
    Ok(Json(state.ads.list(AdFilter::Unsold).await?))
}

pub async fn list_own(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<Vec<Ad>>> {
    Ok(Json(state.ads.list(AdFilter::Owner(user.id)).await?))
}

pub async fn list_favorited(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<Vec<Ad>>> {
    Ok(Json(state.ads.list(AdFilter::FavoritedBy(user.id)).await?))
}

pub async fn list_by_category(
    State(state): State<AppState>,
    PathParams(category): PathParams<CategoryId>,
) -> ApiResult<Json<Vec<Ad>>> {
    Ok(Json(state.ads.list(AdFilter::Category(category)).await?))
}

pub async fn get(
    State(state): State<AppState>,
    PathParams(id): PathParams<AdId>,
) -> ApiResult<Json<Ad>> {
    Ok(Json(state.ads.get(id).await?))
}

pub async fn update(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    PathParams(id): PathParams<AdId>,
    JsonBody(changes): JsonBody<AdChanges>,
) -> ApiResult<Json<Ad>> {
    Ok(Json(state.ads.update(user.id, id, changes).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    PathParams(id): PathParams<AdId>,
) -> ApiResult<Json<Message>> {
    state.ads.delete(user.id, id).await?;
    Ok(Json(Message::new("Ad deleted")))
}
