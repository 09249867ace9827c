use axum::extract::State;
use axum::Json;
use domains::{AdId, FavoriteAd, UserId};
use serde::Deserialize;

use super::Message;
use crate::error::ApiResult;
use crate::extract::{AuthUser, JsonBody, PathParams};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct NewFavorite {
    #[serde(alias = "ad")]
    pub favorite_ad: AdId,
}

/// `POST /api/favorite/create`; the favorite always belongs to the caller.
pub async fn create(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    JsonBody(body): JsonBody<NewFavorite>,
) -> ApiResult<Json<FavoriteAd>> {
    Ok(Json(state.favorites.create(user.id, body.favorite_ad).await?))
}

pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<FavoriteAd>>> {
    Ok(Json(state.favorites.list_all().await?))
}

pub async fn list_for_user(
    State(state): State<AppState>,
    PathParams(user): PathParams<UserId>,
) -> ApiResult<Json<Vec<FavoriteAd>>> {
    Ok(Json(state.favorites.list_for_user(user).await?))
}

pub async fn get(
    State(state): State<AppState>,
    PathParams((user, ad)): PathParams<(UserId, AdId)>,
) -> ApiResult<Json<FavoriteAd>> {
    Ok(Json(state.favorites.get(user, ad).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
    PathParams((user, ad)): PathParams<(UserId, AdId)>,
) -> ApiResult<Json<Message>> {
    state.favorites.delete(requester.id, user, ad).await?;
    Ok(Json(Message::new("Item successfully deleted!")))
}
