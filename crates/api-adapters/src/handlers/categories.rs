use axum::extract::State;
use axum::Json;
use domains::{Category, CategoryId};

use crate::error::ApiResult;
use crate::extract::PathParams;
use crate::state::AppState;

pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<Category>>> {
    Ok(Json(state.categories.list().await?))
}

pub async fn get(
    State(state): State<AppState>,
    PathParams(id): PathParams<CategoryId>,
) -> ApiResult<Json<Category>> {
    Ok(Json(state.categories.get(id).await?))
}
