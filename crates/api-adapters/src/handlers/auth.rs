//! Token, registration and self-service profile endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use domains::{AddressChanges, TokenPair, User, UserId};
use serde::{Deserialize, Serialize};
use services::{PasswordChange, ProfileUpdate, Registration};

use crate::error::ApiResult;
use crate::extract::{AuthUser, JsonBody, PathParams};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

#[derive(Debug, Serialize)]
pub struct AccessToken {
    pub access: String,
}

#[derive(Debug, Serialize)]
pub struct Registered {
    pub user: User,
    pub message: &'static str,
}

/// What other users get to see. The address stays private.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
    pub date_joined: DateTime<Utc>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            phone_number: user.phone_number,
            date_joined: user.date_joined,
        }
    }
}

/// `POST /api/auth/token`
pub async fn token(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<TokenRequest>,
) -> ApiResult<Json<TokenPair>> {
    Ok(Json(state.accounts.login(&body.username, &body.password).await?))
}

/// `POST /api/auth/refresh`
pub async fn refresh(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<RefreshRequest>,
) -> ApiResult<Json<AccessToken>> {
    let access = state.accounts.refresh(&body.refresh)?;
    Ok(Json(AccessToken { access }))
}

/// `POST /api/auth/register`
pub async fn register(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<Registration>,
) -> ApiResult<Json<Registered>> {
    let user = state.accounts.register(body).await?;
    Ok(Json(Registered {
        user,
        message: "User created successfully!",
    }))
}

/// `GET /api/auth/self`
pub async fn me(AuthUser(user): AuthUser) -> Json<User> {
    Json(user)
}

/// `PUT /api/auth/self`
pub async fn update_me(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    JsonBody(body): JsonBody<ProfileUpdate>,
) -> ApiResult<Json<User>> {
    Ok(Json(state.accounts.update_profile(user.id, body).await?))
}

/// `PUT /api/auth/self/address`
pub async fn update_address(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    JsonBody(body): JsonBody<AddressChanges>,
) -> ApiResult<Json<User>> {
    Ok(Json(state.accounts.update_address(user.id, body).await?))
}

/// `PUT /api/auth/self/password`
pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    JsonBody(body): JsonBody<PasswordChange>,
) -> ApiResult<StatusCode> {
    state.accounts.change_password(user.id, body).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/auth/user/{id}`
pub async fn user(
    State(state): State<AppState>,
    PathParams(id): PathParams<UserId>,
) -> ApiResult<Json<PublicUser>> {
    Ok(Json(state.accounts.profile(id).await?.into()))
}
