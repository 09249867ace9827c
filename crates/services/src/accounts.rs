//! # Accounts
//!
//! Registration, token login/refresh, bearer authentication and self-service
//! profile management. Hashing and token mechanics sit behind the
//! `PasswordHasher` and `TokenService` ports.

use std::sync::Arc;

use domains::{
    Address, AddressChanges, DomainError, DomainResult, NewUser, PasswordHasher, ProfileChanges,
    TokenPair, TokenService, User, UserId, UserRepository,
};
use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::{blocking, validation};

const BAD_CREDENTIALS: &str = "no active account found with the given credentials";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub phone_number: Option<String>,
    pub address: Option<Address>,
}

/// Self-service profile edit. `password` is the current password, required
/// as confirmation; it is never used to change the password.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub password: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PasswordChange {
    pub old_password: String,
    pub new_password: String,
}

pub struct AccountService {
    users: Arc<dyn UserRepository>,
    hasher: Arc<dyn PasswordHasher>,
    tokens: Arc<dyn TokenService>,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        hasher: Arc<dyn PasswordHasher>,
        tokens: Arc<dyn TokenService>,
    ) -> Self {
        Self {
            users,
            hasher,
            tokens,
        }
    }

    #[instrument(skip_all, fields(username = %registration.username))]
    pub async fn register(&self, registration: Registration) -> DomainResult<User> {
        let username = validation::text(
            "username",
            &registration.username,
            1,
            validation::USERNAME_MAX,
        )?;
        let email = validation::email(&registration.email)?;
        validation::password("password", &registration.password)?;
        let first_name =
            validation::text("first_name", &registration.first_name, 0, validation::NAME_MAX)?;
        let last_name =
            validation::text("last_name", &registration.last_name, 0, validation::NAME_MAX)?;
        let phone_number =
            validation::optional_text("phone_number", registration.phone_number.as_deref(), 17)?;
        let password_hash = self.hash(&registration.password).await?;

        let user = self
            .users
            .create(NewUser {
                username,
                email,
                first_name,
                last_name,
                phone_number,
                password_hash,
                address: registration.address.unwrap_or_default(),
            })
            .await?;
        info!(user_id = user.id, "user registered");
        Ok(user)
    }

    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> DomainResult<TokenPair> {
        let verified = match self.users.credentials_by_username(username).await? {
            Some(credentials) => self
                .verify(password, credentials.password_hash)
                .await?
                .then_some(credentials.user.id),
            None => None,
        };
        let Some(user_id) = verified else {
            warn!("login rejected");
            return Err(DomainError::Unauthorized(BAD_CREDENTIALS.into()));
        };
        info!(user_id, "token pair issued");
        self.tokens.issue(user_id)
    }

    pub fn refresh(&self, refresh_token: &str) -> DomainResult<String> {
        self.tokens.refresh(refresh_token)
    }

    /// Resolves a bearer access token to the current user.
    pub async fn authenticate(&self, access_token: &str) -> DomainResult<User> {
        let user_id = self.tokens.verify_access(access_token)?;
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| DomainError::Unauthorized("user not found".into()))
    }

    pub async fn profile(&self, id: UserId) -> DomainResult<User> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("User", id))
    }

    #[instrument(skip(self, update))]
    pub async fn update_profile(
        &self,
        user: UserId,
        update: ProfileUpdate,
    ) -> DomainResult<User> {
        self.confirm_password(user, "password", &update.password).await?;
        let changes = ProfileChanges {
            email: update.email.as_deref().map(validation::email).transpose()?,
            first_name: update
                .first_name
                .as_deref()
                .map(|name| validation::text("first_name", name, 0, validation::NAME_MAX))
                .transpose()?,
            last_name: update
                .last_name
                .as_deref()
                .map(|name| validation::text("last_name", name, 0, validation::NAME_MAX))
                .transpose()?,
            phone_number: match update.phone_number.as_deref() {
                Some(phone) => Some(validation::optional_text("phone_number", Some(phone), 17)?),
                None => None,
            },
        };
        let user = self.users.update_profile(user, changes).await?;
        info!(user_id = user.id, "profile updated");
        Ok(user)
    }

    pub async fn update_address(
        &self,
        user: UserId,
        changes: AddressChanges,
    ) -> DomainResult<User> {
        let trim = |field: &str, value: Option<String>| {
            value
                .map(|value| validation::text(field, &value, 0, 128))
                .transpose()
        };
        let changes = AddressChanges {
            street_address: trim("street_address", changes.street_address)?,
            postal_code: trim("postal_code", changes.postal_code)?,
            city: trim("city", changes.city)?,
        };
        self.users.update_address(user, changes).await
    }

    #[instrument(skip(self, change))]
    pub async fn change_password(&self, user: UserId, change: PasswordChange) -> DomainResult<()> {
        self.confirm_password(user, "old_password", &change.old_password)
            .await?;
        validation::password("new_password", &change.new_password)?;
        let password_hash = self.hash(&change.new_password).await?;
        self.users.set_password_hash(user, password_hash).await?;
        info!(user_id = user, "password changed");
        Ok(())
    }

    async fn confirm_password(
        &self,
        user: UserId,
        field: &str,
        password: &str,
    ) -> DomainResult<()> {
        let credentials = self
            .users
            .credentials_by_id(user)
            .await?
            .ok_or_else(|| DomainError::not_found("User", user))?;
        if !self.verify(password, credentials.password_hash).await? {
            return Err(DomainError::validation(field, "wrong password"));
        }
        Ok(())
    }

    async fn hash(&self, password: &str) -> DomainResult<String> {
        let hasher = Arc::clone(&self.hasher);
        let password = password.to_string();
        blocking(move || hasher.hash(&password)).await
    }

    async fn verify(&self, password: &str, password_hash: String) -> DomainResult<bool> {
        let hasher = Arc::clone(&self.hasher);
        let password = password.to_string();
        blocking(move || Ok(hasher.verify(&password, &password_hash))).await
    }
}
