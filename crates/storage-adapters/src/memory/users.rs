use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use domains::{
    AddressChanges, Credentials, DomainError, DomainResult, NewUser, ProfileChanges, User, UserId,
    UserRepository,
};

use super::InMemoryStore;

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn create(&self, user: NewUser) -> DomainResult<User> {
        let id = match self.usernames.entry(user.username.clone()) {
            Entry::Occupied(_) => {
                return Err(DomainError::Conflict(format!(
                    "username `{}` is taken",
                    user.username
                )))
            }
            Entry::Vacant(slot) => *slot.insert(self.user_ids.next()),
        };
        let created = User {
            id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            phone_number: user.phone_number,
            date_joined: Utc::now(),
            address: user.address,
        };
        self.users
            .insert(id, (created.clone(), user.password_hash));
        Ok(created)
    }

    async fn find_by_id(&self, id: UserId) -> DomainResult<Option<User>> {
        Ok(self.users.get(&id).map(|entry| entry.0.clone()))
    }

    async fn credentials_by_username(&self, username: &str) -> DomainResult<Option<Credentials>> {
        let Some(id) = self.usernames.get(username).map(|entry| *entry) else {
            return Ok(None);
        };
        self.credentials_by_id(id).await
    }

    async fn credentials_by_id(&self, id: UserId) -> DomainResult<Option<Credentials>> {
        Ok(self.users.get(&id).map(|entry| Credentials {
            user: entry.0.clone(),
            password_hash: entry.1.clone(),
        }))
    }

    async fn update_profile(&self, id: UserId, changes: ProfileChanges) -> DomainResult<User> {
        let mut entry = self
            .users
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("User", id))?;
        let user = &mut entry.0;
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(first_name) = changes.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = changes.last_name {
            user.last_name = last_name;
        }
        if let Some(phone_number) = changes.phone_number {
            user.phone_number = phone_number;
        }
        Ok(user.clone())
    }

    async fn update_address(&self, id: UserId, changes: AddressChanges) -> DomainResult<User> {
        let mut entry = self
            .users
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("User", id))?;
        let address = &mut entry.0.address;
        if let Some(street_address) = changes.street_address {
            address.street_address = street_address;
        }
        if let Some(postal_code) = changes.postal_code {
            address.postal_code = postal_code;
        }
        if let Some(city) = changes.city {
            address.city = city;
        }
        Ok(entry.0.clone())
    }

    async fn set_password_hash(&self, id: UserId, password_hash: String) -> DomainResult<()> {
        let mut entry = self
            .users
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("User", id))?;
        entry.1 = password_hash;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::Address;

    fn new_user(username: &str) -> NewUser {
        NewUser {
            username: username.into(),
            email: format!("{username}@example.no"),
            first_name: String::new(),
            last_name: String::new(),
            phone_number: None,
            password_hash: "hash".into(),
            address: Address::default(),
        }
    }

    #[tokio::test]
    async fn duplicate_username_conflicts() {
        let store = InMemoryStore::new();
        store.create(new_user("kari")).await.unwrap();
        let err = store.create(new_user("kari")).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn credentials_follow_password_changes() {
        let store = InMemoryStore::new();
        let user = store.create(new_user("ola")).await.unwrap();
        store.set_password_hash(user.id, "new-hash".into()).await.unwrap();

        let credentials = store.credentials_by_username("ola").await.unwrap().unwrap();
        assert_eq!(credentials.password_hash, "new-hash");
        assert_eq!(credentials.user.id, user.id);
        assert!(store.credentials_by_username("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn address_update_is_partial() {
        let store = InMemoryStore::new();
        let user = store.create(new_user("per")).await.unwrap();
        let updated = store
            .update_address(
                user.id,
                AddressChanges {
                    city: Some("Trondheim".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.address.city, "Trondheim");
        assert_eq!(updated.address.street_address, "");
    }
}
