use async_trait::async_trait;
use domains::{
    Address, AddressChanges, Credentials, DomainError, DomainResult, NewUser, ProfileChanges, User,
    UserId, UserRepository,
};
use sqlx::postgres::PgRow;
use sqlx::Row;

use super::{db_error, violation, PgStore, Violation};

const USER_SELECT: &str = "SELECT u.id, u.username, u.email, u.first_name, u.last_name, \
     u.phone_number, u.date_joined, u.password_hash, \
     a.street_address, a.postal_code, a.city \
     FROM users u JOIN addresses a ON a.user_id = u.id";

fn map_user(row: &PgRow) -> Result<User, sqlx::Error> {
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        phone_number: row.try_get("phone_number")?,
        date_joined: row.try_get("date_joined")?,
        address: Address {
            street_address: row.try_get("street_address")?,
            postal_code: row.try_get("postal_code")?,
            city: row.try_get("city")?,
        },
    })
}

fn map_credentials(row: &PgRow) -> Result<Credentials, sqlx::Error> {
    Ok(Credentials {
        user: map_user(row)?,
        password_hash: row.try_get("password_hash")?,
    })
}

#[async_trait]
impl UserRepository for PgStore {
    async fn create(&self, user: NewUser) -> DomainResult<User> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let row = sqlx::query(
            "INSERT INTO users \
             (username, email, first_name, last_name, phone_number, password_hash) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING id, date_joined",
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.phone_number)
        .bind(&user.password_hash)
        .fetch_one(&mut *tx)
        .await
        .map_err(|err| match violation(&err) {
            Some(Violation::Unique) => {
                DomainError::Conflict(format!("username `{}` is taken", user.username))
            }
            _ => db_error(err),
        })?;
        let id: UserId = row.try_get("id").map_err(db_error)?;

        sqlx::query(
            "INSERT INTO addresses (user_id, street_address, postal_code, city) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(id)
        .bind(&user.address.street_address)
        .bind(&user.address.postal_code)
        .bind(&user.address.city)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;

        Ok(User {
            id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            phone_number: user.phone_number,
            date_joined: row.try_get("date_joined").map_err(db_error)?,
            address: user.address,
        })
    }

    async fn find_by_id(&self, id: UserId) -> DomainResult<Option<User>> {
        Ok(self.credentials_by_id(id).await?.map(|found| found.user))
    }

    async fn credentials_by_username(&self, username: &str) -> DomainResult<Option<Credentials>> {
        let sql = format!("{USER_SELECT} WHERE u.username = $1");
        let row = sqlx::query(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        row.as_ref()
            .map(map_credentials)
            .transpose()
            .map_err(db_error)
    }

    async fn credentials_by_id(&self, id: UserId) -> DomainResult<Option<Credentials>> {
        let sql = format!("{USER_SELECT} WHERE u.id = $1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        row.as_ref()
            .map(map_credentials)
            .transpose()
            .map_err(db_error)
    }

    async fn update_profile(&self, id: UserId, changes: ProfileChanges) -> DomainResult<User> {
        let result = sqlx::query(
            "UPDATE users SET \
               email = COALESCE($2, email), \
               first_name = COALESCE($3, first_name), \
               last_name = COALESCE($4, last_name), \
               phone_number = CASE WHEN $5 THEN $6 ELSE phone_number END \
             WHERE id = $1",
        )
        .bind(id)
        .bind(changes.email)
        .bind(changes.first_name)
        .bind(changes.last_name)
        .bind(changes.phone_number.is_some())
        .bind(changes.phone_number.flatten())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("User", id));
        }
        self.find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("User", id))
    }

    async fn update_address(&self, id: UserId, changes: AddressChanges) -> DomainResult<User> {
        let result = sqlx::query(
            "UPDATE addresses SET \
               street_address = COALESCE($2, street_address), \
               postal_code = COALESCE($3, postal_code), \
               city = COALESCE($4, city) \
             WHERE user_id = $1",
        )
        .bind(id)
        .bind(changes.street_address)
        .bind(changes.postal_code)
        .bind(changes.city)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("User", id));
        }
        self.find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("User", id))
    }

    async fn set_password_hash(&self, id: UserId, password_hash: String) -> DomainResult<()> {
        let result = sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("User", id));
        }
        Ok(())
    }
}
