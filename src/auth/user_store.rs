//! User Storage
//! Mission: Persist user accounts with a unique login name

use crate::auth::models::{NewUser, User};
use crate::db::{conflict_on_unique, now_timestamp, Database, StoreError};
use async_trait::async_trait;
use rusqlite::{params, OptionalExtension, Row};
use tracing::info;
use uuid::Uuid;

/// Conflict message for a taken username
pub const DUPLICATE_USERNAME: &str = "The username already exists";

/// Where user accounts live
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    /// Fails with [`StoreError::Conflict`] when the username is taken. The
    /// check happens at write time, not before.
    async fn create_user(&self, new_user: NewUser) -> Result<User, StoreError>;
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        fullname: row.get(2)?,
        password_hash: row.get(3)?,
        created_at: row.get(4)?,
    })
}

#[async_trait]
impl CredentialStore for Database {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let username = username.to_string();
        self.call(move |conn| {
            let user = conn
                .query_row(
                    "SELECT id, username, fullname, password_hash, created_at
                     FROM users WHERE username = ?1",
                    params![username],
                    user_from_row,
                )
                .optional()?;
            Ok(user)
        })
        .await
    }

    async fn create_user(&self, new_user: NewUser) -> Result<User, StoreError> {
        let user = User {
            id: Uuid::new_v4().to_string(),
            username: new_user.username,
            fullname: new_user.fullname,
            password_hash: new_user.password_hash,
            created_at: now_timestamp(),
        };

        let user = self
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO users (id, username, fullname, password_hash, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        user.id,
                        user.username,
                        user.fullname,
                        user.password_hash,
                        user.created_at,
                    ],
                )
                .map_err(|e| conflict_on_unique(e, DUPLICATE_USERNAME))?;
                Ok(user)
            })
            .await?;

        info!(user_id = %user.id, username = %user.username, "Created user");

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn create_test_store() -> (Database, NamedTempFile) {
        let temp_file = NamedTempFile::new().unwrap();
        let store = Database::open(temp_file.path()).unwrap();
        (store, temp_file)
    }

    fn new_user(username: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            fullname: "Example User".to_string(),
            password_hash: "$2b$10$notarealdigest".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_retrieve_user() {
        let (store, _temp) = create_test_store();

        let created = store.create_user(new_user("exampleUser")).await.unwrap();
        assert_eq!(created.username, "exampleUser");

        let retrieved = store.find_by_username("exampleUser").await.unwrap().unwrap();
        assert_eq!(retrieved.id, created.id);
        assert_eq!(retrieved.fullname, "Example User");
        assert_eq!(retrieved.password_hash, "$2b$10$notarealdigest");
    }

    #[tokio::test]
    async fn test_missing_user_is_none() {
        let (store, _temp) = create_test_store();
        assert!(store.find_by_username("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_username_conflicts() {
        let (store, _temp) = create_test_store();

        store.create_user(new_user("exampleUser")).await.unwrap();
        match store.create_user(new_user("exampleUser")).await {
            Err(StoreError::Conflict(message)) => assert_eq!(message, DUPLICATE_USERNAME),
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_username_is_case_sensitive() {
        let (store, _temp) = create_test_store();

        store.create_user(new_user("exampleUser")).await.unwrap();
        store.create_user(new_user("EXAMPLEUSER")).await.unwrap();
        assert!(store.find_by_username("exampleuser").await.unwrap().is_none());
    }
}
