//! Collaborator interfaces consumed by the authentication core
//!
//! The core never talks to the database directly. It looks credentials up
//! through [`CredentialStore`] and resource owners through [`ResourceStore`];
//! both are implemented for [`quill_db::Database`] below.

use async_trait::async_trait;
use quill_db::{Database, User, UserRole};
use std::error::Error as StdError;
use thiserror::Error;

/// Failure of a backing store, as opposed to a missing record
#[derive(Error, Debug)]
#[error("{context}: {source}")]
pub struct StoreError {
    context: &'static str,
    #[source]
    source: Box<dyn StdError + Send + Sync>,
}

impl StoreError {
    pub fn new(context: &'static str, source: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self {
            context,
            source: source.into(),
        }
    }
}

/// Stored credential of a subject
#[derive(Debug, Clone)]
pub struct Credential {
    pub subject_id: i64,
    pub username: String,
    pub password_hash: String,
    pub role: UserRole,
}

impl From<User> for Credential {
    fn from(user: User) -> Self {
        Self {
            subject_id: user.id,
            username: user.username,
            password_hash: user.password_hash,
            role: user.role,
        }
    }
}

/// Lookup of credentials by login identifier or subject id
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<Credential>, StoreError>;

    async fn find_by_id(&self, subject_id: i64) -> Result<Option<Credential>, StoreError>;
}

/// Lookup of the subject that owns a mutable resource
#[async_trait]
pub trait ResourceStore: Send + Sync {
    async fn owner_of(&self, resource_id: i64) -> Result<Option<i64>, StoreError>;
}

#[async_trait]
impl CredentialStore for Database {
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<Credential>, StoreError> {
        let user = self
            .get_user_by_username(identifier)
            .await
            .map_err(|e| StoreError::new("credential lookup failed", e))?;
        Ok(user.map(Credential::from))
    }

    async fn find_by_id(&self, subject_id: i64) -> Result<Option<Credential>, StoreError> {
        let user = self
            .get_user_by_id(subject_id)
            .await
            .map_err(|e| StoreError::new("credential lookup failed", e))?;
        Ok(user.map(Credential::from))
    }
}

/// Articles are the owned resources of this service.
#[async_trait]
impl ResourceStore for Database {
    async fn owner_of(&self, resource_id: i64) -> Result<Option<i64>, StoreError> {
        self.get_article_owner(resource_id)
            .await
            .map_err(|e| StoreError::new("owner lookup failed", e))
    }
}

#[cfg(test)]
pub(crate) mod memory {
    //! In-memory stores for tests

    use super::*;
    use parking_lot::RwLock;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Default)]
    pub struct MemoryCredentials {
        users: RwLock<HashMap<i64, Credential>>,
        unavailable: AtomicBool,
    }

    impl MemoryCredentials {
        pub fn insert(&self, subject_id: i64, username: &str, role: UserRole) {
            self.users.write().insert(
                subject_id,
                Credential {
                    subject_id,
                    username: username.to_string(),
                    password_hash: String::new(),
                    role,
                },
            );
        }

        pub fn remove(&self, subject_id: i64) {
            self.users.write().remove(&subject_id);
        }

        pub fn set_unavailable(&self, unavailable: bool) {
            self.unavailable.store(unavailable, Ordering::SeqCst);
        }

        fn check(&self) -> Result<(), StoreError> {
            if self.unavailable.load(Ordering::SeqCst) {
                return Err(StoreError::new("credential lookup failed", "connection refused"));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl CredentialStore for MemoryCredentials {
        async fn find_by_identifier(
            &self,
            identifier: &str,
        ) -> Result<Option<Credential>, StoreError> {
            self.check()?;
            Ok(self
                .users
                .read()
                .values()
                .find(|c| c.username == identifier)
                .cloned())
        }

        async fn find_by_id(&self, subject_id: i64) -> Result<Option<Credential>, StoreError> {
            self.check()?;
            Ok(self.users.read().get(&subject_id).cloned())
        }
    }

    #[derive(Default)]
    pub struct MemoryResources {
        owners: RwLock<HashMap<i64, i64>>,
        unavailable: AtomicBool,
    }

    impl MemoryResources {
        pub fn insert(&self, resource_id: i64, owner_id: i64) {
            self.owners.write().insert(resource_id, owner_id);
        }

        pub fn set_unavailable(&self, unavailable: bool) {
            self.unavailable.store(unavailable, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl ResourceStore for MemoryResources {
        async fn owner_of(&self, resource_id: i64) -> Result<Option<i64>, StoreError> {
            if self.unavailable.load(Ordering::SeqCst) {
                return Err(StoreError::new("owner lookup failed", "connection refused"));
            }
            Ok(self.owners.read().get(&resource_id).copied())
        }
    }
}
