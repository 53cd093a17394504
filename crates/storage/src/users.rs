//! User identity records and their store.
//!
//! The authentication service only needs two operations on users: look one
//! up by email, and create or replace one. Profile management lives
//! elsewhere; role changes arrive through an administrative path that writes
//! through [`UserStore::upsert`].

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::{
    error::StorageResult,
    types::{Email, UserId},
};

/// A user known to the authentication service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Stable user identifier (subject of issued credentials).
    pub id: UserId,
    /// Email address the user logs in with.
    pub email: Email,
    /// Coarse role label resolved to scopes at login.
    pub role: String,
}

impl User {
    /// Creates a user record.
    #[must_use]
    pub fn new(id: impl Into<UserId>, email: impl Into<Email>, role: impl Into<String>) -> Self {
        Self { id: id.into(), email: email.into(), role: role.into() }
    }
}

/// Persistence for user identity records, keyed by email.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Looks up the user registered under `email`.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(user))` if the email is known
    /// - `Ok(None)` if it is not
    /// - `Err(...)` on storage errors
    async fn find_by_email(&self, email: &Email) -> StorageResult<Option<User>>;

    /// Creates the user or replaces the record stored under its email.
    async fn upsert(&self, user: &User) -> StorageResult<()>;
}

/// In-memory [`UserStore`] for tests and single-process deployments.
///
/// # Thread Safety
///
/// Uses [`parking_lot::RwLock`]; each operation is atomic with respect to
/// its email.
#[derive(Debug, Default, Clone)]
pub struct MemoryUserStore {
    users: Arc<RwLock<HashMap<Email, User>>>,
}

impl MemoryUserStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users.
    #[must_use]
    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    /// Returns `true` if no users are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.read().is_empty()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    #[tracing::instrument(skip_all)]
    async fn find_by_email(&self, email: &Email) -> StorageResult<Option<User>> {
        Ok(self.users.read().get(email).cloned())
    }

    #[tracing::instrument(skip_all, fields(role = %user.role))]
    async fn upsert(&self, user: &User) -> StorageResult<()> {
        self.users.write().insert(user.email.clone(), user.clone());
        Ok(())
    }
}
