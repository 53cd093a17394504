//! Shared test utilities for store testing.
//!
//! Feature-gated behind `testutil` to prevent leaking into production builds.
//!
//! ```toml
//! [dev-dependencies]
//! templespace-storage = { path = "../storage", features = ["testutil"] }
//! ```

use std::{
    io,
    sync::atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;

use crate::{
    error::{StorageError, StorageResult},
    types::Email,
    users::{User, UserStore},
};

/// Create a deterministic test token from a prefix and index.
///
/// Produces tokens like `"prefix-000042"`. Not suitable outside tests: real
/// tokens must come from a CSPRNG.
#[must_use]
pub fn make_token(prefix: &str, idx: usize) -> String {
    format!("{prefix}-{idx:06}")
}

/// A [`UserStore`] whose operations fail on demand.
///
/// Used to exercise the paths where identity storage is unavailable.
#[derive(Debug, Default)]
pub struct FailingUserStore {
    /// Fail `find_by_email` with an internal error.
    pub fail_lookups: bool,
    /// Fail `upsert` with an internal error.
    pub fail_upserts: bool,
    upsert_attempts: AtomicUsize,
}

impl FailingUserStore {
    /// A store whose upserts fail while lookups report "not found".
    #[must_use]
    pub fn failing_upserts() -> Self {
        Self { fail_lookups: false, fail_upserts: true, upsert_attempts: AtomicUsize::new(0) }
    }

    /// A store where every operation fails.
    #[must_use]
    pub fn unavailable() -> Self {
        Self { fail_lookups: true, fail_upserts: true, upsert_attempts: AtomicUsize::new(0) }
    }

    /// Number of `upsert` calls received so far.
    #[must_use]
    pub fn upsert_attempts(&self) -> usize {
        self.upsert_attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UserStore for FailingUserStore {
    async fn find_by_email(&self, _email: &Email) -> StorageResult<Option<User>> {
        if self.fail_lookups {
            let cause = io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused");
            return Err(StorageError::internal_with_source("user store unavailable", cause));
        }
        Ok(None)
    }

    async fn upsert(&self, _user: &User) -> StorageResult<()> {
        self.upsert_attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_upserts {
            return Err(StorageError::internal("user store rejected write"));
        }
        Ok(())
    }
}
