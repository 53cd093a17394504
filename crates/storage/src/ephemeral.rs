//! Short-lived, single-use token storage.
//!
//! This module provides the [`EphemeralStore`] trait, a keyed map whose
//! entries carry an absolute expiry, and [`MemoryEphemeralStore`], its
//! in-memory implementation. The authentication service runs two instances
//! of the same store: one maps magic-link tokens to the [`Email`] they were
//! issued for, the other maps refresh tokens to a [`UserId`].
//!
//! # Entry lifecycle
//!
//! ```text
//! save(token, value, ttl) ──► live ──► take(token) ──► consumed
//!                               │
//!                               └──► expiry passes ──► evicted on next lookup
//!                                                      (or by the optional sweep)
//! ```
//!
//! Entries are never mutated in place. A `ttl` of zero means the entry never
//! expires.
//!
//! # Consume-once semantics
//!
//! Redemption must not be built from a `get` followed by a `delete`: two
//! callers could both observe the entry between those calls. Use
//! [`take`](EphemeralStore::take), which looks up and removes the entry in a
//! single critical section.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use templespace_storage::{EphemeralStore, Email, MagicLinkStore};
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let store = MagicLinkStore::new();
//! store.save("tok-1", Email::from("a@example.com"), Duration::from_secs(600)).await.unwrap();
//!
//! let first = store.take("tok-1").await.unwrap();
//! let second = store.take("tok-1").await.unwrap();
//! assert_eq!(first, Some(Email::from("a@example.com")));
//! assert_eq!(second, None);
//! # });
//! ```

use std::{
    collections::HashMap,
    fmt,
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::{select, sync::watch, time::sleep};

use crate::{
    error::StorageResult,
    types::{Email, UserId},
};

/// Keyed map of opaque tokens to values with an absolute expiry.
///
/// Implementations must be safe for concurrent use and must serialize access
/// per token so that, for any token, concurrent `get`/`delete`/`take` calls
/// behave as if executed one after another.
///
/// # Key Operations
///
/// | Method | Description |
/// |--------|-------------|
/// | [`save`](EphemeralStore::save) | Bind a fresh token to a value for `ttl` |
/// | [`get`](EphemeralStore::get) | Read a live value, evicting it if expired |
/// | [`delete`](EphemeralStore::delete) | Idempotent removal |
/// | [`take`](EphemeralStore::take) | Atomic read-and-remove (redemption) |
#[async_trait]
pub trait EphemeralStore<V>: Send + Sync
where
    V: Send + 'static,
{
    /// Associates `token` with `value` until `now + ttl`.
    ///
    /// Callers supply a cryptographically random token with at least 128
    /// bits of entropy. A zero `ttl` stores the entry without expiry. Saving
    /// an existing token replaces its entry.
    async fn save(&self, token: &str, value: V, ttl: Duration) -> StorageResult<()>;

    /// Returns the value bound to `token` if it exists and has not expired.
    ///
    /// An entry found past its expiry is removed as a side effect.
    async fn get(&self, token: &str) -> StorageResult<Option<V>>;

    /// Removes `token`. Succeeds whether or not the token exists.
    async fn delete(&self, token: &str) -> StorageResult<()>;

    /// Atomically returns and removes the value bound to `token`.
    ///
    /// Among any number of concurrent `take` calls for the same token, at
    /// most one observes `Some`. An expired entry is removed and reported as
    /// `None`.
    async fn take(&self, token: &str) -> StorageResult<Option<V>>;
}

/// Magic-link tokens mapped to the email they were issued for.
pub type MagicLinkStore = MemoryEphemeralStore<Email>;

/// Refresh tokens mapped to the user they were issued to.
pub type RefreshTokenStore = MemoryEphemeralStore<UserId>;

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    /// `None` means the entry never expires.
    expires_at: Option<Instant>,
}

impl<V> Entry<V> {
    fn new(value: V, ttl: Duration, now: Instant) -> Self {
        // A ttl too large for `Instant` is treated like "no expiry" instead of panicking.
        let expires_at = if ttl.is_zero() { None } else { now.checked_add(ttl) };
        Self { value, expires_at }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

type EntryMap<V> = Arc<RwLock<HashMap<String, Entry<V>>>>;

/// Shortest interval accepted for the background sweep. Shorter intervals,
/// including zero, are raised to this value.
pub const MIN_CLEANUP_INTERVAL: Duration = Duration::from_millis(10);

/// Holds the shutdown signal sender for the background sweep. When dropped,
/// the watch channel closes and the sweep task exits.
#[derive(Debug)]
struct ShutdownGuard {
    shutdown_tx: watch::Sender<()>,
}

impl Drop for ShutdownGuard {
    fn drop(&mut self) {
        // Best-effort signal; the receiver may already be gone.
        let _ = self.shutdown_tx.send(());
    }
}

/// In-memory [`EphemeralStore`] backed by a [`HashMap`] under a
/// [`parking_lot::RwLock`].
///
/// Expiration is lazy: lookups evict the entries they find expired. For
/// long-running processes an optional background sweep can be enabled with
/// [`with_cleanup_interval`](Self::with_cleanup_interval) to reclaim memory
/// held by tokens nobody ever redeems.
///
/// # Cloning
///
/// Clones are cheap and share the same entries. The background sweep, if
/// any, stops when the last clone is dropped or on
/// [`shutdown`](Self::shutdown).
pub struct MemoryEphemeralStore<V> {
    entries: EntryMap<V>,
    cleanup_interval: Option<Duration>,
    shutdown_guard: Option<Arc<ShutdownGuard>>,
}

impl<V> Clone for MemoryEphemeralStore<V> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            cleanup_interval: self.cleanup_interval,
            shutdown_guard: self.shutdown_guard.clone(),
        }
    }
}

impl<V> fmt::Debug for MemoryEphemeralStore<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryEphemeralStore")
            .field("entries", &self.entries.read().len())
            .field("cleanup_interval", &self.cleanup_interval)
            .finish()
    }
}

impl<V> Default for MemoryEphemeralStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> MemoryEphemeralStore<V> {
    /// Creates an empty store relying on lazy expiration only.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            cleanup_interval: None,
            shutdown_guard: None,
        }
    }

    /// Interval of the background sweep, `None` when expiry is lazy only.
    #[must_use]
    pub fn cleanup_interval(&self) -> Option<Duration> {
        self.cleanup_interval
    }

    /// Number of entries currently held, including expired entries that
    /// have not been evicted yet.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `true` if the store holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Removes every expired entry and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        purge_expired(&self.entries, Instant::now())
    }

    /// Explicitly stops the background sweep, if one is running.
    ///
    /// The sweep also stops when the last clone of the store is dropped.
    pub fn shutdown(&self) {
        if let Some(guard) = &self.shutdown_guard {
            let _ = guard.shutdown_tx.send(());
        }
    }
}

impl<V> MemoryEphemeralStore<V>
where
    V: Send + Sync + 'static,
{
    /// Creates an empty store with a background task that purges expired
    /// entries every `interval`, raised to at least
    /// [`MIN_CLEANUP_INTERVAL`].
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn with_cleanup_interval(interval: Duration) -> Self {
        let interval = interval.max(MIN_CLEANUP_INTERVAL);
        let (shutdown_tx, shutdown_rx) = watch::channel(());
        let store = Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            cleanup_interval: Some(interval),
            shutdown_guard: Some(Arc::new(ShutdownGuard { shutdown_tx })),
        };

        // The task only holds the map, so dropping every store handle
        // drops the guard and ends the task.
        let entries = Arc::clone(&store.entries);
        tokio::spawn(async move {
            sweep_expired(entries, interval, shutdown_rx).await;
        });

        store
    }
}

fn purge_expired<V>(entries: &RwLock<HashMap<String, Entry<V>>>, now: Instant) -> usize {
    let mut guard = entries.write();
    let before = guard.len();
    guard.retain(|_, entry| !entry.is_expired(now));
    before - guard.len()
}

async fn sweep_expired<V>(
    entries: EntryMap<V>,
    interval: Duration,
    mut shutdown_rx: watch::Receiver<()>,
) {
    loop {
        select! {
            _ = sleep(interval) => {}
            _ = shutdown_rx.changed() => {
                return;
            }
        }

        let removed = purge_expired(&entries, Instant::now());
        if removed > 0 {
            tracing::debug!(removed, "purged expired ephemeral tokens");
        }
    }
}

#[async_trait]
impl<V> EphemeralStore<V> for MemoryEphemeralStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    #[tracing::instrument(skip_all, fields(ttl_secs = ttl.as_secs()))]
    async fn save(&self, token: &str, value: V, ttl: Duration) -> StorageResult<()> {
        let entry = Entry::new(value, ttl, Instant::now());
        self.entries.write().insert(token.to_owned(), entry);
        Ok(())
    }

    #[tracing::instrument(skip_all)]
    async fn get(&self, token: &str) -> StorageResult<Option<V>> {
        let now = Instant::now();
        {
            let entries = self.entries.read();
            match entries.get(token) {
                None => return Ok(None),
                Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.value.clone())),
                Some(_) => {},
            }
        }

        // Expired: evict, re-checking under the write lock in case the token
        // was replaced between the two critical sections.
        let mut entries = self.entries.write();
        if entries.get(token).is_some_and(|entry| entry.is_expired(now)) {
            entries.remove(token);
            tracing::debug!("evicted expired token on lookup");
        }
        Ok(None)
    }

    #[tracing::instrument(skip_all)]
    async fn delete(&self, token: &str) -> StorageResult<()> {
        self.entries.write().remove(token);
        Ok(())
    }

    #[tracing::instrument(skip_all)]
    async fn take(&self, token: &str) -> StorageResult<Option<V>> {
        let now = Instant::now();
        let removed = self.entries.write().remove(token);
        Ok(removed.filter(|entry| !entry.is_expired(now)).map(|entry| entry.value))
    }
}
