//! Token and identity storage for the Templespace authentication service.
//!
//! This crate provides the two storage capabilities the authentication core
//! depends on, each as a trait with an in-memory implementation:
//!
//! - [`EphemeralStore`]: single-use tokens with an absolute expiry. Two
//!   instances back the service, [`MagicLinkStore`] (token → [`Email`]) and
//!   [`RefreshTokenStore`] (token → [`UserId`]).
//! - [`UserStore`]: identity records looked up by email.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  templespace-authn                          │
//! │      AuthService (start_login, verify_magic_token)          │
//! ├──────────────────────────────┬──────────────────────────────┤
//! │  EphemeralStore<Email>       │  UserStore                   │
//! │  EphemeralStore<UserId>      │                              │
//! ├──────────────────────────────┼──────────────────────────────┤
//! │  MemoryEphemeralStore<V>     │  MemoryUserStore             │
//! └──────────────────────────────┴──────────────────────────────┘
//! ```
//!
//! Durable backends implement the same traits and map their failures to
//! [`StorageError`].
//!
//! # Feature Flags
//!
//! - **`testutil`**: Enables the `testutil` module with shared test helpers.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod ephemeral;
pub mod error;
#[cfg(any(test, feature = "testutil"))]
pub mod testutil;
pub mod types;
pub mod users;

// Re-export primary types at crate root for convenience
pub use ephemeral::{EphemeralStore, MagicLinkStore, MemoryEphemeralStore, RefreshTokenStore};
pub use error::{BoxError, StorageError, StorageResult};
pub use types::{Email, UserId};
pub use users::{MemoryUserStore, User, UserStore};
