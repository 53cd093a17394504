//! Authentication error types.
//!
//! Every failure of the login and verification paths maps to one
//! [`AuthError`] variant. The variants are precise so that logs and tests can
//! tell a forged credential from an expired one, but callers facing end users
//! must render [`AuthError::client_message`] instead of the `Display` text:
//! clients only ever learn that a token was rejected, never why.

use templespace_storage::StorageError;
use thiserror::Error;

/// Message returned to clients for every rejected token.
pub const REJECTED_TOKEN_MESSAGE: &str = "invalid or expired token";

/// Message returned to clients for server-side failures.
pub const INTERNAL_ERROR_MESSAGE: &str = "internal error";

/// Authentication errors.
///
/// # Non-exhaustive
///
/// This enum is marked `#[non_exhaustive]`; new variants may be added in
/// future minor releases without a semver-breaking change. Downstream match
/// expressions must include a wildcard arm (`_ =>`).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthError {
    /// The credential is not three well-formed segments, or a segment does
    /// not decode.
    #[error("Malformed token: {0}")]
    MalformedToken(String),

    /// The recomputed signature does not match, or the header declares an
    /// algorithm other than the active one.
    #[error("Invalid signature")]
    SignatureInvalid,

    /// The credential's expiry is in the past.
    #[error("Token expired")]
    Expired,

    /// The credential was issued by someone else.
    #[error("Issuer mismatch: expected '{expected}', got '{actual}'")]
    IssuerMismatch {
        /// Issuer this service signs with.
        expected: String,
        /// Issuer found in the credential.
        actual: String,
    },

    /// The magic-link token is unknown, expired, or already redeemed.
    #[error("Token not found or already used")]
    TokenNotFound,

    /// Producing a signature failed.
    #[error("Signing failed: {0}")]
    SigningFailure(String),

    /// Key material could not be parsed or is unsuitable.
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Configuration is missing or inconsistent.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A token store failed.
    ///
    /// Wraps the original [`StorageError`] to preserve the source chain.
    #[error("Storage error: {0}")]
    Storage(
        /// The underlying storage error.
        #[source]
        StorageError,
    ),
}

impl AuthError {
    /// Creates a [`AuthError::MalformedToken`].
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedToken(message.into())
    }

    /// Creates a [`AuthError::SigningFailure`].
    pub fn signing_failure(message: impl Into<String>) -> Self {
        Self::SigningFailure(message.into())
    }

    /// Creates a [`AuthError::InvalidKey`].
    pub fn invalid_key(message: impl Into<String>) -> Self {
        Self::InvalidKey(message.into())
    }

    /// Creates a [`AuthError::Config`].
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates a [`AuthError::IssuerMismatch`].
    pub fn issuer_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::IssuerMismatch { expected: expected.into(), actual: actual.into() }
    }

    /// Returns `true` if the error was caused by the presented token rather
    /// than by the service.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedToken(_)
                | Self::SignatureInvalid
                | Self::Expired
                | Self::IssuerMismatch { .. }
                | Self::TokenNotFound
        )
    }

    /// Coarse message safe to show to clients.
    ///
    /// All token rejections share one message so that a caller cannot probe
    /// which check failed.
    #[must_use]
    pub fn client_message(&self) -> &'static str {
        if self.is_client_error() { REJECTED_TOKEN_MESSAGE } else { INTERNAL_ERROR_MESSAGE }
    }
}

impl From<StorageError> for AuthError {
    fn from(err: StorageError) -> Self {
        AuthError::Storage(err)
    }
}

/// Result type alias for authentication operations.
pub type Result<T> = std::result::Result<T, AuthError>;
