//! The login flow.
//!
//! [`AuthService`] composes the codec, the two token stores and the identity
//! resolver into the two user-facing operations:
//!
//! ```text
//! start_login(email)          verify_magic_token(token)
//!        │                              │
//!        ▼                              ▼
//!  magic-link store ──── take ────▶ identity resolver ──▶ scopes
//!  (token → email)     (single use)                          │
//!                                                            ▼
//!                             refresh store ◀── mint ── sign access credential
//!                             (token → user id)
//! ```
//!
//! A magic token is consumed before anything else happens. If a later step
//! fails the login fails, and the token stays consumed.

use std::{fmt, sync::Arc, time::Duration};

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use templespace_storage::{
    Email, EphemeralStore, MagicLinkStore, MemoryUserStore, RefreshTokenStore, UserId, UserStore,
};

use crate::{
    claims::{AccessIdentity, Claims},
    codec::CredentialCodec,
    config::{
        AuthConfig, DEFAULT_ACCESS_TOKEN_TTL, DEFAULT_MAGIC_LINK_TTL, DEFAULT_REFRESH_TOKEN_TTL,
    },
    error::{AuthError, Result},
    identity::IdentityResolver,
    jwks::JwkSet,
    rbac::scopes_for,
};

/// Random bytes per opaque token (256 bits).
pub const TOKEN_BYTES: usize = 32;

/// Credentials issued by a successful login.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginTokens {
    /// Signed access credential.
    pub access_token: String,
    /// Opaque refresh token.
    pub refresh_token: String,
    /// Access credential lifetime in seconds.
    pub expires_in: u64,
}

impl fmt::Debug for LoginTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginTokens")
            .field("access_token", &"[redacted]")
            .field("refresh_token", &"[redacted]")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Passwordless authentication service.
///
/// The service is `Send + Sync`; share it behind an [`Arc`].
pub struct AuthService {
    codec: CredentialCodec,
    magic_links: Arc<dyn EphemeralStore<Email>>,
    refresh_tokens: Arc<dyn EphemeralStore<UserId>>,
    identities: IdentityResolver,
    magic_link_ttl: Duration,
    access_token_ttl: Duration,
    refresh_token_ttl: Duration,
}

impl fmt::Debug for AuthService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthService")
            .field("codec", &self.codec)
            .field("identities", &self.identities)
            .field("magic_link_ttl", &self.magic_link_ttl)
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .finish_non_exhaustive()
    }
}

fn default_magic_links() -> Arc<dyn EphemeralStore<Email>> {
    Arc::new(MagicLinkStore::new())
}

fn default_refresh_tokens() -> Arc<dyn EphemeralStore<UserId>> {
    Arc::new(RefreshTokenStore::new())
}

#[bon::bon]
impl AuthService {
    /// Creates a service.
    ///
    /// Stores default to fresh in-memory stores. Without a user store every
    /// login resolves to the default role.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] if any TTL is zero.
    #[builder]
    pub fn new(
        codec: CredentialCodec,
        #[builder(default = default_magic_links())] magic_links: Arc<dyn EphemeralStore<Email>>,
        #[builder(default = default_refresh_tokens())] refresh_tokens: Arc<
            dyn EphemeralStore<UserId>,
        >,
        users: Option<Arc<dyn UserStore>>,
        #[builder(default = DEFAULT_MAGIC_LINK_TTL)] magic_link_ttl: Duration,
        #[builder(default = DEFAULT_ACCESS_TOKEN_TTL)] access_token_ttl: Duration,
        #[builder(default = DEFAULT_REFRESH_TOKEN_TTL)] refresh_token_ttl: Duration,
    ) -> Result<Self> {
        if magic_link_ttl.is_zero() || access_token_ttl.is_zero() || refresh_token_ttl.is_zero() {
            return Err(AuthError::config("token lifetimes must be greater than zero"));
        }

        Ok(Self {
            codec,
            magic_links,
            refresh_tokens,
            identities: IdentityResolver::new(users),
            magic_link_ttl,
            access_token_ttl,
            refresh_token_ttl,
        })
    }

    /// Creates a service from configuration, backed by in-memory stores.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or its keys cannot be
    /// loaded.
    pub fn from_config(config: &AuthConfig) -> Result<Self> {
        config.validate()?;
        let codec = CredentialCodec::from_config(config.signing(), config.issuer())?;
        let users: Arc<dyn UserStore> = Arc::new(MemoryUserStore::new());

        Self::builder()
            .codec(codec)
            .users(users)
            .magic_link_ttl(config.magic_link_ttl())
            .access_token_ttl(config.access_token_ttl())
            .refresh_token_ttl(config.refresh_token_ttl())
            .build()
    }

    /// Issues a magic-link token for `email`.
    ///
    /// The address is not validated; delivering the link is the caller's
    /// job.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Storage`] if the token cannot be saved.
    #[tracing::instrument(skip_all)]
    pub async fn start_login(&self, email: impl Into<Email>) -> Result<String> {
        let token = generate_token();
        self.magic_links.save(&token, email.into(), self.magic_link_ttl).await?;
        tracing::debug!(ttl_secs = self.magic_link_ttl.as_secs(), "Issued magic link");
        Ok(token)
    }

    /// Redeems a magic-link token for an access credential and a refresh
    /// token.
    ///
    /// # Errors
    ///
    /// - [`AuthError::TokenNotFound`] if the token is unknown, expired, or
    ///   already redeemed
    /// - [`AuthError::SigningFailure`] if the access credential cannot be
    ///   signed
    /// - [`AuthError::Storage`] if a token store fails
    #[tracing::instrument(skip_all)]
    pub async fn verify_magic_token(&self, token: &str) -> Result<LoginTokens> {
        let Some(email) = self.magic_links.take(token).await? else {
            tracing::warn!("Magic link rejected");
            return Err(AuthError::TokenNotFound);
        };

        let identity = self.identities.resolve(&email).await;
        let scopes = scopes_for(&identity.role);
        let claims =
            Claims::for_user(&identity.user_id, &identity.email, scopes, self.access_token_ttl);
        let access_token = self.codec.sign(claims)?;

        let refresh_token = generate_token();
        self.refresh_tokens
            .save(&refresh_token, identity.user_id.clone(), self.refresh_token_ttl)
            .await?;

        tracing::debug!(role = %identity.role, "Magic link redeemed");
        Ok(LoginTokens { access_token, refresh_token, expires_in: self.access_token_ttl.as_secs() })
    }

    /// Verifies an access credential issued by this service.
    ///
    /// # Errors
    ///
    /// See [`CredentialCodec::verify`].
    pub fn verify_access_token(&self, token: &str) -> Result<AccessIdentity> {
        self.codec.verify_access_token(token)
    }

    /// Public keys for external verifiers.
    #[must_use]
    pub fn public_keys(&self) -> JwkSet {
        self.codec.public_keys()
    }

    /// The codec credentials are signed with.
    #[must_use]
    pub fn codec(&self) -> &CredentialCodec {
        &self.codec
    }

    /// Access credential lifetime.
    #[must_use]
    pub fn access_token_ttl(&self) -> Duration {
        self.access_token_ttl
    }
}

/// Creates an unguessable opaque token: [`TOKEN_BYTES`] from the thread-local
/// CSPRNG, base64url without padding.
#[must_use]
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
