//! Service configuration.
//!
//! [`AuthConfig`] can be built in code, deserialized, or read from the
//! process environment:
//!
//! | Variable | Meaning | Default |
//! |----------|---------|---------|
//! | `JWT_ISSUER` | issuer stamped into credentials | `templespace` |
//! | `JWT_PRIVATE_KEY_PEM` | RSA private key, selects RS256 | unset |
//! | `JWT_PUBLIC_KEY_PEM` | RSA public key or X.509 certificate for it | unset |
//! | `JWT_KEY_ID` | `kid` advertised for the RSA key | unset |
//! | `JWT_SECRET` | HMAC secret, used when no private key is set | unset |
//! | `MAGIC_TTL_MIN` | magic-link lifetime in minutes | `10` |
//! | `ACCESS_TTL_MIN` | access credential lifetime in minutes | `60` |
//! | `REFRESH_TTL_HOUR` | refresh token lifetime in hours | `720` |
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//!
//! use templespace_authn::config::{AuthConfig, SigningConfig};
//!
//! let config = AuthConfig::builder()
//!     .signing(SigningConfig::SharedSecret { secret: "change-me".into() })
//!     .access_token_ttl(Duration::from_secs(15 * 60))
//!     .build()?;
//! assert_eq!(config.issuer(), "templespace");
//! # Ok::<(), templespace_authn::AuthError>(())
//! ```

use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};

use crate::error::{AuthError, Result};

/// Default issuer.
pub const DEFAULT_ISSUER: &str = "templespace";

/// Default magic-link lifetime (10 minutes).
pub const DEFAULT_MAGIC_LINK_TTL: Duration = Duration::from_secs(10 * 60);

/// Default access credential lifetime (60 minutes).
pub const DEFAULT_ACCESS_TOKEN_TTL: Duration = Duration::from_secs(60 * 60);

/// Default refresh token lifetime (720 hours).
pub const DEFAULT_REFRESH_TOKEN_TTL: Duration = Duration::from_secs(720 * 60 * 60);

/// How credentials are signed.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SigningConfig {
    /// HS256 with a shared secret.
    SharedSecret {
        /// The shared secret.
        secret: String,
    },
    /// RS256 with an RSA key pair.
    KeyPair {
        /// Private key, PKCS#1 or PKCS#8 PEM.
        private_key_pem: String,
        /// Public key, SPKI or PKCS#1 PEM. Derived from the private key when
        /// absent.
        #[serde(default)]
        public_key_pem: Option<String>,
        /// Key identifier advertised in headers and JWKS.
        #[serde(default)]
        key_id: Option<String>,
    },
}

impl fmt::Debug for SigningConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SharedSecret { .. } => {
                f.debug_struct("SharedSecret").field("secret", &"[redacted]").finish()
            },
            Self::KeyPair { public_key_pem, key_id, .. } => f
                .debug_struct("KeyPair")
                .field("private_key_pem", &"[redacted]")
                .field("public_key_pem", &public_key_pem.as_ref().map(|_| "[set]"))
                .field("key_id", key_id)
                .finish(),
        }
    }
}

/// Configuration for [`AuthService`](crate::AuthService).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// Issuer stamped into and required of credentials.
    #[serde(default = "default_issuer")]
    pub(crate) issuer: String,

    /// Magic-link lifetime.
    #[serde(with = "humantime_serde", default = "default_magic_link_ttl")]
    pub(crate) magic_link_ttl: Duration,

    /// Access credential lifetime.
    #[serde(with = "humantime_serde", default = "default_access_token_ttl")]
    pub(crate) access_token_ttl: Duration,

    /// Refresh token lifetime.
    #[serde(with = "humantime_serde", default = "default_refresh_token_ttl")]
    pub(crate) refresh_token_ttl: Duration,

    /// Signing mode and keys.
    pub(crate) signing: SigningConfig,
}

fn default_issuer() -> String {
    DEFAULT_ISSUER.to_owned()
}

fn default_magic_link_ttl() -> Duration {
    DEFAULT_MAGIC_LINK_TTL
}

fn default_access_token_ttl() -> Duration {
    DEFAULT_ACCESS_TOKEN_TTL
}

fn default_refresh_token_ttl() -> Duration {
    DEFAULT_REFRESH_TOKEN_TTL
}

#[bon::bon]
impl AuthConfig {
    /// Creates a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] if [`validate`](Self::validate) fails.
    #[builder]
    pub fn new(
        #[builder(into, default = DEFAULT_ISSUER.to_owned())] issuer: String,
        #[builder(default = DEFAULT_MAGIC_LINK_TTL)] magic_link_ttl: Duration,
        #[builder(default = DEFAULT_ACCESS_TOKEN_TTL)] access_token_ttl: Duration,
        #[builder(default = DEFAULT_REFRESH_TOKEN_TTL)] refresh_token_ttl: Duration,
        signing: SigningConfig,
    ) -> Result<Self> {
        let config = Self { issuer, magic_link_ttl, access_token_ttl, refresh_token_ttl, signing };
        config.validate()?;
        Ok(config)
    }

    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] if neither `JWT_PRIVATE_KEY_PEM` nor
    /// `JWT_SECRET` is set, a TTL variable is not a positive integer, or the
    /// result fails validation.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through `lookup`, which maps a variable name
    /// to its value. Empty values count as unset.
    ///
    /// # Errors
    ///
    /// Same as [`from_env`](Self::from_env).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let signing = if let Some(private_key_pem) = var("JWT_PRIVATE_KEY_PEM") {
            SigningConfig::KeyPair {
                private_key_pem,
                public_key_pem: var("JWT_PUBLIC_KEY_PEM"),
                key_id: var("JWT_KEY_ID"),
            }
        } else if let Some(secret) = var("JWT_SECRET") {
            SigningConfig::SharedSecret { secret }
        } else {
            return Err(AuthError::config("either JWT_PRIVATE_KEY_PEM or JWT_SECRET must be set"));
        };

        let config = Self {
            issuer: var("JWT_ISSUER").unwrap_or_else(default_issuer),
            magic_link_ttl: duration_var(var("MAGIC_TTL_MIN"), "MAGIC_TTL_MIN", 60)?
                .unwrap_or(DEFAULT_MAGIC_LINK_TTL),
            access_token_ttl: duration_var(var("ACCESS_TTL_MIN"), "ACCESS_TTL_MIN", 60)?
                .unwrap_or(DEFAULT_ACCESS_TOKEN_TTL),
            refresh_token_ttl: duration_var(var("REFRESH_TTL_HOUR"), "REFRESH_TTL_HOUR", 3600)?
                .unwrap_or(DEFAULT_REFRESH_TOKEN_TTL),
            signing,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks the configuration for values the service cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] if the issuer is empty, any TTL is zero,
    /// or the signing secret or private key is empty.
    pub fn validate(&self) -> Result<()> {
        if self.issuer.trim().is_empty() {
            return Err(AuthError::config("issuer cannot be empty"));
        }

        for (name, ttl) in [
            ("magic_link_ttl", self.magic_link_ttl),
            ("access_token_ttl", self.access_token_ttl),
            ("refresh_token_ttl", self.refresh_token_ttl),
        ] {
            if ttl.is_zero() {
                return Err(AuthError::config(format!("{name} must be greater than zero")));
            }
        }

        match &self.signing {
            SigningConfig::SharedSecret { secret } if secret.is_empty() => {
                Err(AuthError::config("shared secret cannot be empty"))
            },
            SigningConfig::KeyPair { private_key_pem, .. } if private_key_pem.trim().is_empty() => {
                Err(AuthError::config("private key cannot be empty"))
            },
            _ => Ok(()),
        }
    }

    /// Returns the issuer.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Returns the magic-link lifetime.
    #[must_use]
    pub fn magic_link_ttl(&self) -> Duration {
        self.magic_link_ttl
    }

    /// Returns the access credential lifetime.
    #[must_use]
    pub fn access_token_ttl(&self) -> Duration {
        self.access_token_ttl
    }

    /// Returns the refresh token lifetime.
    #[must_use]
    pub fn refresh_token_ttl(&self) -> Duration {
        self.refresh_token_ttl
    }

    /// Returns the signing configuration.
    #[must_use]
    pub fn signing(&self) -> &SigningConfig {
        &self.signing
    }
}

/// Parses a whole number of units into a duration of `unit_secs` each.
fn duration_var(value: Option<String>, name: &str, unit_secs: u64) -> Result<Option<Duration>> {
    let Some(value) = value else {
        return Ok(None);
    };
    let units: u64 = value
        .trim()
        .parse()
        .map_err(|e| AuthError::config(format!("{name} must be a whole number: {e}")))?;
    let secs = units
        .checked_mul(unit_secs)
        .ok_or_else(|| AuthError::config(format!("{name} is too large")))?;
    Ok(Some(Duration::from_secs(secs)))
}
