//! Credential claims.
//!
//! Access credentials carry the following payload:
//!
//! ```json
//! {
//!   "iss": "templespace",
//!   "sub": "a@example.com",
//!   "iat": 1700000000,
//!   "exp": 1700003600,
//!   "scopes": ["profile:read", "booking:create", "booking:read"],
//!   "uid": "a@example.com",
//!   "email": "a@example.com"
//! }
//! ```

use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use templespace_storage::{Email, UserId};

use crate::rbac::has_scope;

/// Claims carried by a signed credential.
///
/// Field order is the serialization order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Issuer. Overwritten with the service issuer when signing.
    #[serde(default)]
    pub iss: String,
    /// Subject (user identifier).
    #[serde(default)]
    pub sub: String,
    /// Audience (optional).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
    /// Issued at (seconds since epoch). Zero means "stamp at signing".
    #[serde(default)]
    pub iat: i64,
    /// Expiration time (seconds since epoch).
    pub exp: i64,
    /// Granted scopes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<String>,
    /// User identifier, when it differs from or supplements `sub`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    /// Email address the user logged in with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Claims {
    /// Builds access-credential claims for a user, valid for `ttl` from now.
    ///
    /// `exp` is always strictly after `iat`.
    #[must_use]
    pub fn for_user(user_id: &UserId, email: &Email, scopes: Vec<String>, ttl: Duration) -> Self {
        let now = Utc::now().timestamp();
        let lifetime = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX).max(1);
        Self {
            iss: String::new(),
            sub: user_id.to_string(),
            aud: None,
            iat: now,
            exp: now.saturating_add(lifetime),
            scopes,
            uid: Some(user_id.to_string()),
            email: Some(email.to_string()),
        }
    }

    /// Returns `true` if `now` (seconds since epoch) is past the expiry.
    ///
    /// A credential is still valid during the second it expires in.
    #[must_use]
    pub fn is_expired_at(&self, now: i64) -> bool {
        now > self.exp
    }
}

/// The identity a verified access credential speaks for.
///
/// This is the whole contract offered to downstream services: who the caller
/// is and what they may do.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessIdentity {
    /// User identifier (`uid`, falling back to `sub`).
    pub user_id: UserId,
    /// Email, if the credential carries one.
    pub email: Option<Email>,
    /// Granted scopes.
    pub scopes: Vec<String>,
}

impl AccessIdentity {
    /// Returns `true` if any granted scope covers `required`.
    #[must_use]
    pub fn has_scope(&self, required: &str) -> bool {
        has_scope(&self.scopes, required)
    }
}

impl From<Claims> for AccessIdentity {
    fn from(claims: Claims) -> Self {
        let user_id = claims.uid.filter(|uid| !uid.is_empty()).unwrap_or(claims.sub);
        Self {
            user_id: UserId::from(user_id),
            email: claims.email.map(Email::from),
            scopes: claims.scopes,
        }
    }
}
