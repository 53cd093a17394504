//! Role to scope resolution.
//!
//! Users carry one coarse role; credentials carry the fine-grained scopes the
//! role resolves to. A scope ending in `*` grants the whole family sharing
//! its prefix, so `booking:*` grants `booking:create` and `booking:cancel`.

use std::{fmt, str::FromStr};

use crate::error::AuthError;

/// Scopes granted to the `user` role.
pub const USER_SCOPES: &[&str] = &["profile:read", "booking:create", "booking:read"];

/// Scopes granted to the `admin` role.
pub const ADMIN_SCOPES: &[&str] = &[
    "profile:read",
    "profile:write",
    "booking:create",
    "booking:read",
    "booking:*",
    "space:*",
    "admin:*",
];

/// Coarse roles known to the service.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Role {
    /// Regular user. Assigned to every newly provisioned identity.
    #[default]
    User,
    /// Operator with access to the whole catalog.
    Admin,
}

impl Role {
    /// Role label as stored in user records.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }

    /// Scopes this role grants, in table order.
    #[must_use]
    pub fn scopes(self) -> &'static [&'static str] {
        match self {
            Self::User => USER_SCOPES,
            Self::Admin => ADMIN_SCOPES,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            other => Err(AuthError::config(format!("unknown role '{other}'"))),
        }
    }
}

/// Resolves a role label to its scopes.
///
/// Unknown labels resolve to no scopes, so a corrupted or future role never
/// grants anything.
///
/// # Examples
///
/// ```
/// use templespace_authn::rbac::scopes_for;
///
/// assert_eq!(scopes_for("user"), vec!["profile:read", "booking:create", "booking:read"]);
/// assert!(scopes_for("superuser").is_empty());
/// ```
#[must_use]
pub fn scopes_for(role: &str) -> Vec<String> {
    role.parse::<Role>()
        .map(|role| role.scopes().iter().map(|s| (*s).to_owned()).collect())
        .unwrap_or_default()
}

/// Returns `true` if the `granted` scope covers `required`.
#[must_use]
pub fn scope_grants(granted: &str, required: &str) -> bool {
    match granted.strip_suffix('*') {
        Some(prefix) => required.starts_with(prefix),
        None => granted == required,
    }
}

/// Returns `true` if any scope in `granted` covers `required`.
#[must_use]
pub fn has_scope<S: AsRef<str>>(granted: &[S], required: &str) -> bool {
    granted.iter().any(|g| scope_grants(g.as_ref(), required))
}
