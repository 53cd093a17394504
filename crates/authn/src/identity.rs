//! Identity resolution at login.
//!
//! Redeeming a magic link proves control of an email address; the
//! [`IdentityResolver`] turns that address into a user id and role. Unknown
//! addresses are provisioned on the spot with the least privileged role.
//!
//! Identity storage is best-effort on this path. A failed lookup or a failed
//! provisioning write is logged and login proceeds with the default identity,
//! so callers that need the user record to be durable must treat it as
//! eventually consistent.

use std::{fmt, sync::Arc};

use templespace_storage::{Email, User, UserId, UserStore};

use crate::rbac::Role;

/// The identity a login resolves to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedIdentity {
    /// User identifier used as credential subject.
    pub user_id: UserId,
    /// Email address the login was for.
    pub email: Email,
    /// Role label, resolved to scopes by [`crate::rbac::scopes_for`].
    pub role: String,
}

impl ResolvedIdentity {
    /// Identity for an address with no stored record: the email doubles as
    /// user id and the role is the least privileged one.
    #[must_use]
    pub fn provisional(email: &Email) -> Self {
        Self {
            user_id: UserId::from(email.as_str()),
            email: email.clone(),
            role: Role::default().as_str().to_owned(),
        }
    }
}

/// Looks up or provisions users by email.
#[derive(Clone, Default)]
pub struct IdentityResolver {
    users: Option<Arc<dyn UserStore>>,
}

impl fmt::Debug for IdentityResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityResolver").field("has_store", &self.users.is_some()).finish()
    }
}

impl IdentityResolver {
    /// Creates a resolver over `users`. Without a store every login resolves
    /// to the provisional identity.
    #[must_use]
    pub fn new(users: Option<Arc<dyn UserStore>>) -> Self {
        Self { users }
    }

    /// Resolves `email` to an identity. Never fails.
    #[tracing::instrument(skip_all)]
    pub async fn resolve(&self, email: &Email) -> ResolvedIdentity {
        let Some(users) = &self.users else {
            return ResolvedIdentity::provisional(email);
        };

        match users.find_by_email(email).await {
            Ok(Some(user)) => {
                let role = if user.role.is_empty() {
                    Role::default().as_str().to_owned()
                } else {
                    user.role
                };
                tracing::debug!(role = %role, "Resolved existing user");
                ResolvedIdentity { user_id: user.id, email: email.clone(), role }
            },
            Ok(None) => {
                let identity = ResolvedIdentity::provisional(email);
                let user =
                    User::new(identity.user_id.clone(), email.clone(), identity.role.clone());
                match users.upsert(&user).await {
                    Ok(()) => tracing::debug!("Provisioned new user"),
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to persist new user, continuing login");
                    },
                }
                identity
            },
            Err(e) => {
                tracing::warn!(error = %e, "User lookup failed, continuing with default identity");
                ResolvedIdentity::provisional(email)
            },
        }
    }
}
