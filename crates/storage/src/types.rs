//! Typed values held by the stores.
//!
//! The magic-link store and the refresh-token store share one implementation
//! and differ only in what their values mean. Wrapping those values in
//! distinct newtypes makes it a compile-time error to bind a refresh token to
//! an email or a magic token to a user id.

/// Macro to define a newtype wrapper around `String` with standard trait
/// implementations.
///
/// Each generated type:
/// - Is a transparent wrapper around `String`
/// - Derives `Clone`, `Debug`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Derives `Serialize` and `Deserialize` (transparent)
/// - Implements `From<String>`, `From<&str>` and `Display`
macro_rules! define_string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord,
            serde::Serialize, serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Returns the inner value as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consumes the wrapper and returns the inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

define_string_id!(
    /// Email address a magic-link token was issued for.
    ///
    /// The auth layer performs no format validation; delivery and validation
    /// belong to the caller.
    ///
    /// # Examples
    ///
    /// ```
    /// use templespace_storage::Email;
    ///
    /// let email = Email::from("a@example.com");
    /// assert_eq!(email.as_str(), "a@example.com");
    /// ```
    Email
);

define_string_id!(
    /// Stable user identifier a refresh token is bound to.
    ///
    /// Newly provisioned users receive their email address as id.
    ///
    /// # Examples
    ///
    /// ```
    /// use templespace_storage::UserId;
    ///
    /// let id = UserId::from("user-42");
    /// assert_eq!(id.to_string(), "user-42");
    /// ```
    UserId
);
