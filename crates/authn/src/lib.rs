//! # Templespace Authentication
//!
//! Passwordless login for Templespace services.
//!
//! This crate provides:
//! - **Magic links**: single-use, short-lived tokens proving control of an
//!   email address ([`AuthService::start_login`])
//! - **Session credentials**: a signed access credential plus an opaque
//!   refresh token, issued when a magic link is redeemed
//!   ([`AuthService::verify_magic_token`])
//! - **Verification**: the check downstream services run on every request
//!   ([`CredentialCodec::verify_access_token`]), and the JWKS they need to run
//!   it themselves ([`CredentialCodec::public_keys`])
//!
//! ## Signing modes
//!
//! - RS256 with an RSA key pair (PKCS#1 or PKCS#8 PEM); the public key is
//!   published as a JWKS
//! - HS256 with a shared secret; nothing is published
//!
//! Exactly one mode is active per service instance, chosen at construction.
//! Credentials declaring any other algorithm are rejected.
//!
//! ## Example
//!
//! ```
//! use templespace_authn::{AuthService, CredentialCodec, KeyMaterial};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let codec = CredentialCodec::new("templespace", KeyMaterial::symmetric(b"secret".to_vec())?);
//! let service = AuthService::builder().codec(codec).build()?;
//!
//! // Deliver `magic` to the user out of band, then redeem it.
//! let magic = service.start_login("a@example.com").await?;
//! let tokens = service.verify_magic_token(&magic).await?;
//!
//! let identity = service.verify_access_token(&tokens.access_token)?;
//! assert!(identity.has_scope("booking:create"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - **`testutil`**: Enables the `testutil` module with fixture keys and
//!   credential-crafting helpers.

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Credential claims and the verified access identity.
pub mod claims;
/// Credential signing and verification.
pub mod codec;
/// Service configuration.
pub mod config;
/// Authentication error types.
pub mod error;
/// Identity lookup and provisioning at login.
pub mod identity;
/// JSON Web Key Set publication.
pub mod jwks;
/// Signing key material.
pub mod keys;
/// Role to scope resolution.
pub mod rbac;
/// The login flow.
pub mod service;
#[cfg(any(test, feature = "testutil"))]
pub mod testutil;
/// Credential header algorithm checks.
pub mod validation;

// Re-export key types for convenience
pub use claims::{AccessIdentity, Claims};
pub use codec::CredentialCodec;
pub use config::{AuthConfig, SigningConfig};
pub use error::{AuthError, Result};
pub use identity::{IdentityResolver, ResolvedIdentity};
pub use jwks::{Jwk, JwkSet};
pub use keys::{KeyMaterial, RsaKeyPair, SigningAlgorithm};
pub use rbac::{Role, has_scope, scopes_for};
pub use service::{AuthService, LoginTokens};
pub use validation::validate_algorithm;
