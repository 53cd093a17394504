//! Shared test utilities for authentication testing.
//!
//! This module provides fixture RSA keys, ready-made codecs and services,
//! and helpers for crafting raw credentials (for attack testing). It is
//! feature-gated behind `testutil` to prevent leaking into production builds.
//!
//! # Usage
//!
//! In integration tests, enable the feature in `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! templespace-authn = { path = "../authn", features = ["testutil"] }
//! ```
//!
//! Then import helpers:
//!
//! ```no_run
//! // Requires the `testutil` feature to be enabled.
//! use templespace_authn::testutil::{hs256_codec, craft_raw_token};
//! ```

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::{
    codec::CredentialCodec,
    keys::{KeyMaterial, RsaKeyPair},
};

/// 2048-bit RSA private key, PKCS#1 PEM.
pub const RSA_PRIVATE_KEY_PKCS1_PEM: &str = include_str!("../testdata/rsa_pkcs1.pem");

/// The same key as [`RSA_PRIVATE_KEY_PKCS1_PEM`], PKCS#8 PEM.
pub const RSA_PRIVATE_KEY_PKCS8_PEM: &str = include_str!("../testdata/rsa_pkcs8.pem");

/// Public half of [`RSA_PRIVATE_KEY_PKCS1_PEM`], SPKI PEM.
pub const RSA_PUBLIC_KEY_PEM: &str = include_str!("../testdata/rsa_public.pem");

/// An unrelated 2048-bit RSA private key, PKCS#1 PEM.
pub const OTHER_RSA_PRIVATE_KEY_PEM: &str = include_str!("../testdata/other_rsa.pem");

/// Public half of [`OTHER_RSA_PRIVATE_KEY_PEM`], SPKI PEM.
pub const OTHER_RSA_PUBLIC_KEY_PEM: &str = include_str!("../testdata/other_rsa_public.pem");

/// Self-signed X.509 certificate for [`RSA_PRIVATE_KEY_PKCS1_PEM`].
pub const RSA_CERTIFICATE_PEM: &str = include_str!("../testdata/rsa_cert.pem");

/// A P-256 private key, PKCS#8 PEM. Not usable for RS256.
pub const EC_PRIVATE_KEY_PEM: &str = include_str!("../testdata/ec_pkcs8.pem");

/// Self-signed X.509 certificate for [`EC_PRIVATE_KEY_PEM`].
pub const EC_CERTIFICATE_PEM: &str = include_str!("../testdata/ec_cert.pem");

/// Issuer used by the fixture codecs.
pub const TEST_ISSUER: &str = "templespace-test";

/// Shared secret used by [`hs256_codec`].
pub const TEST_SECRET: &[u8] = b"templespace-test-shared-secret-0123456789";

/// Creates an HS256 codec over [`TEST_SECRET`].
///
/// # Panics
///
/// Never, the fixture secret is non-empty.
pub fn hs256_codec() -> CredentialCodec {
    CredentialCodec::new(
        TEST_ISSUER,
        KeyMaterial::symmetric(TEST_SECRET.to_vec()).expect("fixture secret is non-empty"),
    )
}

/// Creates an RS256 codec over the fixture key pair.
///
/// # Panics
///
/// Panics if the fixture key fails to load.
pub fn rs256_codec(kid: Option<&str>) -> CredentialCodec {
    let pair = RsaKeyPair::from_pems(
        RSA_PRIVATE_KEY_PKCS1_PEM,
        RSA_PUBLIC_KEY_PEM,
        kid.map(str::to_owned),
    )
    .expect("fixture RSA key should load");
    CredentialCodec::new(TEST_ISSUER, pair.into())
}

/// Creates a raw credential from arbitrary header and payload JSON.
///
/// The result has the structure `{header_b64}.{payload_b64}.` with an empty
/// signature. Useful for testing rejection of unsigned and attack
/// credentials (e.g. `alg: "none"`).
///
/// # Panics
///
/// Panics if JSON serialization fails.
pub fn craft_raw_token(
    header_json: &serde_json::Value,
    payload_json: &serde_json::Value,
) -> String {
    let header_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(header_json).expect("header json"));
    let payload_b64 =
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(payload_json).expect("payload json"));
    format!("{header_b64}.{payload_b64}.")
}

/// HMAC-signs already-encoded header and payload segments.
///
/// Unlike [`CredentialCodec::sign`] this signs whatever it is given, so tests
/// can produce correctly signed credentials with hostile contents.
///
/// # Panics
///
/// Never, HMAC accepts keys of any length.
pub fn craft_hs256_token(secret: &[u8], header_b64: &str, payload_b64: &str) -> String {
    let signing_input = format!("{header_b64}.{payload_b64}");
    let mut mac = Hmac::<Sha256>::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(signing_input.as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
    format!("{signing_input}.{signature}")
}

/// Asserts that a [`Result<T, AuthError>`] is an `Err` matching the given
/// [`AuthError`] variant.
///
/// On failure, prints the expected variant and the actual result.
///
/// # Examples
///
/// ```no_run
/// // Requires the `testutil` feature to be enabled.
/// use templespace_authn::assert_auth_error;
/// use templespace_authn::error::AuthError;
///
/// let result: Result<(), AuthError> = Err(AuthError::Expired);
/// assert_auth_error!(result, Expired);
/// ```
///
/// [`AuthError`]: crate::error::AuthError
#[macro_export]
macro_rules! assert_auth_error {
    ($result:expr, $variant:ident) => {
        assert!(
            matches!($result, Err($crate::error::AuthError::$variant { .. })),
            "expected AuthError::{}, got: {:?}",
            stringify!($variant),
            $result,
        );
    };
    ($result:expr, $variant:ident, $msg:expr) => {
        assert!(
            matches!($result, Err($crate::error::AuthError::$variant { .. })),
            "{}: expected AuthError::{}, got: {:?}",
            $msg,
            stringify!($variant),
            $result,
        );
    };
}
