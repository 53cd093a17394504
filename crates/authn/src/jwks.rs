//! JSON Web Key Set publication.
//!
//! External verifiers fetch the service's public key in the standard JWKS
//! shape and check RS256 credentials offline.

use serde::{Deserialize, Serialize};

use crate::keys::RsaKeyPair;

/// A single public RSA key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type, always `RSA`.
    pub kty: String,
    /// Key identifier, if configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    /// Intended use, always `sig`.
    #[serde(rename = "use")]
    pub key_use: String,
    /// Algorithm, always `RS256`.
    pub alg: String,
    /// Modulus, unsigned big-endian, base64url without padding.
    pub n: String,
    /// Public exponent, unsigned big-endian, base64url without padding.
    pub e: String,
}

impl From<&RsaKeyPair> for Jwk {
    fn from(pair: &RsaKeyPair) -> Self {
        let (n, e) = pair.public_components();
        Self {
            kty: "RSA".to_owned(),
            kid: pair.key_id().map(str::to_owned),
            key_use: "sig".to_owned(),
            alg: "RS256".to_owned(),
            n,
            e,
        }
    }
}

/// A set of public keys. Empty when the service signs with a shared secret.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwkSet {
    /// Published keys.
    pub keys: Vec<Jwk>,
}

impl JwkSet {
    /// Finds a key by identifier.
    #[must_use]
    pub fn find(&self, kid: &str) -> Option<&Jwk> {
        self.keys.iter().find(|k| k.kid.as_deref() == Some(kid))
    }

    /// Returns `true` if no keys are published.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
