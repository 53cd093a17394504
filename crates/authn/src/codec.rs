//! Credential signing and verification.
//!
//! A credential is three base64url segments without padding,
//! `header.payload.signature`, where the signature covers the exact bytes
//! `header.payload`. The [`CredentialCodec`] produces these with the active
//! [`KeyMaterial`] and verifies them in a fixed order:
//!
//! 1. the token has exactly three segments
//! 2. the signature recomputed over the first two segments matches
//! 3. header and payload decode, and the header declares the active algorithm
//! 4. the credential has not expired
//! 5. the issuer is this service
//!
//! Nothing from the header or payload is interpreted before the signature
//! has been checked.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//!
//! use templespace_authn::{Claims, CredentialCodec, KeyMaterial};
//! use templespace_storage::{Email, UserId};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let codec = CredentialCodec::new("templespace", KeyMaterial::symmetric(b"secret".to_vec())?);
//! let claims = Claims::for_user(
//!     &UserId::from("u-1"),
//!     &Email::from("a@example.com"),
//!     vec!["profile:read".to_owned()],
//!     Duration::from_secs(3600),
//! );
//!
//! let token = codec.sign(claims)?;
//! let identity = codec.verify_access_token(&token)?;
//! assert!(identity.has_scope("profile:read"));
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::{
    claims::{AccessIdentity, Claims},
    config::SigningConfig,
    error::{AuthError, Result},
    jwks::{Jwk, JwkSet},
    keys::{KeyMaterial, RsaKeyPair, SigningAlgorithm},
    validation::validate_algorithm,
};

type HmacSha256 = Hmac<Sha256>;

/// Credential header. Field order is the serialization order.
#[derive(Debug, Serialize, Deserialize)]
struct CredentialHeader {
    alg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    typ: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    kid: Option<String>,
}

/// Signs and verifies credentials for one issuer with one key.
///
/// The codec is immutable; rotating keys means building a new codec.
#[derive(Clone, Debug)]
pub struct CredentialCodec {
    issuer: String,
    keys: KeyMaterial,
}

impl CredentialCodec {
    /// Creates a codec signing as `issuer` with `keys`.
    pub fn new(issuer: impl Into<String>, keys: KeyMaterial) -> Self {
        Self { issuer: issuer.into(), keys }
    }

    /// Loads key material described by `signing` and creates a codec.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidKey`] if the configured keys cannot be
    /// loaded.
    pub fn from_config(signing: &SigningConfig, issuer: &str) -> Result<Self> {
        let keys = match signing {
            SigningConfig::SharedSecret { secret } => {
                KeyMaterial::symmetric(secret.as_bytes().to_vec())?
            },
            SigningConfig::KeyPair {
                private_key_pem,
                public_key_pem: Some(public_pem),
                key_id,
            } => {
                RsaKeyPair::from_pems(private_key_pem, public_pem, key_id.clone())?.into()
            },
            SigningConfig::KeyPair { private_key_pem, public_key_pem: None, key_id } => {
                RsaKeyPair::from_private_pem(private_key_pem, key_id.clone())?.into()
            },
        };
        Ok(Self::new(issuer, keys))
    }

    /// Issuer stamped into and required of every credential.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Algorithm credentials are signed with.
    #[must_use]
    pub fn algorithm(&self) -> SigningAlgorithm {
        self.keys.algorithm()
    }

    /// Signs `claims` into a credential.
    ///
    /// `iss` is replaced with this codec's issuer, and `iat` is stamped with
    /// the current time when zero.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::SigningFailure`] if serialization or signing
    /// fails.
    #[tracing::instrument(skip_all, fields(alg = %self.keys.algorithm()))]
    pub fn sign(&self, mut claims: Claims) -> Result<String> {
        claims.iss.clone_from(&self.issuer);
        if claims.iat == 0 {
            claims.iat = Utc::now().timestamp();
        }

        let header = CredentialHeader {
            alg: self.keys.algorithm().as_str().to_owned(),
            typ: Some("JWT".to_owned()),
            kid: self.keys.key_id().map(str::to_owned),
        };

        let header_json = serde_json::to_vec(&header)
            .map_err(|e| AuthError::signing_failure(format!("failed to serialize header: {e}")))?;
        let payload_json = serde_json::to_vec(&claims)
            .map_err(|e| AuthError::signing_failure(format!("failed to serialize claims: {e}")))?;

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header_json),
            URL_SAFE_NO_PAD.encode(payload_json)
        );

        let signature = match &self.keys {
            KeyMaterial::Symmetric { secret } => {
                URL_SAFE_NO_PAD.encode(hmac_sha256(secret, signing_input.as_bytes())?)
            },
            KeyMaterial::Asymmetric(pair) => pair.sign(signing_input.as_bytes())?,
        };

        Ok(format!("{signing_input}.{signature}"))
    }

    /// Verifies a credential and returns its claims.
    ///
    /// # Errors
    ///
    /// - [`AuthError::MalformedToken`] if the token is not three decodable
    ///   segments
    /// - [`AuthError::SignatureInvalid`] if the signature does not match or
    ///   the header declares a different algorithm
    /// - [`AuthError::Expired`] if the current time is past `exp`
    /// - [`AuthError::IssuerMismatch`] if `iss` is not this codec's issuer
    #[tracing::instrument(skip_all, fields(alg = %self.keys.algorithm()))]
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let mut segments = token.split('.');
        let (Some(header_b64), Some(payload_b64), Some(signature_b64), None) =
            (segments.next(), segments.next(), segments.next(), segments.next())
        else {
            return Err(AuthError::malformed("credential must have 3 segments"));
        };

        let signing_input = &token[..header_b64.len() + 1 + payload_b64.len()];
        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|e| AuthError::malformed(format!("failed to decode signature: {e}")))?;

        let signature_matches = match &self.keys {
            KeyMaterial::Symmetric { secret } => {
                let expected = hmac_sha256(secret, signing_input.as_bytes())?;
                bool::from(expected.as_slice().ct_eq(signature.as_slice()))
            },
            KeyMaterial::Asymmetric(pair) => pair.verify(signature_b64, signing_input.as_bytes())?,
        };
        if !signature_matches {
            return Err(AuthError::SignatureInvalid);
        }

        let header: CredentialHeader = decode_segment(header_b64, "header")?;
        validate_algorithm(&header.alg, self.keys.algorithm())?;

        let claims: Claims = decode_segment(payload_b64, "payload")?;

        if claims.is_expired_at(Utc::now().timestamp()) {
            return Err(AuthError::Expired);
        }

        if claims.iss != self.issuer {
            return Err(AuthError::issuer_mismatch(&self.issuer, &claims.iss));
        }

        Ok(claims)
    }

    /// Verifies an access credential and returns who it speaks for.
    ///
    /// This is the check downstream services run on every request.
    ///
    /// # Errors
    ///
    /// Same as [`verify`](Self::verify).
    pub fn verify_access_token(&self, token: &str) -> Result<AccessIdentity> {
        let claims = self.verify(token).inspect_err(|e| {
            tracing::warn!(error = %e, "Access credential rejected");
        })?;
        Ok(AccessIdentity::from(claims))
    }

    /// Public keys external verifiers need, empty for a shared secret.
    #[must_use]
    pub fn public_keys(&self) -> JwkSet {
        match &self.keys {
            KeyMaterial::Symmetric { .. } => JwkSet::default(),
            KeyMaterial::Asymmetric(pair) => JwkSet { keys: vec![Jwk::from(pair)] },
        }
    }
}

fn hmac_sha256(secret: &[u8], message: &[u8]) -> Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| AuthError::signing_failure(format!("invalid HMAC key: {e}")))?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn decode_segment<T: DeserializeOwned>(segment: &str, what: &str) -> Result<T> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| AuthError::malformed(format!("failed to decode {what}: {e}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| AuthError::malformed(format!("failed to parse {what}: {e}")))
}
