//! Credential header algorithm checks.
//!
//! The verifier never lets a credential choose how it is verified: the
//! signature is always checked with the service's own algorithm, and a header
//! that declares anything else is rejected outright. This closes the classic
//! `alg: none` and RS256-to-HS256 confusion attacks.

use crate::{error::AuthError, keys::SigningAlgorithm};

/// Algorithms that are never accepted, whatever the configured mode.
pub const FORBIDDEN_ALGORITHMS: &[&str] = &["none", "None", "NONE", ""];

/// Algorithms the service can be configured with.
pub const ACCEPTED_ALGORITHMS: &[&str] = &["HS256", "RS256"];

/// Checks the `alg` declared in a credential header against the active
/// algorithm.
///
/// # Errors
///
/// Returns [`AuthError::SignatureInvalid`] if the declared algorithm is
/// forbidden or differs from `active`.
///
/// # Examples
///
/// ```
/// use templespace_authn::{keys::SigningAlgorithm, validation::validate_algorithm};
///
/// assert!(validate_algorithm("RS256", SigningAlgorithm::Rs256).is_ok());
/// assert!(validate_algorithm("HS256", SigningAlgorithm::Rs256).is_err());
/// assert!(validate_algorithm("none", SigningAlgorithm::Hs256).is_err());
/// ```
pub fn validate_algorithm(declared: &str, active: SigningAlgorithm) -> Result<(), AuthError> {
    if FORBIDDEN_ALGORITHMS.contains(&declared) {
        tracing::warn!(alg = declared, "Rejected credential with forbidden algorithm");
        return Err(AuthError::SignatureInvalid);
    }

    if declared != active.as_str() {
        tracing::warn!(
            alg = declared,
            expected = active.as_str(),
            "Rejected credential with unexpected algorithm"
        );
        return Err(AuthError::SignatureInvalid);
    }

    Ok(())
}
