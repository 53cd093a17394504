//! Fuzz target for credential verification.
//!
//! Feeds arbitrary byte strings as credentials to both signing modes. Every
//! result must be an `Err(AuthError)`: a credential the fuzzer did not sign
//! must never verify, and no input may panic.

#![no_main]

use libfuzzer_sys::fuzz_target;
use templespace_authn::testutil::{hs256_codec, rs256_codec};

fuzz_target!(|data: &[u8]| {
    // Only process valid UTF-8, credentials are always strings
    let Ok(token) = std::str::from_utf8(data) else {
        return;
    };

    assert!(hs256_codec().verify(token).is_err(), "forged HS256 credential verified");
    assert!(rs256_codec(Some("fuzz")).verify(token).is_err(), "forged RS256 credential verified");

    // The downstream contract must reject just the same
    let _ = hs256_codec().verify_access_token(token);
});
