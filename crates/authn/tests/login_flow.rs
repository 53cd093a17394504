//! End-to-end tests for the magic-link login flow.
//!
//! Covers issuance, redemption, single consumption under concurrency, magic
//! link expiry, identity provisioning, and verification by a downstream
//! service that only sees the published key set.
#![allow(clippy::expect_used, clippy::panic)]

use std::{sync::Arc, time::Duration};

use templespace_authn::{
    AuthService, CredentialCodec, JwkSet, assert_auth_error,
    error::AuthError,
    keys::parse_rsa_public_key_pem,
    rbac::{ADMIN_SCOPES, USER_SCOPES},
    testutil::{RSA_PUBLIC_KEY_PEM, hs256_codec, rs256_codec},
};
use templespace_storage::{
    Email, EphemeralStore, MagicLinkStore, MemoryUserStore, RefreshTokenStore, User, UserId,
    UserStore, testutil::FailingUserStore,
};
use tokio::task::JoinSet;

fn service_with(codec: CredentialCodec) -> AuthService {
    AuthService::builder().codec(codec).build().expect("valid service")
}

// ---------------------------------------------------------------------------
// Happy path
// ---------------------------------------------------------------------------

#[tokio::test]
async fn login_issues_user_credentials() {
    let service = service_with(rs256_codec(Some("key-1")));

    let magic = service.start_login("a@example.com").await.expect("start login");
    let tokens = service.verify_magic_token(&magic).await.expect("redeem");

    assert_eq!(tokens.expires_in, 3600, "default access lifetime is one hour");

    let identity = service.verify_access_token(&tokens.access_token).expect("verify");
    assert_eq!(identity.user_id, UserId::from("a@example.com"));
    assert_eq!(identity.email, Some(Email::from("a@example.com")));
    assert_eq!(identity.scopes, USER_SCOPES);
    assert!(identity.has_scope("booking:create"));
    assert!(!identity.has_scope("space:create"));
}

#[tokio::test]
async fn second_redemption_fails() {
    let service = service_with(hs256_codec());

    let magic = service.start_login("a@example.com").await.expect("start login");
    service.verify_magic_token(&magic).await.expect("first redemption");

    let second = service.verify_magic_token(&magic).await;
    assert_auth_error!(second, TokenNotFound);
    assert_eq!(
        second.expect_err("rejected").client_message(),
        "invalid or expired token"
    );
}

#[tokio::test]
async fn each_login_gets_distinct_tokens() {
    let service = service_with(hs256_codec());

    let first = service.start_login("a@example.com").await.expect("start login");
    let second = service.start_login("a@example.com").await.expect("start login");
    assert_ne!(first, second);

    // Both outstanding links are independently redeemable.
    let a = service.verify_magic_token(&first).await.expect("redeem first");
    let b = service.verify_magic_token(&second).await.expect("redeem second");
    assert_ne!(a.refresh_token, b.refresh_token);
}

// ---------------------------------------------------------------------------
// Concurrent redemption
// ---------------------------------------------------------------------------

/// Racing redeemers of one magic token: exactly one wins, all others see
/// `TokenNotFound`.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_redemption_has_exactly_one_winner() {
    const RACERS: usize = 16;

    for round in 0..20 {
        let service = Arc::new(service_with(hs256_codec()));
        let magic = service.start_login(format!("user{round}@example.com")).await.expect("start");

        let mut set = JoinSet::new();
        for _ in 0..RACERS {
            let service = Arc::clone(&service);
            let magic = magic.clone();
            set.spawn(async move { service.verify_magic_token(&magic).await });
        }

        let mut winners = 0;
        let mut not_found = 0;
        while let Some(result) = set.join_next().await {
            match result.expect("task should not panic") {
                Ok(_) => winners += 1,
                Err(AuthError::TokenNotFound) => not_found += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }

        assert_eq!(winners, 1, "round {round}: exactly one redemption should succeed");
        assert_eq!(not_found, RACERS - 1, "round {round}");
    }
}

// ---------------------------------------------------------------------------
// Expiry
// ---------------------------------------------------------------------------

#[tokio::test]
async fn expired_magic_link_cannot_be_redeemed() {
    let magic_links = Arc::new(MagicLinkStore::new());
    let service = AuthService::builder()
        .codec(hs256_codec())
        .magic_links(magic_links.clone())
        .magic_link_ttl(Duration::from_millis(50))
        .build()
        .expect("valid service");

    let magic = service.start_login("a@example.com").await.expect("start login");
    tokio::time::sleep(Duration::from_millis(150)).await;

    assert_auth_error!(service.verify_magic_token(&magic).await, TokenNotFound);
    assert!(magic_links.is_empty(), "expired link should be evicted by the lookup");
}

#[tokio::test]
async fn refresh_token_lives_for_refresh_ttl() {
    let refresh_tokens = Arc::new(RefreshTokenStore::new());
    let service = AuthService::builder()
        .codec(hs256_codec())
        .refresh_tokens(refresh_tokens.clone())
        .refresh_token_ttl(Duration::from_millis(50))
        .build()
        .expect("valid service");

    let magic = service.start_login("a@example.com").await.expect("start login");
    let tokens = service.verify_magic_token(&magic).await.expect("redeem");
    assert!(refresh_tokens.get(&tokens.refresh_token).await.expect("get").is_some());

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(refresh_tokens.get(&tokens.refresh_token).await.expect("get"), None);
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

#[tokio::test]
async fn first_login_provisions_user() {
    let users = Arc::new(MemoryUserStore::new());
    let service = AuthService::builder()
        .codec(hs256_codec())
        .users(users.clone())
        .build()
        .expect("valid service");

    let magic = service.start_login("new@example.com").await.expect("start login");
    service.verify_magic_token(&magic).await.expect("redeem");

    let user = users
        .find_by_email(&Email::from("new@example.com"))
        .await
        .expect("lookup")
        .expect("user should be provisioned");
    assert_eq!(user.id, UserId::from("new@example.com"));
    assert_eq!(user.role, "user");
}

#[tokio::test]
async fn stored_admin_gets_admin_scopes() {
    let users = Arc::new(MemoryUserStore::new());
    users.upsert(&User::new("u-100", "ops@example.com", "admin")).await.expect("seed");
    let service = AuthService::builder()
        .codec(hs256_codec())
        .users(users)
        .build()
        .expect("valid service");

    let magic = service.start_login("ops@example.com").await.expect("start login");
    let tokens = service.verify_magic_token(&magic).await.expect("redeem");

    let identity = service.verify_access_token(&tokens.access_token).expect("verify");
    assert_eq!(identity.user_id, UserId::from("u-100"));
    assert_eq!(identity.scopes, ADMIN_SCOPES);
    assert!(identity.has_scope("space:create"));
}

#[tokio::test]
async fn unknown_stored_role_grants_nothing() {
    let users = Arc::new(MemoryUserStore::new());
    users.upsert(&User::new("u-7", "odd@example.com", "superuser")).await.expect("seed");
    let service = AuthService::builder()
        .codec(hs256_codec())
        .users(users)
        .build()
        .expect("valid service");

    let magic = service.start_login("odd@example.com").await.expect("start login");
    let tokens = service.verify_magic_token(&magic).await.expect("redeem");

    let identity = service.verify_access_token(&tokens.access_token).expect("verify");
    assert!(identity.scopes.is_empty());
}

#[tokio::test]
async fn unavailable_user_store_does_not_block_login() {
    let users = Arc::new(FailingUserStore::unavailable());
    let service = AuthService::builder()
        .codec(hs256_codec())
        .users(users)
        .build()
        .expect("valid service");

    let magic = service.start_login("a@example.com").await.expect("start login");
    let tokens = service.verify_magic_token(&magic).await.expect("login must still succeed");

    let identity = service.verify_access_token(&tokens.access_token).expect("verify");
    assert_eq!(identity.user_id, UserId::from("a@example.com"));
    assert_eq!(identity.scopes, USER_SCOPES);
}

// ---------------------------------------------------------------------------
// Downstream verification
// ---------------------------------------------------------------------------

/// A downstream service that only has the published key set can verify
/// credentials with an off-the-shelf JWT library.
#[tokio::test]
async fn published_jwks_verifies_issued_credentials() {
    use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};

    let service = service_with(rs256_codec(Some("key-1")));
    let magic = service.start_login("a@example.com").await.expect("start login");
    let tokens = service.verify_magic_token(&magic).await.expect("redeem");

    let json = serde_json::to_string(&service.public_keys()).expect("serialize jwks");
    let jwks: JwkSet = serde_json::from_str(&json).expect("parse jwks");
    let jwk = jwks.find("key-1").expect("key published under its kid");

    let key = DecodingKey::from_rsa_components(&jwk.n, &jwk.e).expect("decoding key");
    let mut validation = Validation::new(Algorithm::RS256);
    validation.set_issuer(&[service.codec().issuer()]);
    let data = decode::<serde_json::Value>(&tokens.access_token, &key, &validation)
        .expect("credential verifies against published key");

    assert_eq!(data.header.kid.as_deref(), Some("key-1"));
    assert_eq!(data.claims["email"], "a@example.com");
}

#[test]
fn published_key_matches_configured_public_key() {
    use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
    use rsa::traits::PublicKeyParts;

    let codec = rs256_codec(None);
    let jwks = codec.public_keys();
    let expected = parse_rsa_public_key_pem(RSA_PUBLIC_KEY_PEM).expect("fixture public key");

    assert_eq!(jwks.keys[0].n, URL_SAFE_NO_PAD.encode(expected.n().to_bytes_be()));
    assert_eq!(jwks.keys[0].kid, None);
}

#[test]
fn shared_secret_mode_publishes_nothing() {
    let service = service_with(hs256_codec());
    assert!(service.public_keys().keys.is_empty());
}

#[tokio::test]
async fn access_credential_from_other_deployment_rejected() {
    let ours = service_with(rs256_codec(None));
    let theirs = service_with(hs256_codec());

    let magic = theirs.start_login("a@example.com").await.expect("start login");
    let tokens = theirs.verify_magic_token(&magic).await.expect("redeem");

    let result = ours.verify_access_token(&tokens.access_token);
    assert_auth_error!(result, SignatureInvalid);
}
