//! Token verification against a real `tokens` table (in-memory SQLite).

use std::sync::Arc;

use hiscore_api::auth::{Permission, PermissionRegistry, TokenVerifier};
use hiscore_api::errors::VerifyError;
use hiscore_api::models::token::{NewToken, TokenGrant};
use hiscore_api::store::tokens::TokenRepository;
use hiscore_api::store::{schema, Params, QueryExecutor, StoreConfig};
use tokio_test::{assert_err, assert_ok};

async fn setup() -> (QueryExecutor, TokenVerifier) {
    let mut config = StoreConfig::new("sqlite::memory:");
    config.max_connections = 1;
    let executor = QueryExecutor::connect(&config).await.unwrap();
    schema::ensure(&executor).await.unwrap();

    // abc may verify bans but not request hiscores.
    executor
        .execute(
            "INSERT INTO tokens (token, request_highscores, verify_ban) VALUES (:token, 0, 1)",
            Params::new().with("token", "abc"),
        )
        .await
        .unwrap();

    let verifier = TokenVerifier::new(executor.clone(), Arc::new(PermissionRegistry::standard()));
    (executor, verifier)
}

fn assert_denied(result: Result<bool, VerifyError>, permission: &str) {
    match result {
        Err(VerifyError::PermissionDenied { permission: p }) => assert_eq!(p, permission),
        other => panic!("expected PermissionDenied, got {:?}", other),
    }
}

#[tokio::test]
async fn test_granted_flag_passes() {
    let (_, verifier) = setup().await;
    let granted = assert_ok!(verifier.verify("abc", "ban").await);
    assert!(granted);
}

#[tokio::test]
async fn test_unset_flag_is_denied() {
    let (_, verifier) = setup().await;
    assert_denied(verifier.verify("abc", "hiscore").await, "hiscore");
}

#[tokio::test]
async fn test_unknown_token_is_denied() {
    let (_, verifier) = setup().await;
    assert_denied(verifier.verify("missing", "ban").await, "ban");
}

#[tokio::test]
async fn test_empty_token_is_denied() {
    let (_, verifier) = setup().await;
    assert_err!(verifier.verify("", "hiscore").await);
}

#[tokio::test]
async fn test_unknown_permission_is_denied_even_for_valid_token() {
    let (_, verifier) = setup().await;
    assert_denied(verifier.verify("abc", "superuser").await, "superuser");
}

#[tokio::test]
async fn test_denial_message_names_the_permission() {
    let (_, verifier) = setup().await;
    let err = verifier.verify("abc", "hiscore").await.unwrap_err();
    assert_eq!(err.to_string(), "insufficient permissions: hiscore");
}

#[tokio::test]
async fn test_revocation_takes_effect_on_next_check() {
    let (executor, verifier) = setup().await;
    assert_ok!(verifier.verify("abc", "ban").await);

    executor
        .execute(
            "UPDATE tokens SET verify_ban = 0 WHERE token = :token",
            Params::new().with("token", "abc"),
        )
        .await
        .unwrap();

    assert_denied(verifier.verify("abc", "ban").await, "ban");
}

#[tokio::test]
async fn test_issued_token_carries_requested_flags() {
    let (executor, verifier) = setup().await;
    let tokens = TokenRepository::new(executor);

    let issued = NewToken::generate(TokenGrant {
        verify_players: true,
        ..TokenGrant::default()
    });
    tokens.insert(&issued).await.unwrap();

    assert_ok!(verifier.verify(&issued.token, "verify_players").await);
    assert_denied(verifier.verify(&issued.token, "hiscore").await, "hiscore");

    let record = tokens.find(&issued.token).await.unwrap().unwrap();
    assert!(record.grants(Permission::VerifyPlayers));
    assert!(!record.grants(Permission::CreateToken));
}

#[tokio::test]
async fn test_find_unknown_token_returns_none() {
    let (executor, _) = setup().await;
    let tokens = TokenRepository::new(executor);
    assert!(tokens.find("nope").await.unwrap().is_none());
}
