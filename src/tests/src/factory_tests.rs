//! Tests that token import rejects every kind of tampering.

use crate::fixtures::{mint, random_bytes, send, test_client};
use serde_json::{json, Value};
use tokenchain_client::CancellationToken;
use tokenchain_core::token::TokenDto;
use tokenchain_core::{
    Address, CoreError, DataHash, HashAlgorithm, InclusionProofVerificationStatus, Predicate, PublicKeyPredicate,
    SigningService, Token, TokenFactory, TokenState, TransactionData,
};

/// A token with a mint and one transfer, as JSON.
async fn transferred_token() -> Value {
    let client = test_client();
    let (token, alice) = mint(&client, b"alice").await.unwrap();
    let bob = SigningService::from_secret(b"bob", None);
    let token = send(&client, &token, &alice, &bob, b"payload").await.unwrap();
    serde_json::from_str(&token.to_json().unwrap()).unwrap()
}

fn import(value: &Value) -> Result<Token, CoreError> {
    TokenFactory::new().create(&value.to_string())
}

fn flip_nibble(text: &str, position: usize) -> String {
    let flipped = if &text[position..position + 1] == "a" { "b" } else { "a" };
    format!("{}{}{}", &text[..position], flipped, &text[position + 1..])
}

#[tokio::test]
async fn test_untouched_token_imports() {
    let token = transferred_token().await;
    assert!(import(&token).is_ok());
}

#[tokio::test]
async fn test_flipped_recipient_nibble() {
    let token = transferred_token().await;

    for index in 0..2 {
        let mut tampered = token.clone();
        let recipient = tampered["transactions"][index]["data"]["recipient"].as_str().unwrap().to_string();
        let position = recipient.find("://").unwrap() + 3 + 20;
        tampered["transactions"][index]["data"]["recipient"] = json!(flip_nibble(&recipient, position));

        match import(&tampered) {
            Err(CoreError::AddressMismatch { index: at, .. }) => assert_eq!(at, index),
            other => panic!("expected address mismatch, got {:?}", other.map(|t| t.id().to_hex())),
        }
    }

    assert!(import(&token).is_ok());
}

#[tokio::test]
async fn test_wrong_version() {
    let mut token = transferred_token().await;
    token["version"] = json!("1.0");

    assert!(matches!(import(&token), Err(CoreError::UnsupportedVersion { .. })));
}

#[tokio::test]
async fn test_missing_genesis() {
    let mut token = transferred_token().await;
    token["transactions"] = json!([]);

    assert!(matches!(import(&token), Err(CoreError::MissingGenesis)));
}

#[test]
fn test_malformed_json() {
    assert!(TokenFactory::new().create("{\"version\": \"2.0\"").is_err());
    assert!(TokenFactory::new().create("[]").is_err());
}

#[tokio::test]
async fn test_tampered_state_data() {
    let token = transferred_token().await;
    let mut dto: TokenDto = serde_json::from_value(token).unwrap();
    dto.state.data = b"something else".to_vec();

    assert!(matches!(
        TokenFactory::new().from_dto(&dto),
        Err(CoreError::DataMismatch { index: 1 })
    ));
}

#[tokio::test]
async fn test_tampered_token_data() {
    let token = transferred_token().await;
    let mut dto: TokenDto = serde_json::from_value(token).unwrap();
    dto.data = b"forged".to_vec();

    assert!(matches!(TokenFactory::new().from_dto(&dto), Err(CoreError::TokenMismatch(_))));
}

#[tokio::test]
async fn test_tampered_proof_root() {
    let mut token = transferred_token().await;
    token["transactions"][1]["inclusionProof"]["merkleTreePath"]["root"] =
        json!(DataHash::sha256(b"not the root").to_hex());

    match import(&token) {
        Err(CoreError::InclusionProofFailed { index, status }) => {
            assert_eq!(index, 1);
            assert_eq!(status, InclusionProofVerificationStatus::PathInvalid);
        }
        other => panic!("expected inclusion proof failure, got {:?}", other.map(|t| t.id().to_hex())),
    }
}

#[tokio::test]
async fn test_tampered_mint_proof() {
    let mut token = transferred_token().await;
    token["transactions"][0]["inclusionProof"]["merkleTreePath"]["root"] =
        json!(DataHash::sha256(b"not the root").to_hex());

    assert!(matches!(import(&token), Err(CoreError::MintVerificationFailed(_))));
}

#[tokio::test]
async fn test_swapped_transfer_salt() {
    let mut token = transferred_token().await;
    token["transactions"][1]["data"]["salt"] = json!(hex::encode([0u8; 32]));

    // The recipient is unmasked, so its nonce no longer signs the salt
    assert!(matches!(
        import(&token),
        Err(CoreError::PredicateVerificationFailed { index: 1, .. })
    ));
}

#[tokio::test]
async fn test_forked_public_key_nonce() {
    let client = test_client();
    let cancel = CancellationToken::new();
    let (token, alice) = mint(&client, b"alice").await.unwrap();
    let bob = SigningService::from_secret(b"bob", None);

    let salt = random_bytes();
    let predicate = Predicate::PublicKey(
        PublicKeyPredicate::create(token.id(), token.token_type(), &bob, HashAlgorithm::Sha256, &salt).unwrap(),
    );
    let data = TransactionData::new(token.state().clone(), &Address::PublicKey(bob.public_key()), &salt, None, None);
    let commitment = client.submit_transaction(data, &alice).await.unwrap();
    let transaction = client.create_transaction(&commitment, &cancel).await.unwrap();
    let received = client
        .finish_transaction(&token, transaction, TokenState::create(predicate, b""), Vec::new())
        .unwrap();

    let original: Value = serde_json::from_str(&received.to_json().unwrap()).unwrap();
    assert!(import(&original).is_ok());

    // Another nonce would give the same owner a second state to spend
    let mut forked = original.clone();
    forked["state"]["unlockPredicate"]["nonce"] = json!(hex::encode([7u8; 32]));
    match import(&forked) {
        Err(CoreError::PredicateVerificationFailed { index, .. }) => assert_eq!(index, 1),
        other => panic!("expected predicate failure, got {:?}", other.map(|t| t.id().to_hex())),
    }
}
