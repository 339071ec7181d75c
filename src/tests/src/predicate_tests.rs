//! Tests for unlock predicates and the addresses they accept.

use crate::fixtures::{mint, random_bytes, send, test_client, TestClient};
use anyhow::Result;
use tokenchain_client::{CancellationToken, ClientError};
use tokenchain_core::{
    Address, AddressScheme, BurnPredicate, CoreError, DataHash, HashAlgorithm, InclusionProof, MaskedPredicate,
    OneTimeAddressPredicate, Predicate, PredicateType, PublicKeyPredicate, SigningService, SparseMerkleTree, Token,
    TokenId, TokenState, TokenType, Transaction, TransactionData, UnmaskedPredicate,
};

fn all_predicates(token_id: &TokenId, token_type: &TokenType) -> Vec<Predicate> {
    let owner = SigningService::from_secret(b"owner", None);
    let nonce = [9u8; 32];
    vec![
        Predicate::Masked(MaskedPredicate::create(token_id, token_type, &owner, HashAlgorithm::Sha256, &nonce).unwrap()),
        Predicate::Unmasked(
            UnmaskedPredicate::create(token_id, token_type, &owner, HashAlgorithm::Sha256, &nonce).unwrap(),
        ),
        Predicate::Burn(BurnPredicate::create(token_id, token_type).unwrap()),
        Predicate::OneTimeAddress(
            OneTimeAddressPredicate::create(token_id, token_type, &owner, HashAlgorithm::Sha256, &nonce).unwrap(),
        ),
        Predicate::PublicKey(
            PublicKeyPredicate::create(token_id, token_type, &owner, HashAlgorithm::Sha256, &nonce).unwrap(),
        ),
    ]
}

/// Sends `token` to a state locked by `predicate` under the given recipient address.
async fn send_locked(
    client: &TestClient,
    token: &Token,
    sender: &SigningService,
    predicate: Predicate,
    recipient: &Address,
    salt: &[u8],
) -> Result<Token> {
    let cancel = CancellationToken::new();
    let data = TransactionData::new(token.state().clone(), recipient, salt, None, None);
    let commitment = client.submit_transaction(data, sender).await?;
    let transaction = client.create_transaction(&commitment, &cancel).await?;
    Ok(client.finish_transaction(token, transaction, TokenState::create(predicate, b""), Vec::new())?)
}

#[test]
fn test_dto_round_trip_reproduces_hash_and_reference() {
    let token_id = TokenId::new(rand::random());
    let token_type = TokenType::new(rand::random());

    for predicate in all_predicates(&token_id, &token_type) {
        let dto = predicate.to_dto();
        let json = serde_json::to_string(&dto).unwrap();
        let parsed = Predicate::from_dto(&token_id, &token_type, &serde_json::from_str(&json).unwrap()).unwrap();

        assert_eq!(parsed.predicate_type(), predicate.predicate_type());
        assert_eq!(parsed.hash(), predicate.hash());
        assert_eq!(parsed.reference(), predicate.reference());
    }
}

#[test]
fn test_predicates_are_bound_to_the_token() {
    let token_type = TokenType::new([1; 32]);
    let first = all_predicates(&TokenId::new([1; 32]), &token_type);
    let second = all_predicates(&TokenId::new([2; 32]), &token_type);

    for (a, b) in first.iter().zip(second.iter()) {
        assert_ne!(a.hash(), b.hash(), "{} hash ignores the token id", a.predicate_type());
    }
}

#[test]
fn test_burn_never_verifies() {
    let token_id = TokenId::new(rand::random());
    let token_type = TokenType::new([1; 32]);
    let burn = Predicate::Burn(BurnPredicate::create(&token_id, &token_type).unwrap());
    assert_eq!(burn.predicate_type(), PredicateType::Burn);
    assert_eq!(burn.public_key(), None);

    let recipient = Address::direct(&DataHash::sha256(b"anyone"));
    let data = TransactionData::new(TokenState::create(burn.clone(), b""), &recipient, b"salt", None, None);
    let request_id = tokenchain_core::RequestId::create(b"burner", &DataHash::sha256(b"x"));
    let proof = InclusionProof::new(SparseMerkleTree::new().get_path(&request_id), None, None);

    assert!(!burn.verify(&Transaction::new(data, proof)));
}

#[tokio::test]
async fn test_verify_is_deterministic() {
    let client = test_client();
    let (token, alice) = mint(&client, b"alice").await.unwrap();
    let bob = SigningService::from_secret(b"bob", None);
    let received = send(&client, &token, &alice, &bob, b"").await.unwrap();

    let transaction = &received.transactions()[0];
    let predicate = token.state().unlock_predicate();
    assert!(predicate.verify(transaction));
    assert!(predicate.verify(transaction));

    // A predicate of another owner rejects it, every time
    let other = &all_predicates(token.id(), token.token_type())[0];
    assert!(!other.verify(transaction));
    assert!(!other.verify(transaction));
}

#[tokio::test]
async fn test_transfer_to_public_key_address() {
    let client = test_client();
    let (token, alice) = mint(&client, b"alice").await.unwrap();
    let bob = SigningService::from_secret(b"bob", None);
    let salt = random_bytes();

    let predicate = Predicate::PublicKey(
        PublicKeyPredicate::create(token.id(), token.token_type(), &bob, HashAlgorithm::Sha256, &salt).unwrap(),
    );
    let address = Address::PublicKey(bob.public_key());
    assert_eq!(predicate.address(AddressScheme::PublicKey).unwrap(), address);

    let received = send_locked(&client, &token, &alice, predicate, &address, &salt)
        .await
        .unwrap();

    // Bob can spend it on
    let carol = SigningService::from_secret(b"carol", None);
    let forwarded = send(&client, &received, &bob, &carol, b"").await.unwrap();
    assert_eq!(forwarded.transactions().len(), 2);
}

#[tokio::test]
async fn test_transfer_to_one_time_address() {
    let client = test_client();
    let (token, alice) = mint(&client, b"alice").await.unwrap();
    let bob = SigningService::from_secret(b"bob", None);

    let predicate = OneTimeAddressPredicate::create(
        token.id(),
        token.token_type(),
        &bob,
        HashAlgorithm::Sha256,
        &random_bytes(),
    )
    .unwrap();
    let address = predicate.address();
    assert_eq!(address.scheme(), AddressScheme::OneTime);

    let received = send_locked(
        &client,
        &token,
        &alice,
        Predicate::OneTimeAddress(predicate),
        &address,
        &random_bytes(),
    )
    .await
    .unwrap();
    assert!(received.state().unlock_predicate().is_owner(&bob.public_key()));
}

#[tokio::test]
async fn test_public_key_nonce_must_come_from_salt() {
    let client = test_client();
    let (token, alice) = mint(&client, b"alice").await.unwrap();
    let bob = SigningService::from_secret(b"bob", None);

    let predicate = Predicate::PublicKey(
        PublicKeyPredicate::create(token.id(), token.token_type(), &bob, HashAlgorithm::Sha256, b"chosen by bob")
            .unwrap(),
    );
    let address = Address::PublicKey(bob.public_key());

    let result = send_locked(&client, &token, &alice, predicate, &address, &random_bytes()).await;
    let error = result.unwrap_err().downcast::<ClientError>().unwrap();
    assert!(matches!(
        error,
        ClientError::Core(CoreError::PredicateVerificationFailed { index: 1, .. })
    ));
}

#[tokio::test]
async fn test_one_time_state_requires_one_time_address() {
    let client = test_client();
    let (token, alice) = mint(&client, b"alice").await.unwrap();
    let bob = SigningService::from_secret(b"bob", None);

    let predicate = Predicate::OneTimeAddress(
        OneTimeAddressPredicate::create(token.id(), token.token_type(), &bob, HashAlgorithm::Sha256, &random_bytes())
            .unwrap(),
    );
    let expected = predicate.address(AddressScheme::OneTime).unwrap();

    // The direct address names the same reference but not the one-time binding
    let direct = predicate.address(AddressScheme::Direct).unwrap();
    let result = send_locked(&client, &token, &alice, predicate, &direct, &random_bytes()).await;
    match result.unwrap_err().downcast::<ClientError>().unwrap() {
        ClientError::Core(CoreError::AddressMismatch { index, expected: address, .. }) => {
            assert_eq!(index, 1);
            assert_eq!(address, expected.to_string());
        }
        other => panic!("expected address mismatch, got {}", other),
    }
}

#[tokio::test]
async fn test_transfer_to_pointer_address() {
    let client = test_client();
    let (token, alice) = mint(&client, b"alice").await.unwrap();
    let bob = SigningService::from_secret(b"bob", None);

    let predicate = Predicate::Masked(
        MaskedPredicate::create(token.id(), token.token_type(), &bob, HashAlgorithm::Sha256, &random_bytes())
            .unwrap(),
    );
    let address = Address::pointer(predicate.reference());

    let received = send_locked(&client, &token, &alice, predicate, &address, &random_bytes())
        .await
        .unwrap();
    assert_eq!(received.transactions()[0].data.recipient, address.to_string());
}

#[tokio::test]
async fn test_state_for_wrong_predicate_is_rejected() {
    let client = test_client();
    let (token, alice) = mint(&client, b"alice").await.unwrap();
    let bob = SigningService::from_secret(b"bob", None);
    let mallory = SigningService::from_secret(b"mallory", None);

    let promised = Predicate::Masked(
        MaskedPredicate::create(token.id(), token.token_type(), &bob, HashAlgorithm::Sha256, &random_bytes())
            .unwrap(),
    );
    let delivered = Predicate::Masked(
        MaskedPredicate::create(token.id(), token.token_type(), &mallory, HashAlgorithm::Sha256, &random_bytes())
            .unwrap(),
    );

    let result = send_locked(
        &client,
        &token,
        &alice,
        delivered,
        &Address::direct(promised.reference()),
        &random_bytes(),
    )
    .await;
    assert!(result.is_err());
}
