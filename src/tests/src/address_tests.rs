//! Tests for address encoding and name-tag resolution.

use crate::fixtures::{mint, mint_params, random_bytes, test_client, TestClient};
use tokenchain_client::{CancellationToken, ClientError};
use tokenchain_core::{
    resolve_address, Address, AddressScheme, CoreError, DataHash, HashAlgorithm, Predicate, PublicKeyPredicate,
    SigningService, Token, TokenFactory, TokenId, TokenState, TransactionData,
};

#[test]
fn test_address_string_round_trip() {
    let reference = DataHash::sha256(b"reference");
    let addresses = vec![
        Address::direct(&reference),
        Address::pointer(&reference),
        Address::OneTime(reference.clone()),
        Address::NameTag(TokenId::new([3; 32])),
        Address::PublicKey(vec![4; 32]),
    ];

    for address in addresses {
        let text = address.to_string();
        assert!(text.starts_with(&format!("{}://", address.scheme())));
        assert_eq!(text.parse::<Address>().unwrap(), address);
    }
}

#[test]
fn test_pointer_hides_reference() {
    let reference = DataHash::sha256(b"reference");
    let pointer = Address::pointer(&reference);
    assert_eq!(pointer.scheme(), AddressScheme::Pointer);
    assert_ne!(pointer.data(), reference.imprint());
}

#[test]
fn test_flipped_nibble_fails_checksum() {
    let text = Address::direct(&DataHash::sha256(b"reference")).to_string();
    let position = "DIRECT://".len() + 10;
    let flipped = if &text[position..position + 1] == "0" { "1" } else { "0" };
    let tampered = format!("{}{}{}", &text[..position], flipped, &text[position + 1..]);

    assert!(matches!(tampered.parse::<Address>(), Err(CoreError::InvalidChecksum(_))));
}

#[test]
fn test_malformed_addresses() {
    assert!(matches!("nonsense".parse::<Address>(), Err(CoreError::InvalidAddress(_))));
    assert!(matches!("EMAIL://00".parse::<Address>(), Err(CoreError::InvalidAddress(_))));
    assert!(matches!("DIRECT://zz".parse::<Address>(), Err(CoreError::InvalidAddress(_))));
    assert!(matches!("DIRECT://0000".parse::<Address>(), Err(CoreError::InvalidAddress(_))));
}

/// Mints a name-tag token with a chosen id pointing at `target`.
async fn mint_nametag(client: &TestClient, id: TokenId, target: &Address) -> Token {
    let mut params = mint_params(b"nametag owner", target.to_string().as_bytes());
    params.token_id = id;
    client.mint(params, &CancellationToken::new()).await.unwrap()
}

#[tokio::test]
async fn test_nametag_chain_resolves() {
    let client = test_client();
    let final_target = Address::PublicKey(vec![9; 32]);
    let inner_id = TokenId::new(rand::random());
    let outer_id = TokenId::new(rand::random());

    let inner = mint_nametag(&client, inner_id, &final_target).await;
    let outer = mint_nametag(&client, outer_id, &Address::NameTag(inner_id)).await;
    let nametags = vec![outer, inner];

    assert_eq!(resolve_address(&Address::NameTag(outer_id), &nametags).unwrap(), final_target);
    assert_eq!(resolve_address(&final_target, &[]).unwrap(), final_target);
}

#[tokio::test]
async fn test_nametag_cycle_and_missing() {
    let client = test_client();
    let a = TokenId::new(rand::random());
    let b = TokenId::new(rand::random());

    let tag_a = mint_nametag(&client, a, &Address::NameTag(b)).await;
    let tag_b = mint_nametag(&client, b, &Address::NameTag(a)).await;

    assert!(matches!(
        resolve_address(&Address::NameTag(a), &[tag_a.clone(), tag_b]),
        Err(CoreError::NametagCycle(_))
    ));
    assert!(matches!(
        resolve_address(&Address::NameTag(a), &[tag_a]),
        Err(CoreError::NametagNotFound(_))
    ));
}

#[tokio::test]
async fn test_transfer_to_nametag() {
    let client = test_client();
    let cancel = CancellationToken::new();
    let (token, alice) = mint(&client, b"alice").await.unwrap();
    let bob = SigningService::from_secret(b"bob", None);

    let nametag = mint_nametag(&client, TokenId::new(rand::random()), &Address::PublicKey(bob.public_key())).await;
    let recipient = Address::NameTag(*nametag.id());

    let salt = random_bytes();
    let predicate = Predicate::PublicKey(
        PublicKeyPredicate::create(token.id(), token.token_type(), &bob, HashAlgorithm::Sha256, &salt).unwrap(),
    );
    let state = TokenState::create(predicate, b"");
    let data = TransactionData::new(token.state().clone(), &recipient, &salt, None, None);

    let commitment = client.submit_transaction(data, &alice).await.unwrap();
    let transaction = client.create_transaction(&commitment, &cancel).await.unwrap();

    // Without the name tag the recipient cannot be resolved
    let result = client.finish_transaction(&token, transaction.clone(), state.clone(), Vec::new());
    assert!(matches!(result, Err(ClientError::Core(CoreError::NametagNotFound(_)))));

    let received = client
        .finish_transaction(&token, transaction, state, vec![nametag])
        .unwrap();
    assert_eq!(received.nametag_tokens().len(), 1);

    // The name tag travels with the token and is verified on import
    let imported = TokenFactory::new().create(&received.to_json().unwrap()).unwrap();
    assert_eq!(imported, received);
}
