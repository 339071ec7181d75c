//! Tests for minting, transferring and exchanging whole tokens.

use crate::fixtures::{mint, mint_params, minted_owner, send, test_client};
use tokenchain_client::{CancellationToken, TokenStatus};
use tokenchain_core::{
    CoinId, CoreError, RawDataDecoder, SigningService, TokenCoinData, TokenDataDecoder, TokenFactory, TOKEN_VERSION,
};

/// Decodes token data as UTF-8 text.
struct TextDecoder;

impl TokenDataDecoder for TextDecoder {
    type Output = String;

    fn decode(&self, data: &[u8]) -> Result<String, CoreError> {
        String::from_utf8(data.to_vec()).map_err(|e| CoreError::InvalidFormat(e.to_string()))
    }
}

#[tokio::test]
async fn test_minted_token_survives_export() {
    let client = test_client();
    let (token, _) = mint(&client, b"alice").await.unwrap();

    let json = token.to_json().unwrap();
    let imported = TokenFactory::new().create(&json).unwrap();

    assert_eq!(imported, token);
    assert_eq!(imported.version(), TOKEN_VERSION);
    assert_eq!(imported.to_json().unwrap(), json);
}

#[tokio::test]
async fn test_transfer_chain() {
    let client = test_client();
    let factory = TokenFactory::new();
    let (token, alice) = mint(&client, b"alice").await.unwrap();
    let bob = SigningService::from_secret(b"bob", None);
    let carol = SigningService::from_secret(b"carol", None);

    // Each hop goes through JSON, as it would between wallets
    let at_bob = send(&client, &token, &alice, &bob, b"for bob").await.unwrap();
    let at_bob = factory.create(&at_bob.to_json().unwrap()).unwrap();

    let at_carol = send(&client, &at_bob, &bob, &carol, b"for carol").await.unwrap();
    let at_carol = factory.create(&at_carol.to_json().unwrap()).unwrap();

    let back_at_alice = send(&client, &at_carol, &carol, &alice, b"").await.unwrap();
    let back_at_alice = factory.create(&back_at_alice.to_json().unwrap()).unwrap();

    assert_eq!(back_at_alice.transactions().len(), 3);
    assert_eq!(back_at_alice.id(), token.id());
    assert_eq!(at_carol.state().data(), b"for carol");
    assert!(back_at_alice.state().unlock_predicate().is_owner(&alice.public_key()));

    // Every earlier state is spent, the last one is not
    assert_eq!(
        client.get_token_status(&at_bob, &bob.public_key()).await.unwrap(),
        TokenStatus::Spent
    );
    assert_eq!(
        client.get_token_status(&back_at_alice, &alice.public_key()).await.unwrap(),
        TokenStatus::Unspent
    );
}

#[tokio::test]
async fn test_spent_state_cannot_be_sent_again() {
    let client = test_client();
    let (token, alice) = mint(&client, b"alice").await.unwrap();
    let bob = SigningService::from_secret(b"bob", None);
    let carol = SigningService::from_secret(b"carol", None);

    send(&client, &token, &alice, &bob, b"").await.unwrap();
    let second = send(&client, &token, &alice, &carol, b"").await;
    assert!(second.is_err());
}

#[tokio::test]
async fn test_coins_and_decoder() {
    let client = test_client();
    let mut params = mint_params(b"alice", b"");
    params.token_data = b"gold bar".to_vec();
    params.coin_data = Some(TokenCoinData::new(vec![(CoinId::new([1; 32]), 100), (CoinId::new([2; 32]), 7)]).unwrap());
    let owner = minted_owner(&params);

    let token = client.mint(params, &CancellationToken::new()).await.unwrap();
    let token = send(&client, &token, &owner, &SigningService::from_secret(b"bob", None), b"")
        .await
        .unwrap();
    let json = token.to_json().unwrap();

    let (imported, text) = TokenFactory::new().create_with_decoder(&json, &TextDecoder).unwrap();
    assert_eq!(text, "gold bar");
    assert_eq!(imported.coins().unwrap().get(&CoinId::new([1; 32])), Some(100));
    assert_eq!(imported.coins().unwrap().len(), 2);

    let (_, raw) = TokenFactory::new().create_with_decoder(&json, &RawDataDecoder).unwrap();
    assert_eq!(raw, b"gold bar".to_vec());
}

#[tokio::test]
async fn test_concurrent_mints() {
    let client = test_client();
    let mints = (0..8).map(|i| {
        let client = &client;
        async move { mint(client, format!("owner {}", i).as_bytes()).await }
    });

    let tokens = futures::future::try_join_all(mints).await.unwrap();
    assert_eq!(tokens.len(), 8);
    assert_eq!(client.aggregator().len().unwrap(), 8);
}
