//! Tests for request ids, mint derivation and the sparse Merkle tree.

use rand::Rng;
use std::collections::HashSet;
use tokenchain_core::{
    deterministic_minter_key, mint_source, DataHash, DataHasher, HashAlgorithm, InclusionProof,
    InclusionProofVerificationStatus, RequestId, SparseMerkleTree, TokenId,
};

/// Request ids are deterministic and distinct across (public key, state) pairs.
#[test]
fn test_request_id_determinism_and_distinctness() {
    let mut rng = rand::thread_rng();
    let mut seen = HashSet::new();

    for _ in 0..200 {
        let mut public_key = [0u8; 32];
        rng.fill(&mut public_key);
        let state_hash = DataHash::sha256(&rng.gen::<[u8; 32]>());

        let request_id = RequestId::create(&public_key, &state_hash);
        assert_eq!(request_id, RequestId::create(&public_key, &state_hash));
        assert!(seen.insert(request_id));
    }

    // Same key, different state
    let public_key = [7u8; 32];
    assert_ne!(
        RequestId::create(&public_key, &DataHash::sha256(b"a")),
        RequestId::create(&public_key, &DataHash::sha256(b"b"))
    );
}

#[test]
fn test_mint_request_id() {
    let token_id = TokenId::new([0xAA; 32]);
    let minter = deterministic_minter_key(&token_id);
    let minter_key = minter.public_key();

    let mut suffix_imprint = vec![0x00, 0x00];
    suffix_imprint.extend_from_slice(&tokenchain_core::transaction::MINT_SUFFIX);
    let source = DataHasher::new(HashAlgorithm::Sha256)
        .update([0xAA; 32])
        .update(&suffix_imprint)
        .digest();
    assert_eq!(source, mint_source(&token_id));

    let expected = DataHasher::new(HashAlgorithm::Sha256)
        .update(&minter_key)
        .update(source.imprint())
        .digest();
    assert_eq!(RequestId::create(&minter_key, &source).hash(), &expected);

    // The minter key is the same for everyone
    assert_eq!(deterministic_minter_key(&token_id).public_key(), minter_key);
    assert_ne!(
        deterministic_minter_key(&TokenId::new([0xBB; 32])).public_key(),
        minter_key
    );
}

#[test]
fn test_imprint_round_trip() {
    let hash = DataHash::sha256(b"imprint");
    let imprint = hash.imprint();
    assert_eq!(&imprint[..2], &[0x00, 0x00]);
    assert_eq!(DataHash::from_imprint(&imprint).unwrap(), hash);
    assert_eq!(DataHash::from_hex(&hash.to_hex()).unwrap(), hash);
}

#[test]
fn test_tampered_root_is_path_invalid() {
    let mut tree = SparseMerkleTree::new();
    let ids: Vec<RequestId> = (0..16u8)
        .map(|i| RequestId::create(&[i; 32], &DataHash::sha256(b"state")))
        .collect();
    for id in &ids {
        tree.add_leaf(id, id.hash().imprint()).unwrap();
    }

    let mut path = tree.get_path(&ids[3]);
    assert!(path.verify(&ids[3]).is_successful());

    path.root = DataHash::sha256(b"another root");
    let result = path.verify(&ids[3]);
    assert!(!result.is_path_valid);

    let proof = InclusionProof::new(path, None, None);
    assert_eq!(proof.verify(&ids[3]), InclusionProofVerificationStatus::PathInvalid);
}

#[test]
fn test_path_of_one_id_does_not_prove_another() {
    let mut tree = SparseMerkleTree::new();
    let a = RequestId::create(b"a", &DataHash::sha256(b"state"));
    let b = RequestId::create(b"b", &DataHash::sha256(b"state"));
    tree.add_leaf(&a, vec![1]).unwrap();
    tree.add_leaf(&b, vec![2]).unwrap();

    let path = tree.get_path(&a);
    let result = path.verify(&b);
    assert!(result.is_path_valid);
    assert!(!result.is_path_included);
}

#[test]
fn test_tree_root_is_insertion_order_independent() {
    let ids: Vec<RequestId> = (0..32u8)
        .map(|i| RequestId::create(&[i; 32], &DataHash::sha256(&[i])))
        .collect();

    let mut forward = SparseMerkleTree::new();
    for id in &ids {
        forward.add_leaf(id, id.hash().imprint()).unwrap();
    }

    let mut backward = SparseMerkleTree::new();
    for id in ids.iter().rev() {
        backward.add_leaf(id, id.hash().imprint()).unwrap();
    }

    assert_eq!(forward.root(), backward.root());
    assert_eq!(forward.len(), 32);
}
