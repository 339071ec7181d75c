//! Sparse Merkle tree paths and a reference in-memory tree.
//!
//! Keys are request ids read as sentinel-prefixed integers (see
//! [`RequestId::to_path`]). The tree is path-compressed: every node stores
//! the segment of key bits between its parent's branching point and its own,
//! with a leading `1` sentinel bit. The least significant bit of a segment is
//! the direction taken at the parent (`1` = right).
//!
//! Hashes:
//! - leaf:   `H(segment_bytes || value)`
//! - branch: `H(segment_bytes || H(left || right))`
//! - root:   `H(left || right)`, a missing child hashing as a single zero byte
//!
//! A [`MerkleTreePath`] lists the nodes from the leaf (or the node occupying
//! the leaf's position, for non-inclusion) up to the root.

use crate::errors::CoreError;
use crate::hash::{DataHash, DataHasher, HashAlgorithm};
use crate::request_id::RequestId;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Placeholder hashed in place of an absent child.
const EMPTY_NODE: [u8; 1] = [0u8];

/// One node on a Merkle tree path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleTreePathStep {
    /// Sentinel-prefixed key segment of this node
    #[serde(with = "biguint_string")]
    pub path: BigUint,
    /// Hash of the sibling node, absent when the sibling slot is empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sibling: Option<DataHash>,
    /// Node payload; only read on the first step
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::encoding::hex_bytes_opt"
    )]
    pub value: Option<Vec<u8>>,
}

/// Outcome of recomputing a path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MerkleTreePathVerificationResult {
    /// The recomputed root equals the stated root
    pub is_path_valid: bool,
    /// The path leads to the requested key
    pub is_path_included: bool,
}

impl MerkleTreePathVerificationResult {
    /// Both checks passed.
    pub fn is_successful(&self) -> bool {
        self.is_path_valid && self.is_path_included
    }
}

/// A path from a tree position to the root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleTreePath {
    /// The root hash this path claims to lead to
    pub root: DataHash,
    /// Nodes ordered from the leaf position up to the root
    pub steps: Vec<MerkleTreePathStep>,
}

impl MerkleTreePath {
    /// Recomputes the root and the key reached by this path.
    ///
    /// Never panics on malformed input; a path that cannot be recomputed is
    /// reported as invalid.
    pub fn verify(&self, request_id: &RequestId) -> MerkleTreePathVerificationResult {
        let invalid = MerkleTreePathVerificationResult {
            is_path_valid: false,
            is_path_included: false,
        };

        if self.steps.is_empty() {
            return invalid;
        }

        let mut current_hash: Option<DataHash> = None;
        let mut current_path = BigUint::from(1u8);

        for (i, step) in self.steps.iter().enumerate() {
            let len = segment_len(&step.path);
            if len == 0 {
                debug!("Path step {} has an empty segment", i);
                return invalid;
            }

            let path_bytes = step.path.to_bytes_be();
            let node = if i == 0 {
                match &step.value {
                    Some(value) => hash_concat(&path_bytes, value).data().to_vec(),
                    None => EMPTY_NODE.to_vec(),
                }
            } else {
                match &current_hash {
                    Some(children) => hash_concat(&path_bytes, children.data()).data().to_vec(),
                    None => return invalid,
                }
            };

            current_path = (current_path << len) | segment_bits(&step.path, len);

            let sibling = step
                .sibling
                .as_ref()
                .map(|hash| hash.data().to_vec())
                .unwrap_or_else(|| EMPTY_NODE.to_vec());

            current_hash = Some(if step.path.bit(0) {
                hash_concat(&sibling, &node)
            } else {
                hash_concat(&node, &sibling)
            });
        }

        MerkleTreePathVerificationResult {
            is_path_valid: current_hash.as_ref() == Some(&self.root),
            is_path_included: current_path == request_id.to_path(),
        }
    }

    /// The value stored at the leaf, when the path ends at a leaf.
    pub fn leaf_value(&self) -> Option<&[u8]> {
        self.steps.first().and_then(|step| step.value.as_deref())
    }
}

impl fmt::Display for MerkleTreePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MerkleTreePath {{ root: {}, steps: {} }}", self.root, self.steps.len())
    }
}

#[derive(Clone, Debug)]
enum Node {
    Leaf {
        path: BigUint,
        value: Vec<u8>,
        hash: DataHash,
    },
    Branch {
        path: BigUint,
        left: Box<Node>,
        right: Box<Node>,
        hash: DataHash,
    },
}

impl Node {
    fn leaf(path: BigUint, value: Vec<u8>) -> Node {
        let hash = hash_concat(&path.to_bytes_be(), &value);
        Node::Leaf { path, value, hash }
    }

    /// Builds a branch, ordering the children by the direction bit of their segments.
    fn branch(path: BigUint, a: Node, b: Node) -> Node {
        let (left, right) = if a.path().bit(0) { (b, a) } else { (a, b) };
        let children = hash_concat(left.hash().data(), right.hash().data());
        let hash = hash_concat(&path.to_bytes_be(), children.data());
        Node::Branch {
            path,
            left: Box::new(left),
            right: Box::new(right),
            hash,
        }
    }

    fn path(&self) -> &BigUint {
        match self {
            Node::Leaf { path, .. } | Node::Branch { path, .. } => path,
        }
    }

    fn hash(&self) -> &DataHash {
        match self {
            Node::Leaf { hash, .. } | Node::Branch { hash, .. } => hash,
        }
    }

    /// Re-roots this node under a shorter segment.
    fn with_path(self, path: BigUint) -> Node {
        match self {
            Node::Leaf { value, .. } => Node::leaf(path, value),
            Node::Branch { left, right, .. } => Node::branch(path, *left, *right),
        }
    }
}

/// A path-compressed sparse Merkle tree keyed by request id.
///
/// This is the reference structure behind the in-memory aggregator; the
/// client only ever needs [`MerkleTreePath::verify`].
#[derive(Clone, Default)]
pub struct SparseMerkleTree {
    left: Option<Box<Node>>,
    right: Option<Box<Node>>,
    leaves: usize,
}

impl SparseMerkleTree {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of leaves.
    pub fn len(&self) -> usize {
        self.leaves
    }

    /// Whether the tree has no leaves.
    pub fn is_empty(&self) -> bool {
        self.leaves == 0
    }

    /// The root hash.
    pub fn root(&self) -> DataHash {
        let left = self.left.as_ref().map(|node| node.hash().data().to_vec());
        let right = self.right.as_ref().map(|node| node.hash().data().to_vec());
        hash_concat(
            left.as_deref().unwrap_or(&EMPTY_NODE),
            right.as_deref().unwrap_or(&EMPTY_NODE),
        )
    }

    /// Adds a leaf. Leaves are write-once.
    pub fn add_leaf(&mut self, request_id: &RequestId, value: Vec<u8>) -> Result<(), CoreError> {
        if self.get_leaf(request_id).is_some() {
            return Err(CoreError::LeafExists(request_id.to_hex()));
        }

        let key = request_id.to_path();
        let slot = if key.bit(0) { &mut self.right } else { &mut self.left };
        let node = insert(slot.take(), key, value);
        *slot = Some(Box::new(node));
        self.leaves += 1;

        Ok(())
    }

    /// Looks up the value stored for a request id.
    pub fn get_leaf(&self, request_id: &RequestId) -> Option<&[u8]> {
        let mut remaining = request_id.to_path();
        let mut current = if remaining.bit(0) { self.right.as_deref() } else { self.left.as_deref() };

        while let Some(node) = current {
            match node {
                Node::Leaf { path, value, .. } => {
                    return if *path == remaining { Some(value) } else { None };
                }
                Node::Branch { path, left, right, .. } => {
                    let len = segment_len(path);
                    if common_prefix_len(path, &remaining) < len {
                        return None;
                    }
                    remaining >>= len;
                    current = Some(if remaining.bit(0) { &**right } else { &**left });
                }
            }
        }

        None
    }

    /// Builds the path for a request id: an inclusion proof when the leaf
    /// exists, otherwise a proof that the position holds something else.
    pub fn get_path(&self, request_id: &RequestId) -> MerkleTreePath {
        let mut remaining = request_id.to_path();
        let direction = remaining.bit(0);
        let (mut current, sibling) = if direction {
            (self.right.as_deref(), self.left.as_deref())
        } else {
            (self.left.as_deref(), self.right.as_deref())
        };
        let mut sibling_hash = sibling.map(|node| node.hash().clone());
        let mut steps = Vec::new();

        loop {
            match current {
                None => {
                    // Empty root slot: a one-bit segment pointing at it
                    steps.push(MerkleTreePathStep {
                        path: BigUint::from(if direction { 3u8 } else { 2u8 }),
                        sibling: sibling_hash,
                        value: None,
                    });
                    break;
                }
                Some(Node::Leaf { path, value, .. }) => {
                    steps.push(MerkleTreePathStep {
                        path: path.clone(),
                        sibling: sibling_hash,
                        value: Some(value.clone()),
                    });
                    break;
                }
                Some(Node::Branch { path, left, right, .. }) => {
                    let len = segment_len(path);
                    if common_prefix_len(path, &remaining) < len {
                        let children = hash_concat(left.hash().data(), right.hash().data());
                        steps.push(MerkleTreePathStep {
                            path: path.clone(),
                            sibling: sibling_hash,
                            value: Some(children.data().to_vec()),
                        });
                        break;
                    }

                    steps.push(MerkleTreePathStep {
                        path: path.clone(),
                        sibling: sibling_hash,
                        value: None,
                    });

                    remaining >>= len;
                    let (next, other) = if remaining.bit(0) { (right, left) } else { (left, right) };
                    sibling_hash = Some(other.hash().clone());
                    current = Some(next.as_ref());
                }
            }
        }

        steps.reverse();
        MerkleTreePath {
            root: self.root(),
            steps,
        }
    }
}

impl fmt::Debug for SparseMerkleTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SparseMerkleTree {{ root: {}, leaves: {} }}", self.root(), self.leaves)
    }
}

fn insert(node: Option<Box<Node>>, remaining: BigUint, value: Vec<u8>) -> Node {
    let node = match node {
        None => return Node::leaf(remaining, value),
        Some(node) => *node,
    };

    let len = segment_len(node.path());
    let common = common_prefix_len(node.path(), &remaining);

    match node {
        Node::Branch { path, left, right, .. } if common == len => {
            let rest = &remaining >> len;
            if rest.bit(0) {
                let right = insert(Some(right), rest, value);
                Node::branch(path, *left, right)
            } else {
                let left = insert(Some(left), rest, value);
                Node::branch(path, left, *right)
            }
        }
        node => {
            // Split at the first differing bit
            let shifted = node.path() >> common;
            let existing = node.with_path(shifted);
            let added = Node::leaf(&remaining >> common, value);
            Node::branch(low_segment(&remaining, common), existing, added)
        }
    }
}

/// Number of key bits in a sentinel-prefixed segment.
fn segment_len(path: &BigUint) -> u64 {
    path.bits().saturating_sub(1)
}

/// The key bits of a segment without its sentinel.
fn segment_bits(path: &BigUint, len: u64) -> BigUint {
    let mask = (BigUint::from(1u8) << len) - 1u32;
    path & mask
}

/// The lowest `len` bits of `path`, re-prefixed with a sentinel.
fn low_segment(path: &BigUint, len: u64) -> BigUint {
    (BigUint::from(1u8) << len) | segment_bits(path, len)
}

/// Number of equal low-order bits shared by two segments.
fn common_prefix_len(a: &BigUint, b: &BigUint) -> u64 {
    let max = segment_len(a).min(segment_len(b));
    let mut i = 0;
    while i < max && a.bit(i) == b.bit(i) {
        i += 1;
    }
    i
}

fn hash_concat(a: &[u8], b: &[u8]) -> DataHash {
    DataHasher::new(HashAlgorithm::Sha256).update(a).update(b).digest()
}

/// Serde adapter writing big integers as decimal strings.
pub mod biguint_string {
    use num_bigint::BigUint;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_str_radix(10))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BigUint, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        BigUint::parse_bytes(value.as_bytes(), 10)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid path integer: {}", value)))
    }
}
