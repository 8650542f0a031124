//! A data-driven conformance check, so that vectors produced by other implementations can be
//! replayed against this one.
//!
//! Namespaces are written as integers and expanded to big-endian bytes of the tree's namespace
//! width, keeping the low-order bytes when the width is smaller than eight.

use crate::maybestd::{ops::Range, vec::Vec};
use crate::{NamespaceId, NamespaceMerkleTree, NamespacedSha2Hasher, NmtError};

/// One leaf of a fixture tree
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FixtureLeaf {
    pub namespace: u64,
    pub data: Vec<u8>,
}

/// The namespace range of one expected supporting node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FixtureNode {
    pub min_ns: u64,
    pub max_ns: u64,
}

/// A tree, a query against it, and everything an honest prover and verifier must produce.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Fixture {
    /// Leaves in push order
    pub leaves: Vec<FixtureLeaf>,
    /// The namespace to prove
    pub namespace: u64,
    pub start: u32,
    pub end: u32,
    /// Expected supporting nodes, left to right
    pub supporting_hashes: Vec<FixtureNode>,
    /// Whether the honest proof verifies against the tree's root
    pub verification_success: bool,
}

/// The first way in which this implementation disagrees with a fixture.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FixtureMismatch {
    #[error("leaf {index} could not be pushed: {source}")]
    Push { index: usize, source: NmtError },
    #[error("proved range {actual:?}, expected {expected:?}")]
    Range {
        expected: Range<u32>,
        actual: Range<u32>,
    },
    #[error("produced {actual} supporting hashes, expected {expected}")]
    NodeCount { expected: usize, actual: usize },
    #[error("supporting hash {index} spans {actual:?}, expected {expected:?}")]
    Node {
        index: usize,
        expected: FixtureNode,
        actual: FixtureNode,
    },
    #[error("verification returned {actual}, expected {expected}")]
    Verification { expected: bool, actual: bool },
}

/// Expands `value` to a namespace of `NS_ID_SIZE` big-endian bytes
pub fn namespace_from_u64<const NS_ID_SIZE: usize>(value: u64) -> NamespaceId<NS_ID_SIZE> {
    let mut out = [0u8; NS_ID_SIZE];
    let be = value.to_be_bytes();
    let width = NS_ID_SIZE.min(be.len());
    out[NS_ID_SIZE - width..].copy_from_slice(&be[be.len() - width..]);
    NamespaceId(out)
}

/// Reads the low-order eight bytes of a namespace as a big-endian integer
pub fn namespace_to_u64<const NS_ID_SIZE: usize>(namespace: NamespaceId<NS_ID_SIZE>) -> u64 {
    let width = NS_ID_SIZE.min(8);
    namespace.0[NS_ID_SIZE - width..]
        .iter()
        .fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte))
}

impl Fixture {
    /// Replays the fixture over SHA-256 with `NS_ID_SIZE`-byte namespaces.
    pub fn check<const NS_ID_SIZE: usize>(&self) -> Result<(), FixtureMismatch> {
        let mut tree = NamespaceMerkleTree::<NamespacedSha2Hasher<NS_ID_SIZE>, NS_ID_SIZE>::new();
        for (index, leaf) in self.leaves.iter().enumerate() {
            tree.push_leaf(&leaf.data, namespace_from_u64(leaf.namespace))
                .map_err(|source| FixtureMismatch::Push { index, source })?;
        }

        let namespace = namespace_from_u64(self.namespace);
        let (leaves, proof) = tree.get_namespace_with_proof(namespace);

        let actual = proof.start_idx()..proof.end_idx();
        if actual != (self.start..self.end) {
            return Err(FixtureMismatch::Range {
                expected: self.start..self.end,
                actual,
            });
        }
        if proof.siblings().len() != self.supporting_hashes.len() {
            return Err(FixtureMismatch::NodeCount {
                expected: self.supporting_hashes.len(),
                actual: proof.siblings().len(),
            });
        }
        for (index, (node, expected)) in proof
            .siblings()
            .iter()
            .zip(&self.supporting_hashes)
            .enumerate()
        {
            let actual = FixtureNode {
                min_ns: namespace_to_u64(node.min_namespace()),
                max_ns: namespace_to_u64(node.max_namespace()),
            };
            if actual != *expected {
                return Err(FixtureMismatch::Node {
                    index,
                    expected: *expected,
                    actual,
                });
            }
        }

        let root = tree.root();
        let verified = proof.verify_namespace(
            NamespacedSha2Hasher::<NS_ID_SIZE>::default(),
            &root,
            self.leaves.len(),
            &leaves,
            namespace,
        );
        if verified != self.verification_success {
            return Err(FixtureMismatch::Verification {
                expected: self.verification_success,
                actual: verified,
            });
        }
        Ok(())
    }
}
