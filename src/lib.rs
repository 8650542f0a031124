#![cfg_attr(not(feature = "std"), no_std)]
//! A namespaced merkle tree: a binary merkle tree whose nodes carry the range of namespaces
//! below them, so that a light client can check it holds *all* the data of one namespace.

#[cfg(not(feature = "std"))]
extern crate alloc;

mod maybestd {
    #[cfg(not(feature = "std"))]
    pub use alloc::vec;
    pub use core::{fmt, hash, marker, ops};
    #[cfg(feature = "std")]
    pub use std::vec;
}

use maybestd::{ops::Range, vec::Vec};

pub mod conformance;
mod error;
mod namespaced_data;
mod namespaced_hash;
pub mod nmt_proof;
pub mod simple_merkle;

pub use error::NmtError;
pub use namespaced_data::{
    NamespacedData, PrefixedData, PrefixedData16, PrefixedData32, PrefixedData8,
};
pub use namespaced_hash::{
    DefaultHasher, NamespaceId, NamespaceMerkleHasher, NamespacedHash, NamespacedHasher,
    NamespacedSha2Hasher, HASH_LEN, INTERNAL_NODE_DOMAIN_SEPARATOR, LEAF_DOMAIN_SEPARATOR,
};
pub use nmt_proof::NamespaceProof;
pub use simple_merkle::error::RangeProofError;

use simple_merkle::{
    proof::Proof,
    tree::{LeafWithHash, MerkleHash, MerkleTree},
};

/// Proofs address leaves with u32 indices, which caps the size of a tree
const MAX_LEAVES: usize = u32::MAX as usize;

/// A namespaced merkle tree. Leaves must be pushed in non-decreasing namespace order.
///
/// Building the tree takes `&mut self`. Roots, lookups and proofs only need `&self` (except the
/// cached [`NamespaceMerkleTree::root`]), so a finished tree can serve many readers at once.
pub struct NamespaceMerkleTree<M: NamespaceMerkleHasher<NS_ID_SIZE>, const NS_ID_SIZE: usize> {
    inner: MerkleTree<M>,
}

impl<M, const NS_ID_SIZE: usize> Default for NamespaceMerkleTree<M, NS_ID_SIZE>
where
    M: NamespaceMerkleHasher<NS_ID_SIZE> + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<M, const NS_ID_SIZE: usize> NamespaceMerkleTree<M, NS_ID_SIZE>
where
    M: NamespaceMerkleHasher<NS_ID_SIZE> + Default,
{
    /// Creates an empty tree with a default hasher
    pub fn new() -> Self {
        Self::with_hasher(M::default())
    }
}

impl<M, const NS_ID_SIZE: usize> NamespaceMerkleTree<M, NS_ID_SIZE>
where
    M: NamespaceMerkleHasher<NS_ID_SIZE>,
{
    /// Creates an empty tree with the given hasher
    pub fn with_hasher(hasher: M) -> Self {
        Self {
            inner: MerkleTree::with_hasher(hasher),
        }
    }

    /// Appends a leaf with the given namespace.
    ///
    /// Fails without changing the tree if `namespace` is lower than the last pushed namespace.
    pub fn push_leaf(
        &mut self,
        raw_data: &[u8],
        namespace: NamespaceId<NS_ID_SIZE>,
    ) -> Result<(), NmtError> {
        if let Some(last) = self.max_namespace() {
            if namespace < last {
                return Err(NmtError::OrderViolation {
                    last: last.0.to_vec(),
                    attempted: namespace.0.to_vec(),
                });
            }
        }
        if self.inner.len() >= MAX_LEAVES {
            return Err(NmtError::TreeFull { max: MAX_LEAVES });
        }
        let hash = self
            .inner
            .hasher()
            .hash_leaf_with_namespace(raw_data, namespace);
        self.inner
            .push_leaf_with_hash(LeafWithHash::new(raw_data.to_vec(), hash));
        Ok(())
    }

    /// Appends a leaf that carries its own namespace prefix. The prefix is not part of the payload.
    pub fn push_namespaced(&mut self, leaf: &impl NamespacedData) -> Result<(), NmtError> {
        let namespace = leaf.namespace::<NS_ID_SIZE>()?;
        self.push_leaf(leaf.data(), namespace)
    }

    /// Returns the root of the tree, computing it if necessary. Repeated queries return a cached result.
    pub fn root(&mut self) -> NamespacedHash<NS_ID_SIZE> {
        self.inner.root()
    }

    /// Computes the root without touching the cache
    pub fn compute_root(&self) -> NamespacedHash<NS_ID_SIZE> {
        self.inner.compute_root()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns the leaves in push order
    pub fn leaves(&self) -> &[LeafWithHash<M>] {
        self.inner.leaves()
    }

    /// Returns the plain merkle tree underneath, for proofs over arbitrary ranges
    pub fn inner(&self) -> &MerkleTree<M> {
        &self.inner
    }

    /// Returns the lowest namespace in the tree, if any
    pub fn min_namespace(&self) -> Option<NamespaceId<NS_ID_SIZE>> {
        self.leaves().first().map(|leaf| leaf.hash().min_namespace())
    }

    /// Returns the highest namespace in the tree, if any
    pub fn max_namespace(&self) -> Option<NamespaceId<NS_ID_SIZE>> {
        self.leaves().last().map(|leaf| leaf.hash().max_namespace())
    }

    /// Returns the indices of the leaves of `namespace`.
    ///
    /// If no leaf carries it, the range is empty and starts where such a leaf would be inserted.
    pub fn namespace_range(&self, namespace: NamespaceId<NS_ID_SIZE>) -> Range<usize> {
        let leaves = self.leaves();
        let start = leaves.partition_point(|leaf| leaf.hash().min_namespace() < namespace);
        let end = start
            + leaves[start..].partition_point(|leaf| leaf.hash().min_namespace() == namespace);
        start..end
    }

    /// Returns the payloads of every leaf of `namespace`, in push order
    pub fn get(&self, namespace: NamespaceId<NS_ID_SIZE>) -> Vec<Vec<u8>> {
        self.inner.get_leaves(self.namespace_range(namespace))
    }

    /// Builds a proof that the tree holds exactly the leaves of `namespace`, or none of them.
    ///
    /// On an empty tree this returns an absence proof with no supporting nodes.
    pub fn prove_namespace(&self, namespace: NamespaceId<NS_ID_SIZE>) -> NamespaceProof<NS_ID_SIZE> {
        let range = self.namespace_range(namespace);
        let siblings = self.inner.range_proof_siblings(&range);
        tracing::trace!(
            namespace = ?namespace,
            start = range.start,
            end = range.end,
            nodes = siblings.len(),
            "built namespace proof"
        );
        // pushes stop at MAX_LEAVES, so every index fits in a u32
        NamespaceProof::from_range_proof(Proof {
            siblings,
            range: range.start as u32..range.end as u32,
        })
    }

    /// Fetches every leaf of `namespace`, along with a proof of completeness
    pub fn get_namespace_with_proof(
        &self,
        namespace: NamespaceId<NS_ID_SIZE>,
    ) -> (Vec<Vec<u8>>, NamespaceProof<NS_ID_SIZE>) {
        let proof = self.prove_namespace(namespace);
        (self.inner.get_leaves(proof.leaf_range()), proof)
    }

    /// Fetches a contiguous range of leaves, along with a proof of inclusion
    pub fn get_range_with_proof(
        &self,
        leaf_range: Range<usize>,
    ) -> Result<(Vec<Vec<u8>>, NamespaceProof<NS_ID_SIZE>), RangeProofError> {
        let (leaves, proof) = self.inner.get_range_with_proof(leaf_range)?;
        Ok((leaves, NamespaceProof::from_range_proof(proof)))
    }

    /// Fetches the leaf at `idx`, along with a proof of inclusion
    pub fn get_index_with_proof(
        &self,
        idx: usize,
    ) -> Result<(Vec<u8>, NamespaceProof<NS_ID_SIZE>), RangeProofError> {
        let (leaf, proof) = self.inner.get_index_with_proof(idx)?;
        Ok((leaf, NamespaceProof::from_range_proof(proof)))
    }

    /// Returns the root of the empty tree under this tree's hasher
    pub fn empty_root(&self) -> NamespacedHash<NS_ID_SIZE> {
        self.inner.hasher().empty_root()
    }
}
