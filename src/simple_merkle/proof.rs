use core::ops::Range;

use super::{
    error::RangeProofError,
    tree::{MerkleHash, MerkleTree},
    utils::compute_num_left_siblings,
};
use crate::maybestd::vec::Vec;

/// A proof that some contiguous range of leaves occurs in a merkle tree.
///
/// The siblings are listed left to right: first the roots of the subtrees covering
/// `0..range.start`, then the roots covering `range.end..`.
#[derive(Debug, PartialEq, Eq, Clone)]
#[cfg_attr(
    feature = "borsh",
    derive(borsh::BorshSerialize, borsh::BorshDeserialize)
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Proof<H> {
    /// The siblings to be used to build the path to the root.
    pub siblings: Vec<H>,
    /// The range of indices covered by the proof.
    pub range: Range<u32>,
}

impl<H> Default for Proof<H> {
    fn default() -> Self {
        Self {
            siblings: Default::default(),
            range: Default::default(),
        }
    }
}

impl<H: Clone + PartialEq> Proof<H> {
    /// Verify that `leaf_hashes` occupy this proof's range in the tree of `leaf_count` leaves
    /// with the given root.
    ///
    /// The leaf count fixes the shape of the tree, so it must come from the same trusted
    /// source as the root. This only shows inclusion. Nothing is said about the leaves
    /// outside the range.
    pub fn verify_range_with_hasher<M>(
        &self,
        root: &H,
        leaf_count: usize,
        leaf_hashes: &[H],
        hasher: M,
    ) -> Result<(), RangeProofError>
    where
        M: MerkleHash<Output = H>,
    {
        if leaf_hashes.len() != self.range_len() {
            return Err(RangeProofError::WrongAmountOfLeavesProvided);
        }
        // only the empty tree can be proven without a single leaf
        if self.range.is_empty() && leaf_count != 0 {
            return Err(RangeProofError::NoLeavesProvided);
        }
        let tree = MerkleTree::<M>::with_hasher(hasher);
        tree.check_range_proof(root, leaf_hashes, self.siblings(), self.leaf_range(), leaf_count)
    }

    /// Returns the siblings provided as part of the proof.
    pub fn siblings(&self) -> &Vec<H> {
        &self.siblings
    }

    /// Returns the index of the first leaf covered by the proof.
    pub fn start_idx(&self) -> u32 {
        self.range.start
    }

    /// Returns the index *after* the last leaf included in the proof.
    pub fn end_idx(&self) -> u32 {
        self.range.end
    }

    /// Returns the covered range as indices into the leaves.
    pub fn leaf_range(&self) -> Range<usize> {
        self.range.start as usize..self.range.end as usize
    }

    /// Returns the length of the range covered by the proof.
    pub fn range_len(&self) -> usize {
        self.range.end.saturating_sub(self.range.start) as usize
    }

    /// Returns the leftmost node to the right of the proven range, if one exists.
    pub fn leftmost_right_sibling(&self) -> Option<&H> {
        let num_left_siblings = compute_num_left_siblings(self.start_idx() as usize);
        self.siblings.get(num_left_siblings)
    }

    /// Returns the rightmost node to the left of the proven range, if one exists.
    pub fn rightmost_left_sibling(&self) -> Option<&H> {
        let num_left_siblings = compute_num_left_siblings(self.start_idx() as usize);
        if num_left_siblings != 0 && num_left_siblings <= self.siblings.len() {
            return Some(&self.siblings[num_left_siblings - 1]);
        }
        None
    }
}
