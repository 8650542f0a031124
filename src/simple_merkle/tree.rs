use super::error::RangeProofError;
use super::proof::Proof;
use super::utils::{classify, split_point, Overlap};
use crate::maybestd::{fmt::Debug, hash::Hash, ops::Range, vec::Vec};

/// Manually implement the method we need from #[feature(slice_take)] to
/// allow building with stable;
trait TakeFirst<T> {
    fn slice_take_first<'a>(self: &mut &'a Self) -> Option<&'a T>;
}

impl<T> TakeFirst<T> for [T] {
    fn slice_take_first<'a>(self: &mut &'a Self) -> Option<&'a T> {
        let (first, rem) = self.split_first()?;
        *self = rem;
        Some(first)
    }
}

/// A trait for hashing data into a merkle tree
pub trait MerkleHash {
    /// The output of this hasher.
    type Output: Debug + PartialEq + Eq + Clone + Default + Hash;

    /// The root of the empty tree. This is often defined as the hash of the empty string.
    fn empty_root(&self) -> Self::Output;

    /// Hashes two digests into one. This operation *should* be domain separated.
    ///
    /// Callers building a tree from trusted leaves may call this directly. Digests that come
    /// from a proof must pass [`MerkleHash::check_children`] first.
    fn hash_nodes(&self, l: &Self::Output, r: &Self::Output) -> Self::Output;

    /// Checks that two digests may be siblings, with `l` on the left.
    fn check_children(&self, _l: &Self::Output, _r: &Self::Output) -> Result<(), RangeProofError> {
        Ok(())
    }
}

/// A leaf's raw data, stored next to its digest.
#[derive(Debug, Clone, PartialEq)]
pub struct LeafWithHash<M: MerkleHash> {
    data: Vec<u8>,
    hash: M::Output,
}

impl<M: MerkleHash> LeafWithHash<M> {
    /// Pairs `data` with a digest computed by the caller
    pub fn new(data: Vec<u8>, hash: M::Output) -> Self {
        Self { data, hash }
    }

    /// Returns the raw data of the leaf
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Returns the digest of the leaf
    pub fn hash(&self) -> &M::Output {
        &self.hash
    }
}

/// A merkle tree over an ordered sequence of pre-hashed leaves.
///
/// The shape is fixed by the leaf count alone: a range of `n >= 2` leaves splits into a left
/// part of `next_power_of_two(n) / 2` leaves and a right part holding the rest. No padding
/// leaves are ever introduced.
pub struct MerkleTree<M>
where
    M: MerkleHash,
{
    leaves: Vec<LeafWithHash<M>>,
    root: Option<M::Output>,
    hasher: M,
}

impl<M: MerkleHash + Default> Default for MerkleTree<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> MerkleTree<M>
where
    M: MerkleHash + Default,
{
    /// Constructs an empty merkle tree with a default hasher
    pub fn new() -> Self {
        Self::with_hasher(Default::default())
    }
}

impl<M> MerkleTree<M>
where
    M: MerkleHash,
{
    /// Constructs an empty merkle tree with the given hasher
    pub fn with_hasher(hasher: M) -> Self {
        Self {
            leaves: Vec::new(),
            root: None,
            hasher,
        }
    }

    /// Returns the hasher used by this tree
    pub fn hasher(&self) -> &M {
        &self.hasher
    }

    /// Appends a pre-hashed leaf to the tree
    pub fn push_leaf_with_hash(&mut self, leaf_with_hash: LeafWithHash<M>) {
        self.root = None;
        self.leaves.push(leaf_with_hash);
    }

    /// Returns the root of the tree, computing it if necessary. Repeated queries return a cached result.
    pub fn root(&mut self) -> M::Output {
        if let Some(inner) = &self.root {
            return inner.clone();
        }
        let inner = self.compute_root();
        self.root = Some(inner.clone());
        inner
    }

    /// Computes the root from scratch, without touching the cache.
    pub fn compute_root(&self) -> M::Output {
        tracing::trace!(leaves = self.leaves.len(), "computing merkle root");
        self.subtree_root(0..self.leaves.len())
    }

    /// Returns the requested range of leaves
    pub fn get_leaves(&self, range: Range<usize>) -> Vec<Vec<u8>> {
        let leaves = &self.leaves[range];
        leaves.iter().map(|leaf| leaf.data().to_vec()).collect()
    }

    /// Returns all leaves in the tree
    pub fn leaves(&self) -> &[LeafWithHash<M>] {
        &self.leaves[..]
    }

    /// Returns the number of leaves in the tree
    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    /// Returns true if no leaf has been pushed yet
    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    fn subtree_root(&self, leaf_range: Range<usize>) -> M::Output {
        match leaf_range.len() {
            0 => self.hasher.empty_root(),
            1 => self.leaves[leaf_range.start].hash().clone(),
            _ => {
                let split = split_point(&leaf_range);
                let left = self.subtree_root(leaf_range.start..split);
                let right = self.subtree_root(split..leaf_range.end);
                self.hasher.hash_nodes(&left, &right)
            }
        }
    }

    fn build_range_proof_inner(
        &self,
        range_to_prove: &Range<usize>,
        subtree_range: Range<usize>,
        out: &mut Vec<M::Output>,
    ) {
        match classify(&subtree_range, range_to_prove) {
            Overlap::Disjoint => out.push(self.subtree_root(subtree_range)),
            // The verifier rebuilds this subtree from the leaves it is given
            Overlap::Contained => {}
            Overlap::Partial => {
                let split = split_point(&subtree_range);
                self.build_range_proof_inner(range_to_prove, subtree_range.start..split, out);
                self.build_range_proof_inner(range_to_prove, split..subtree_range.end, out);
            }
        }
    }

    /// Creates a range proof providing the sibling hashes required to show that a set of values really does occur in
    /// the merkle tree at some half-open range of indices. Intermediate hashes are returned in left-to-right order.
    ///
    /// Example: consider the following merkle tree with leaves [C, D, E, F]
    /// ```ascii
    ///          root
    ///        /      \
    ///       A        B
    ///      / \      /  \
    ///     C   D    E    F
    ///
    /// ```
    ///
    /// A range proof of build_range_proof(1..3) would return the vector [C, F], since those two hashes, together
    /// with the two leaves in the range, are sufficient to reconstruct the tree.
    ///
    /// An empty range `k..k` proves nothing about any leaf. Its siblings are the roots of the
    /// largest subtrees that end at or start at `k`, which is what an absence proof needs.
    pub fn build_range_proof(
        &self,
        leaf_range: Range<usize>,
    ) -> Result<Proof<M::Output>, RangeProofError> {
        if leaf_range.start > leaf_range.end || leaf_range.end > self.leaves.len() {
            return Err(RangeProofError::MalformedProof(
                "range is not contained in the tree",
            ));
        }
        let start = u32::try_from(leaf_range.start).map_err(|_| RangeProofError::TreeTooLarge)?;
        let end = u32::try_from(leaf_range.end).map_err(|_| RangeProofError::TreeTooLarge)?;
        Ok(Proof {
            siblings: self.range_proof_siblings(&leaf_range),
            range: start..end,
        })
    }

    /// Collects the supporting nodes for a range already known to lie inside the tree.
    pub(crate) fn range_proof_siblings(&self, leaf_range: &Range<usize>) -> Vec<M::Output> {
        let mut siblings = Vec::new();
        if !self.leaves.is_empty() {
            self.build_range_proof_inner(leaf_range, 0..self.leaves.len(), &mut siblings);
        }
        siblings
    }

    /// Fetches the requested range of leaves, along with a proof of correctness.
    pub fn get_range_with_proof(
        &self,
        leaf_range: Range<usize>,
    ) -> Result<(Vec<Vec<u8>>, Proof<M::Output>), RangeProofError> {
        let proof = self.build_range_proof(leaf_range.clone())?;
        Ok((self.get_leaves(leaf_range), proof))
    }

    /// Fetches the leaf at the given index, along with a proof of inclusion.
    pub fn get_index_with_proof(
        &self,
        idx: usize,
    ) -> Result<(Vec<u8>, Proof<M::Output>), RangeProofError> {
        let end = idx.checked_add(1).ok_or(RangeProofError::MalformedProof(
            "range is not contained in the tree",
        ))?;
        let proof = self.build_range_proof(idx..end)?;
        Ok((self.leaves[idx].data().to_vec(), proof))
    }

    /// Rebuilds the root of the subtree covering `subtree_range`, consuming proven leaves and
    /// supporting nodes from the front of the two slices.
    fn check_range_proof_inner(
        &self,
        subtree_range: Range<usize>,
        range_to_prove: &Range<usize>,
        leaves: &mut &[M::Output],
        proof: &mut &[M::Output],
    ) -> Result<M::Output, RangeProofError> {
        match classify(&subtree_range, range_to_prove) {
            Overlap::Disjoint => proof
                .slice_take_first()
                .ok_or(RangeProofError::MissingProofNode)
                .cloned(),
            Overlap::Contained if subtree_range.len() == 1 => leaves
                .slice_take_first()
                .ok_or(RangeProofError::MissingLeaf)
                .cloned(),
            Overlap::Contained | Overlap::Partial => {
                let split = split_point(&subtree_range);
                let left = self.check_range_proof_inner(
                    subtree_range.start..split,
                    range_to_prove,
                    leaves,
                    proof,
                )?;
                let right = self.check_range_proof_inner(
                    split..subtree_range.end,
                    range_to_prove,
                    leaves,
                    proof,
                )?;
                self.hasher.check_children(&left, &right)?;
                Ok(self.hasher.hash_nodes(&left, &right))
            }
        }
    }

    /// Rebuilds the root of a tree of `tree_size` leaves from the leaves in `leaf_range` and
    /// the supporting nodes of a proof.
    ///
    /// Every supporting node must be consumed exactly once, in order.
    pub fn reconstruct_root(
        &self,
        leaves: &[M::Output],
        proof: &[M::Output],
        leaf_range: Range<usize>,
        tree_size: usize,
    ) -> Result<M::Output, RangeProofError> {
        if leaf_range.start > leaf_range.end || leaf_range.end > tree_size {
            return Err(RangeProofError::MalformedProof(
                "range is not contained in the tree",
            ));
        }
        if leaves.len() != leaf_range.len() {
            return Err(RangeProofError::WrongAmountOfLeavesProvided);
        }
        if tree_size == 0 {
            if !proof.is_empty() {
                return Err(RangeProofError::MalformedProof(
                    "empty tree has no supporting nodes",
                ));
            }
            return Ok(self.hasher.empty_root());
        }
        let mut leaves = leaves;
        let mut proof = proof;
        let root =
            self.check_range_proof_inner(0..tree_size, &leaf_range, &mut leaves, &mut proof)?;
        if !proof.is_empty() {
            return Err(RangeProofError::MalformedProof("unused supporting nodes"));
        }
        Ok(root)
    }

    /// Checks a given range proof
    pub fn check_range_proof(
        &self,
        root: &M::Output,
        leaves: &[M::Output],
        proof: &[M::Output],
        leaf_range: Range<usize>,
        tree_size: usize,
    ) -> Result<(), RangeProofError> {
        let computed_root = self.reconstruct_root(leaves, proof, leaf_range, tree_size)?;
        if &computed_root == root {
            return Ok(());
        }
        Err(RangeProofError::InvalidRoot)
    }
}
