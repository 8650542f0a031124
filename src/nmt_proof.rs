use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::maybestd::{ops::Range, vec::Vec};
use crate::{
    error::NmtError,
    namespaced_data::NamespacedData,
    namespaced_hash::{NamespaceId, NamespaceMerkleHasher, NamespacedHash},
    simple_merkle::{
        error::RangeProofError,
        proof::Proof,
        tree::MerkleTree,
    },
};

/// Size of the `start || end || count` header of an encoded proof
const HEADER_LEN: usize = 12;

/// A proof of some statement about a namespaced merkle tree.
///
/// This proof may prove the presence of some set of leaves, or the
/// absence of a particular namespace. It holds no reference to the tree it came from.
#[derive(Debug, PartialEq, Eq, Clone)]
#[cfg_attr(
    feature = "borsh",
    derive(borsh::BorshSerialize, borsh::BorshDeserialize)
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NamespaceProof<const NS_ID_SIZE: usize> {
    /// No leaf carries the namespace. The range is empty and marks where such leaves would go.
    AbsenceProof {
        /// The siblings around the insertion point
        proof: Proof<NamespacedHash<NS_ID_SIZE>>,
    },
    /// The range holds every leaf of the namespace.
    PresenceProof {
        /// The siblings around the namespace's leaves
        proof: Proof<NamespacedHash<NS_ID_SIZE>>,
    },
}

impl<const NS_ID_SIZE: usize> NamespaceProof<NS_ID_SIZE> {
    /// Wraps a range proof, marking it as a proof of absence if its range is empty
    pub fn from_range_proof(proof: Proof<NamespacedHash<NS_ID_SIZE>>) -> Self {
        if proof.range.is_empty() {
            Self::AbsenceProof { proof }
        } else {
            Self::PresenceProof { proof }
        }
    }

    /// Verify that the provided *raw* leaves are exactly the leaves of `namespace`, using this proof.
    ///
    /// `leaf_count` is the number of leaves in the tree committed to by `root`. It fixes the shape
    /// of the tree, so it must come from the same trusted source as the root. Each raw leaf is
    /// hashed under `namespace`. For a proof of absence, `raw_leaves` must be empty.
    pub fn verify_complete_namespace<M>(
        &self,
        hasher: M,
        root: &NamespacedHash<NS_ID_SIZE>,
        leaf_count: usize,
        raw_leaves: &[impl AsRef<[u8]>],
        namespace: NamespaceId<NS_ID_SIZE>,
    ) -> Result<(), RangeProofError>
    where
        M: NamespaceMerkleHasher<NS_ID_SIZE>,
    {
        let proof = self.merkle_proof();
        if proof.range.start > proof.range.end {
            return Err(RangeProofError::MalformedProof("start is greater than end"));
        }
        if proof.end_idx() as usize > leaf_count {
            return Err(RangeProofError::MalformedProof(
                "range is not contained in the tree",
            ));
        }
        if self.is_of_absence() != proof.range.is_empty() {
            return Err(RangeProofError::MalformedProof(
                "proof kind does not match its range",
            ));
        }
        if raw_leaves.len() != proof.range_len() {
            return Err(RangeProofError::WrongAmountOfLeavesProvided);
        }

        if self.is_of_absence() {
            return verify_absence(hasher, proof, root, leaf_count, namespace);
        }

        let leaf_hashes: Vec<_> = raw_leaves
            .iter()
            .map(|data| hasher.hash_leaf_with_namespace(data.as_ref(), namespace))
            .collect();
        let tree = MerkleTree::with_hasher(hasher);
        tree.check_range_proof(
            root,
            &leaf_hashes,
            proof.siblings(),
            proof.leaf_range(),
            leaf_count,
        )?;

        // The siblings next to the range must not hide any more leaves of the namespace
        if let Some(left) = proof.rightmost_left_sibling() {
            if left.max_namespace() >= namespace {
                return Err(RangeProofError::MissingLeaf);
            }
        }
        if let Some(right) = proof.leftmost_right_sibling() {
            if right.min_namespace() <= namespace {
                return Err(RangeProofError::MissingLeaf);
            }
        }
        Ok(())
    }

    /// Verify namespace-prefixed leaves against this proof. Every leaf must carry `namespace`.
    pub fn verify_namespaced_data<M, D>(
        &self,
        hasher: M,
        root: &NamespacedHash<NS_ID_SIZE>,
        leaf_count: usize,
        leaves: &[D],
        namespace: NamespaceId<NS_ID_SIZE>,
    ) -> Result<(), RangeProofError>
    where
        M: NamespaceMerkleHasher<NS_ID_SIZE>,
        D: NamespacedData,
    {
        if leaves
            .iter()
            .any(|leaf| leaf.namespace_id() != namespace.as_ref())
        {
            return Err(RangeProofError::NamespaceMismatch);
        }
        let raw_leaves: Vec<&[u8]> = leaves.iter().map(|leaf| leaf.data()).collect();
        self.verify_complete_namespace(hasher, root, leaf_count, raw_leaves.as_slice(), namespace)
    }

    /// Returns whether the proof shows that `raw_leaves` are exactly the leaves of `namespace`.
    ///
    /// Never panics on malformed input. The reason for a rejection is logged at debug level.
    pub fn verify_namespace<M>(
        &self,
        hasher: M,
        root: &NamespacedHash<NS_ID_SIZE>,
        leaf_count: usize,
        raw_leaves: &[impl AsRef<[u8]>],
        namespace: NamespaceId<NS_ID_SIZE>,
    ) -> bool
    where
        M: NamespaceMerkleHasher<NS_ID_SIZE>,
    {
        match self.verify_complete_namespace(hasher, root, leaf_count, raw_leaves, namespace) {
            Ok(()) => true,
            Err(error) => {
                tracing::debug!(
                    %error,
                    namespace = ?namespace,
                    start = self.start_idx(),
                    end = self.end_idx(),
                    "namespace proof rejected"
                );
                false
            }
        }
    }

    /// Verify that the raw leaves occur in the tree at the proven range. Unlike
    /// [`Self::verify_complete_namespace`], this says nothing about leaves outside the range.
    pub fn verify_range<M>(
        &self,
        hasher: M,
        root: &NamespacedHash<NS_ID_SIZE>,
        leaf_count: usize,
        raw_leaves: &[impl AsRef<[u8]>],
        leaf_namespace: NamespaceId<NS_ID_SIZE>,
    ) -> Result<(), RangeProofError>
    where
        M: NamespaceMerkleHasher<NS_ID_SIZE>,
    {
        if self.is_of_absence() {
            return Err(RangeProofError::MalformedProof(
                "an absence proof covers no leaves",
            ));
        };

        let leaf_hashes: Vec<_> = raw_leaves
            .iter()
            .map(|data| hasher.hash_leaf_with_namespace(data.as_ref(), leaf_namespace))
            .collect();
        self.merkle_proof()
            .verify_range_with_hasher(root, leaf_count, &leaf_hashes, hasher)
    }

    /// Returns the wire encoding: `start || end || count` as big-endian u32s, followed by
    /// `count` nodes laid out as `min_ns || max_ns || hash`.
    pub fn encode(&self) -> Bytes {
        let proof = self.merkle_proof();
        let node_size = NamespacedHash::<NS_ID_SIZE>::size();
        let mut buf = BytesMut::with_capacity(HEADER_LEN + proof.siblings().len() * node_size);
        buf.put_u32(proof.start_idx());
        buf.put_u32(proof.end_idx());
        buf.put_u32(proof.siblings().len() as u32);
        for node in proof.siblings() {
            buf.put_slice(&node.to_bytes());
        }
        buf.freeze()
    }

    /// Decodes a proof produced by [`Self::encode`]. An empty range decodes as a proof of absence.
    pub fn decode(mut bytes: &[u8]) -> Result<Self, NmtError> {
        if bytes.remaining() < HEADER_LEN {
            return Err(NmtError::MalformedEncoding("truncated proof header"));
        }
        let start = bytes.get_u32();
        let end = bytes.get_u32();
        let count = bytes.get_u32() as usize;
        if start > end {
            return Err(NmtError::MalformedEncoding("start is greater than end"));
        }
        let node_size = NamespacedHash::<NS_ID_SIZE>::size();
        if count.checked_mul(node_size) != Some(bytes.remaining()) {
            return Err(NmtError::MalformedEncoding(
                "node count does not match the payload",
            ));
        }
        let siblings = bytes
            .chunks_exact(node_size)
            .map(NamespacedHash::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_range_proof(Proof {
            siblings,
            range: start..end,
        }))
    }

    fn merkle_proof(&self) -> &Proof<NamespacedHash<NS_ID_SIZE>> {
        match self {
            NamespaceProof::AbsenceProof { proof } | NamespaceProof::PresenceProof { proof } => {
                proof
            }
        }
    }

    /// Returns the supporting nodes, left to right
    pub fn siblings(&self) -> &[NamespacedHash<NS_ID_SIZE>] {
        self.merkle_proof().siblings()
    }

    /// Returns the index of the first leaf of the namespace, or the insertion point for absence
    pub fn start_idx(&self) -> u32 {
        self.merkle_proof().start_idx()
    }

    /// Returns the index after the last leaf of the namespace
    pub fn end_idx(&self) -> u32 {
        self.merkle_proof().end_idx()
    }

    /// Returns the proven range as indices into the leaves
    pub fn leaf_range(&self) -> Range<usize> {
        self.merkle_proof().leaf_range()
    }

    /// Returns the leftmost node to the right of the proven range, if one exists.
    pub fn leftmost_right_sibling(&self) -> Option<&NamespacedHash<NS_ID_SIZE>> {
        self.merkle_proof().leftmost_right_sibling()
    }

    /// Returns the rightmost node to the left of the proven range, if one exists.
    pub fn rightmost_left_sibling(&self) -> Option<&NamespacedHash<NS_ID_SIZE>> {
        self.merkle_proof().rightmost_left_sibling()
    }

    pub fn is_of_absence(&self) -> bool {
        match self {
            Self::AbsenceProof { .. } => true,
            Self::PresenceProof { .. } => false,
        }
    }

    pub fn is_of_presence(&self) -> bool {
        !self.is_of_absence()
    }
}

fn verify_absence<M, const NS_ID_SIZE: usize>(
    hasher: M,
    proof: &Proof<NamespacedHash<NS_ID_SIZE>>,
    root: &NamespacedHash<NS_ID_SIZE>,
    leaf_count: usize,
    namespace: NamespaceId<NS_ID_SIZE>,
) -> Result<(), RangeProofError>
where
    M: NamespaceMerkleHasher<NS_ID_SIZE>,
{
    let insertion_point = proof.start_idx() as usize;
    let tree = MerkleTree::with_hasher(hasher);
    tree.check_range_proof(root, &[], proof.siblings(), proof.leaf_range(), leaf_count)?;
    if leaf_count == 0 {
        return Ok(());
    }

    // Outside the tree's namespace range, the walk consumes the root as the only node
    let absent = if insertion_point == 0 {
        namespace < root.min_namespace()
    } else if insertion_point == leaf_count {
        namespace > root.max_namespace()
    } else {
        let left = proof
            .rightmost_left_sibling()
            .ok_or(RangeProofError::MissingProofNode)?;
        let right = proof
            .leftmost_right_sibling()
            .ok_or(RangeProofError::MissingProofNode)?;
        left.max_namespace() < namespace && namespace < right.min_namespace()
    };
    if absent {
        return Ok(());
    }
    Err(RangeProofError::NamespaceNotAbsent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespaced_data::PrefixedData;
    use crate::{NamespaceMerkleTree, NamespacedSha2Hasher};

    type Hasher = NamespacedSha2Hasher<1>;
    type Tree = NamespaceMerkleTree<Hasher, 1>;

    fn ns(byte: u8) -> NamespaceId<1> {
        NamespaceId([byte])
    }

    fn tree_from(leaves: &[(u8, &str)]) -> Tree {
        let mut tree = Tree::new();
        for (namespace, data) in leaves {
            tree.push_leaf(data.as_bytes(), ns(*namespace)).unwrap();
        }
        tree
    }

    const LEAVES: [(u8, &str); 7] = [
        (1, "a"),
        (1, "b"),
        (3, "c"),
        (3, "d"),
        (3, "e"),
        (6, "f"),
        (9, "g"),
    ];

    #[test]
    fn test_presence_proof_round_trip() {
        let mut tree = tree_from(&LEAVES);
        let root = tree.root();
        let proof = tree.prove_namespace(ns(3));
        assert!(proof.is_of_presence());
        assert_eq!(proof.leaf_range(), 2..5);
        assert_eq!(
            proof.verify_complete_namespace(Hasher::default(), &root, 7, &["c", "d", "e"], ns(3)),
            Ok(())
        );
    }

    #[test]
    fn test_incomplete_leaf_sets_are_rejected() {
        let mut tree = tree_from(&LEAVES);
        let root = tree.root();
        let proof = tree.prove_namespace(ns(3));
        assert_eq!(
            proof.verify_complete_namespace(Hasher::default(), &root, 7, &["c", "d"], ns(3)),
            Err(RangeProofError::WrongAmountOfLeavesProvided)
        );

        // A prover that drops the last leaf of the namespace is caught by the right sibling
        let narrowed = tree.inner().build_range_proof(2..4).unwrap();
        let narrowed = NamespaceProof::from_range_proof(narrowed);
        assert_eq!(
            narrowed.verify_complete_namespace(Hasher::default(), &root, 7, &["c", "d"], ns(3)),
            Err(RangeProofError::MissingLeaf)
        );
        // but the leaves are still included in the tree
        assert_eq!(
            narrowed.verify_range(Hasher::default(), &root, 7, &["c", "d"], ns(3)),
            Ok(())
        );
    }

    #[test]
    fn test_interior_absence_proof() {
        let mut tree = tree_from(&LEAVES);
        let root = tree.root();
        for (missing, insertion_point) in [(2u8, 2u32), (4, 5), (5, 5), (7, 6), (8, 6)] {
            let proof = tree.prove_namespace(ns(missing));
            assert!(proof.is_of_absence());
            assert_eq!(proof.start_idx(), insertion_point);
            assert_eq!(proof.end_idx(), insertion_point);
            let left = proof.rightmost_left_sibling().unwrap();
            let right = proof.leftmost_right_sibling().unwrap();
            assert!(left.max_namespace() < ns(missing));
            assert!(right.min_namespace() > ns(missing));
            let no_leaves: [&[u8]; 0] = [];
            assert!(proof.verify_namespace(Hasher::default(), &root, 7, &no_leaves, ns(missing)));

            let mut altered = root.hash();
            altered[31] ^= 0x80;
            let altered = NamespacedHash::new(root.min_namespace(), root.max_namespace(), altered);
            assert_eq!(
                proof.verify_complete_namespace(Hasher::default(), &altered, 7, &no_leaves, ns(missing)),
                Err(RangeProofError::InvalidRoot)
            );
        }
    }

    #[test]
    fn test_proofs_are_bound_to_their_position() {
        let mut tree = Tree::new();
        for namespace in 0..5 {
            tree.push_leaf(&[namespace], ns(namespace)).unwrap();
        }
        let root = tree.root();
        let honest = tree.prove_namespace(ns(4));
        assert_eq!(honest.leaf_range(), 4..5);
        assert!(honest.verify_namespace(Hasher::default(), &root, 5, &[[4u8]], ns(4)));

        // index 1 holds namespace 1, so the same nodes must not vouch for namespace 4 there
        let relocated = NamespaceProof::from_range_proof(Proof {
            siblings: honest.siblings().to_vec(),
            range: 1..2,
        });
        assert!(!relocated.verify_namespace(Hasher::default(), &root, 5, &[[4u8]], ns(4)));

        let past_the_end = NamespaceProof::from_range_proof(Proof {
            siblings: honest.siblings().to_vec(),
            range: 5..6,
        });
        assert_eq!(
            past_the_end.verify_complete_namespace(Hasher::default(), &root, 5, &[[4u8]], ns(4)),
            Err(RangeProofError::MalformedProof(
                "range is not contained in the tree"
            ))
        );
    }

    #[test]
    fn test_boundary_absence_must_sit_at_an_edge() {
        let mut tree = tree_from(&LEAVES);
        let root = tree.root();
        let no_leaves: [&[u8]; 0] = [];
        let above = tree.prove_namespace(ns(10));
        for insertion_point in [1u32, 3, 6] {
            let moved = NamespaceProof::from_range_proof(Proof {
                siblings: above.siblings().to_vec(),
                range: insertion_point..insertion_point,
            });
            assert!(!moved.verify_namespace(Hasher::default(), &root, 7, &no_leaves, ns(10)));
        }
        // the low edge only vouches for namespaces below the tree
        let below = tree.prove_namespace(ns(0));
        let moved = NamespaceProof::from_range_proof(Proof {
            siblings: below.siblings().to_vec(),
            range: 7..7,
        });
        assert_eq!(
            moved.verify_complete_namespace(Hasher::default(), &root, 7, &no_leaves, ns(0)),
            Err(RangeProofError::NamespaceNotAbsent)
        );
    }

    #[test]
    fn test_absence_proof_cannot_hide_a_present_namespace() {
        let mut tree = tree_from(&LEAVES);
        let root = tree.root();
        let no_leaves: [&[u8]; 0] = [];
        // the gap at index 5 lies between namespaces 3 and 6, not around 6
        let proof = tree.prove_namespace(ns(4));
        assert_eq!(
            proof.verify_complete_namespace(Hasher::default(), &root, 7, &no_leaves, ns(6)),
            Err(RangeProofError::NamespaceNotAbsent)
        );
        // a boundary proof is only valid outside the root's range
        let proof = tree.prove_namespace(ns(0));
        assert_eq!(
            proof.verify_complete_namespace(Hasher::default(), &root, 7, &no_leaves, ns(1)),
            Err(RangeProofError::NamespaceNotAbsent)
        );
    }

    #[test]
    fn test_boundary_absence_proofs() {
        let mut tree = tree_from(&LEAVES);
        let root = tree.root();
        let no_leaves: [&[u8]; 0] = [];

        let below = tree.prove_namespace(ns(0));
        assert_eq!(below.leaf_range(), 0..0);
        assert_eq!(below.siblings(), &[root.clone()]);
        assert!(below.verify_namespace(Hasher::default(), &root, 7, &no_leaves, ns(0)));

        let above = tree.prove_namespace(ns(10));
        assert_eq!(above.leaf_range(), 7..7);
        assert_eq!(above.siblings(), &[root.clone()]);
        assert!(above.verify_namespace(Hasher::default(), &root, 7, &no_leaves, ns(10)));
        // the low boundary cannot vouch for namespaces above the tree
        assert!(!below.verify_namespace(Hasher::default(), &root, 7, &no_leaves, ns(10)));
    }

    #[test]
    fn test_empty_tree_query() {
        let mut tree = Tree::new();
        let root = tree.root();
        let proof = tree.prove_namespace(ns(5));
        assert!(proof.is_of_absence());
        assert_eq!(proof.leaf_range(), 0..0);
        assert!(proof.siblings().is_empty());
        let no_leaves: [&[u8]; 0] = [];
        assert!(proof.verify_namespace(Hasher::default(), &root, 0, &no_leaves, ns(5)));

        let other_root = tree_from(&LEAVES).root();
        assert!(!proof.verify_namespace(Hasher::default(), &other_root, 7, &no_leaves, ns(5)));
        assert!(!proof.verify_namespace(Hasher::default(), &other_root, 0, &no_leaves, ns(5)));
    }

    #[test]
    fn test_mismatched_kind_and_range_are_malformed() {
        let mut tree = tree_from(&LEAVES);
        let root = tree.root();
        let proof = tree.prove_namespace(ns(3));
        let NamespaceProof::PresenceProof { proof: inner } = proof else {
            panic!("expected a presence proof")
        };
        let relabeled = NamespaceProof::AbsenceProof { proof: inner };
        assert!(matches!(
            relabeled.verify_complete_namespace(Hasher::default(), &root, 7, &["c", "d", "e"], ns(3)),
            Err(RangeProofError::MalformedProof(_))
        ));

        let backwards = NamespaceProof::PresenceProof {
            proof: Proof {
                siblings: vec![],
                range: 4..2,
            },
        };
        let no_leaves: [&[u8]; 0] = [];
        assert_eq!(
            backwards.verify_complete_namespace(Hasher::default(), &root, 7, &no_leaves, ns(3)),
            Err(RangeProofError::MalformedProof("start is greater than end"))
        );
    }

    #[test]
    fn test_namespaced_data_must_match_the_query() {
        let mut tree = tree_from(&LEAVES);
        let root = tree.root();
        let proof = tree.prove_namespace(ns(1));
        let good = [
            PrefixedData::from_parts(&[1], b"a").unwrap(),
            PrefixedData::from_parts(&[1], b"b").unwrap(),
        ];
        assert_eq!(
            proof.verify_namespaced_data(Hasher::default(), &root, 7, &good, ns(1)),
            Ok(())
        );
        let bad = [
            PrefixedData::from_parts(&[1], b"a").unwrap(),
            PrefixedData::from_parts(&[2], b"b").unwrap(),
        ];
        assert_eq!(
            proof.verify_namespaced_data(Hasher::default(), &root, 7, &bad, ns(1)),
            Err(RangeProofError::NamespaceMismatch)
        );
    }

    #[test]
    fn test_wire_encoding() {
        let tree = tree_from(&LEAVES);
        for namespace in 0..=10 {
            let proof = tree.prove_namespace(ns(namespace));
            let encoded = proof.encode();
            assert_eq!(
                encoded.len(),
                HEADER_LEN + proof.siblings().len() * NamespacedHash::<1>::size()
            );
            assert_eq!(&encoded[0..4], &proof.start_idx().to_be_bytes());
            assert_eq!(&encoded[4..8], &proof.end_idx().to_be_bytes());
            if let Some(first) = proof.siblings().first() {
                assert_eq!(&encoded[HEADER_LEN..HEADER_LEN + 34], first.to_bytes().as_slice());
            }
            assert_eq!(NamespaceProof::<1>::decode(&encoded), Ok(proof));
        }
    }

    #[test]
    fn test_malformed_encodings() {
        let proof = tree_from(&LEAVES).prove_namespace(ns(3));
        let encoded = proof.encode();
        assert_eq!(
            NamespaceProof::<1>::decode(&encoded[..HEADER_LEN - 1]),
            Err(NmtError::MalformedEncoding("truncated proof header"))
        );
        assert_eq!(
            NamespaceProof::<1>::decode(&encoded[..encoded.len() - 1]),
            Err(NmtError::MalformedEncoding(
                "node count does not match the payload"
            ))
        );
        let mut swapped = encoded.to_vec();
        swapped[0..4].copy_from_slice(&9u32.to_be_bytes());
        assert_eq!(
            NamespaceProof::<1>::decode(&swapped),
            Err(NmtError::MalformedEncoding("start is greater than end"))
        );
        // decoding under a different namespace width misreads the node size
        assert!(NamespaceProof::<8>::decode(&encoded).is_err());
    }

    #[cfg(feature = "borsh")]
    #[test]
    fn test_namespace_proof_borsh() {
        let proof = tree_from(&LEAVES).prove_namespace(ns(4));
        let serialized = borsh::to_vec(&proof).expect("Serialization to vec must succeed");
        let got: NamespaceProof<1> =
            borsh::from_slice(&serialized).expect("serialized proof is correct");
        assert_eq!(got, proof);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_namespace_proof_serde() {
        let proof = tree_from(&LEAVES).prove_namespace(ns(3));
        let serialized = serde_json::to_vec(&proof).expect("Serialization to vec must succeed");
        let got: NamespaceProof<1> =
            serde_json::from_slice(&serialized).expect("serialized proof is correct");
        assert_eq!(got, proof);

        let serialized = postcard::to_allocvec(&proof).expect("Serialization to vec must succeed");
        let got: NamespaceProof<1> =
            postcard::from_bytes(&serialized).expect("serialized proof is correct");
        assert_eq!(got, proof);
    }
}
