/// An error that occurred while trying to check a claimed range proof for a merkle tree.
#[derive(Debug, PartialEq, Eq, Clone, Copy, thiserror::Error)]
pub enum RangeProofError {
    /// The proof claims a non-empty range, but no leaves were provided.
    #[error("no leaves provided for a non-empty range")]
    NoLeavesProvided,
    /// The proof is malformed - the number of leaves provided does not match the claimed size of the range
    #[error("number of leaves does not match the proven range")]
    WrongAmountOfLeavesProvided,
    /// The claimed proof does not verify against the provided root
    #[error("reconstructed root does not match the provided root")]
    InvalidRoot,
    /// The claimed range was invalid because it left out a leaf
    #[error("the proven range leaves out a leaf of the namespace")]
    MissingLeaf,
    /// The proof is missing a node that was needed for verification
    #[error("proof is missing a supporting node")]
    MissingProofNode,
    /// The claimed tree exceeds the maximum allowed size (currently 2^32 leaves)
    #[error("claimed tree exceeds 2^32 leaves")]
    TreeTooLarge,
    /// Indicates that the tree is not properly ordered by namespace
    #[error("sibling nodes are not ordered by namespace")]
    MalformedTree,
    /// A leaf supplied for verification carries a namespace other than the queried one
    #[error("leaf namespace differs from the queried namespace")]
    NamespaceMismatch,
    /// The nodes bounding an absence proof do not leave a gap for the queried namespace
    #[error("namespace is not absent from the tree")]
    NamespaceNotAbsent,
    /// A catch all error which indicates that the proof is malformed
    #[error("malformed proof: {0}")]
    MalformedProof(&'static str),
}
