use crate::maybestd::vec::Vec;

/// Errors raised while building a tree or decoding its types from bytes.
///
/// Verification failures are reported separately, as
/// [`RangeProofError`](crate::simple_merkle::error::RangeProofError).
#[derive(Debug, PartialEq, Eq, Clone, thiserror::Error)]
pub enum NmtError {
    /// A leaf was pushed with a namespace lower than the one before it
    #[error("namespace {attempted:02x?} is lower than the last pushed namespace {last:02x?}")]
    OrderViolation {
        /// Namespace of the last accepted leaf
        last: Vec<u8>,
        /// Namespace of the rejected leaf
        attempted: Vec<u8>,
    },
    /// A namespace was built from the wrong number of bytes
    #[error("expected a namespace of {expected} bytes, got {actual}")]
    InvalidNamespaceSize {
        /// Width of the tree's namespaces
        expected: usize,
        /// Width supplied
        actual: usize,
    },
    /// A namespaced leaf is shorter than its own namespace prefix
    #[error("leaf of {len} bytes cannot hold a {namespace_size}-byte namespace")]
    LeafTooShort {
        /// Width of the namespace prefix
        namespace_size: usize,
        /// Length of the leaf
        len: usize,
    },
    /// A namespaced hash was decoded from a slice of the wrong length
    #[error("invalid namespaced hash of {len} bytes")]
    InvalidNamespacedHash {
        /// Length of the rejected slice
        len: usize,
    },
    /// The tree already holds as many leaves as a proof can index
    #[error("tree is full at {max} leaves")]
    TreeFull {
        /// Maximum number of leaves
        max: usize,
    },
    /// An encoded proof could not be decoded
    #[error("malformed encoding: {0}")]
    MalformedEncoding(&'static str),
}
