//! A plain binary merkle tree over pre-hashed leaves, shaped by the largest-power-of-two split
//! rule, together with range proofs over it. The namespaced tree is built on top of this module.

/// Reasons a range proof can be rejected.
pub mod error;
/// Range proofs and their sibling accessors.
pub mod proof;
/// The tree, its hasher trait, and the proof walks.
pub mod tree;
/// Index arithmetic shared by the prover and the verifier.
pub mod utils;
