extern crate self as zk_mixnet;

pub mod batching;
pub mod challenge;
pub mod commitment;
pub mod config;
pub mod encryption;
pub mod group;
pub mod macros;
pub mod permutation;
pub mod permutation_proof;

#[cfg(test)]
pub mod test_utils;

pub use batching::{ExpBatchEngine, ModExp, ModExpBackend, ParallelBackend, SequentialBackend};
pub use config::{GroupParameters, ProofSystemConfig};
pub use group::{GroupElement, SchnorrGroup};
pub use permutation::Permutation;
pub use permutation_proof::{
    PermutationCommitmentProof, PermutationCommitmentProofSystem, ProofError,
};
