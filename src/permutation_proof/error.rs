use thiserror::Error;

use crate::batching::BatchError;
use crate::challenge::ChallengeError;
use crate::commitment::CommitmentError;
use crate::config::ConfigError;
use crate::group::GroupError;
use crate::permutation::PermutationError;

#[derive(Error, Debug)]
pub enum ProofError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Group error: {0}")]
    Group(#[from] GroupError),

    #[error("Batching error: {0}")]
    Batch(#[from] BatchError),

    #[error("Permutation error: {0}")]
    Permutation(#[from] PermutationError),

    #[error("Challenge error: {0}")]
    Challenge(#[from] ChallengeError),

    #[error("Commitment error: {0}")]
    Commitment(#[from] CommitmentError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
