//! Pedersen-style vector and permutation commitments over a Schnorr group.
//!
//! Both schemes share one generator list `(g, g_1, …, g_N)`: `g` carries the
//! randomness and `g_1..g_N` carry the message coordinates.
//!
//!   Com(m; r)      = g^r · Π_i g_i^{m_i}
//!   Com_π(s)_i     = g^{s_i} · g_{π(i)}

use std::sync::Arc;

use num_bigint::BigUint;
use thiserror::Error;

use crate::batching::{BatchError, ModExp, ModExpBackend};
use crate::group::{derive_generators, GroupElement, GroupError, SchnorrGroup};
use crate::permutation::Permutation;

const LOG_TARGET: &str = "zk_mixnet::commitment";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommitmentError {
    #[error("Length mismatch: expected {expected}, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("A commitment scheme needs at least two generators, got {0}")]
    NotEnoughGenerators(usize),

    #[error("Group error: {0}")]
    Group(#[from] GroupError),
}

impl From<BatchError> for CommitmentError {
    fn from(err: BatchError) -> Self {
        CommitmentError::Group(GroupError::Batch(err))
    }
}

/// Com(m; r) = g^r · Π g_i^{m_i} for messages of a fixed length.
#[derive(Clone, Debug)]
pub struct GeneralizedPedersenCommitmentScheme {
    group: SchnorrGroup,
    generators: Arc<[GroupElement]>,
}

impl GeneralizedPedersenCommitmentScheme {
    /// `generators[0]` is the randomization generator, the rest are message
    /// generators.
    pub fn new(group: SchnorrGroup, generators: Arc<[GroupElement]>) -> Result<Self, CommitmentError> {
        if generators.len() < 2 {
            return Err(CommitmentError::NotEnoughGenerators(generators.len()));
        }
        if generators.iter().any(|g| g.group() != &group) {
            return Err(GroupError::InvalidElement.into());
        }
        Ok(Self { group, generators })
    }

    /// Scheme for messages of length `size`, with generators derived from `seed`.
    pub fn derive<B: ModExpBackend + ?Sized>(
        group: SchnorrGroup,
        seed: &[u8],
        size: usize,
        backend: &B,
    ) -> Result<Self, CommitmentError> {
        let generators = derive_generators(&group, seed, size + 1, backend)?;
        Self::new(group, generators)
    }

    pub fn group(&self) -> &SchnorrGroup {
        &self.group
    }

    pub fn size(&self) -> usize {
        self.generators.len() - 1
    }

    pub fn randomization_generator(&self) -> &GroupElement {
        &self.generators[0]
    }

    pub fn message_generators(&self) -> &[GroupElement] {
        &self.generators[1..]
    }

    pub fn generators(&self) -> &Arc<[GroupElement]> {
        &self.generators
    }

    pub fn commit<E: ModExp + ?Sized>(
        &self,
        exp: &E,
        messages: &[BigUint],
        randomization: &BigUint,
    ) -> Result<GroupElement, CommitmentError> {
        if messages.len() != self.size() {
            return Err(CommitmentError::SizeMismatch {
                expected: self.size(),
                actual: messages.len(),
            });
        }
        let blinding = self
            .group
            .self_apply(exp, self.randomization_generator(), randomization)?;
        let body = self
            .group
            .product_of_powers(exp, self.message_generators(), messages)?;
        Ok(self.group.apply(&blinding, &body)?)
    }
}

/// Commitment to a permutation: position `i` holds `g^{s_i} · g_{π(i)}`.
#[derive(Clone, Debug)]
pub struct PermutationCommitmentScheme {
    pedersen: GeneralizedPedersenCommitmentScheme,
}

impl PermutationCommitmentScheme {
    pub fn new(pedersen: GeneralizedPedersenCommitmentScheme) -> Self {
        Self { pedersen }
    }

    pub fn derive<B: ModExpBackend + ?Sized>(
        group: SchnorrGroup,
        seed: &[u8],
        size: usize,
        backend: &B,
    ) -> Result<Self, CommitmentError> {
        Ok(Self::new(GeneralizedPedersenCommitmentScheme::derive(
            group, seed, size, backend,
        )?))
    }

    pub fn size(&self) -> usize {
        self.pedersen.size()
    }

    pub fn pedersen(&self) -> &GeneralizedPedersenCommitmentScheme {
        &self.pedersen
    }

    /// One exponentiation per position, in position order.
    pub fn commit<E: ModExp + ?Sized>(
        &self,
        exp: &E,
        permutation: &Permutation,
        randomization: &[BigUint],
    ) -> Result<Vec<GroupElement>, CommitmentError> {
        let size = self.size();
        if permutation.len() != size {
            return Err(CommitmentError::SizeMismatch {
                expected: size,
                actual: permutation.len(),
            });
        }
        if randomization.len() != size {
            return Err(CommitmentError::SizeMismatch {
                expected: size,
                actual: randomization.len(),
            });
        }

        let group = self.pedersen.group();
        let g = self.pedersen.randomization_generator();
        let message_generators = self.pedersen.message_generators();

        let commitment = randomization
            .iter()
            .enumerate()
            .map(|(i, s_i)| {
                let blinding = group.self_apply(exp, g, s_i)?;
                group.apply(&blinding, &message_generators[permutation.apply(i)])
            })
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(target: LOG_TARGET, size, "Committed to permutation");
        Ok(commitment)
    }
}
