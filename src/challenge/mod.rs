//! Fiat–Shamir challenge generation.
//!
//! Both generators hash a canonical transcript of their inputs with SHA-256 in
//! counter mode and reduce the output into their challenge space. Identical
//! inputs always give identical outputs, which prover and verifier rely on to
//! recompute the same values independently.

pub mod transcript;

use num_bigint::BigUint;
use num_traits::One;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::group::SchnorrGroup;
pub use transcript::{TranscriptBuilder, TranscriptEncode};

const LOG_TARGET: &str = "zk_mixnet::challenge";

const DOMAIN_ORACLE: &[u8] = b"zk_mixnet/oracle/v1";

/// Extra output bytes beyond the space size, so the final reduction is
/// statistically close to uniform.
const ORACLE_SLACK_BYTES: usize = 16;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChallengeError {
    #[error("Challenge bit length must be positive")]
    ZeroLength,

    #[error("Challenge space of {bits} bits exceeds the group order")]
    ExceedsGroupOrder { bits: u32 },
}

/// Z_m for the challenge modulus `m`, either `2^k` or a group order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChallengeSpace {
    modulus: BigUint,
}

impl ChallengeSpace {
    /// Z_{2^bits}.
    pub fn bits(bits: u32) -> Result<Self, ChallengeError> {
        if bits == 0 {
            return Err(ChallengeError::ZeroLength);
        }
        Ok(Self {
            modulus: BigUint::one() << bits,
        })
    }

    /// Z_q for the order of `group`.
    pub fn group_order(group: &SchnorrGroup) -> Self {
        Self {
            modulus: group.order().clone(),
        }
    }

    /// Z_{2^bits} when `bits` is set, otherwise Z_q. A power-of-two space must
    /// not exceed the group order.
    pub fn for_group(bits: Option<u32>, group: &SchnorrGroup) -> Result<Self, ChallengeError> {
        match bits {
            None => Ok(Self::group_order(group)),
            Some(bits) => {
                let space = Self::bits(bits)?;
                if &space.modulus > group.order() {
                    return Err(ChallengeError::ExceedsGroupOrder { bits });
                }
                Ok(space)
            }
        }
    }

    pub fn modulus(&self) -> &BigUint {
        &self.modulus
    }

    /// Bit length of the largest member.
    pub fn bit_length(&self) -> u64 {
        (&self.modulus - BigUint::one()).bits()
    }

    pub fn contains(&self, value: &BigUint) -> bool {
        value < &self.modulus
    }
}

/// SHA-256 random oracle with output in a chosen Z_m.
#[derive(Clone, Copy, Debug)]
pub struct RandomOracle {
    kind: &'static str,
}

impl RandomOracle {
    pub const fn new(kind: &'static str) -> Self {
        Self { kind }
    }

    /// Output number `index` for `input`, reduced modulo `modulus`.
    pub fn output(&self, input: &[u8], index: u64, modulus: &BigUint) -> BigUint {
        let mut prefix = Sha256::new();
        prefix.update(DOMAIN_ORACLE);
        prefix.update((self.kind.len() as u16).to_be_bytes());
        prefix.update(self.kind.as_bytes());
        prefix.update((input.len() as u64).to_be_bytes());
        prefix.update(input);
        prefix.update(index.to_be_bytes());

        let wanted = (modulus.bits() as usize).div_ceil(8) + ORACLE_SLACK_BYTES;
        let mut bytes = Vec::with_capacity(wanted + 32);
        let mut block = 0u32;
        while bytes.len() < wanted {
            let mut hasher = prefix.clone();
            hasher.update(block.to_be_bytes());
            bytes.extend_from_slice(&hasher.finalize());
            block += 1;
        }
        bytes.truncate(wanted);
        BigUint::from_bytes_be(&bytes) % modulus
    }
}

/// Sigma-protocol challenge from `(public input, commitment)`, optionally bound
/// to a prover identity.
#[derive(Clone, Debug)]
pub struct SigmaChallengeGenerator {
    space: ChallengeSpace,
    prover_id: Option<Vec<u8>>,
    oracle: RandomOracle,
}

impl SigmaChallengeGenerator {
    pub fn new(space: ChallengeSpace, prover_id: Option<Vec<u8>>) -> Self {
        Self {
            space,
            prover_id,
            oracle: RandomOracle::new("sigma_challenge"),
        }
    }

    pub fn space(&self) -> &ChallengeSpace {
        &self.space
    }

    pub fn generate<P, C>(&self, public_input: &P, commitment: &C) -> BigUint
    where
        P: TranscriptEncode + ?Sized,
        C: TranscriptEncode + ?Sized,
    {
        let mut builder = TranscriptBuilder::new("sigma_challenge");
        builder.append(public_input);
        builder.append(commitment);
        match &self.prover_id {
            Some(id) => {
                builder.append_u8(1);
                builder.append_bytes(id);
            }
            None => builder.append_u8(0),
        }
        let challenge = self
            .oracle
            .output(&builder.finish(), 0, self.space.modulus());
        tracing::trace!(target: LOG_TARGET, %challenge, "Derived sigma challenge");
        challenge
    }
}

/// Vector of `size` pseudo-random values from the public input.
#[derive(Clone, Debug)]
pub struct EValuesGenerator {
    space: ChallengeSpace,
    size: usize,
    oracle: RandomOracle,
}

impl EValuesGenerator {
    pub fn new(space: ChallengeSpace, size: usize) -> Self {
        Self {
            space,
            size,
            oracle: RandomOracle::new("e_values"),
        }
    }

    pub fn space(&self) -> &ChallengeSpace {
        &self.space
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn generate<P: TranscriptEncode + ?Sized>(&self, public_input: &P) -> Vec<BigUint> {
        let mut builder = TranscriptBuilder::new("e_values");
        builder.append_u64(self.size as u64);
        builder.append(public_input);
        let input = builder.finish();
        (0..self.size as u64)
            .map(|i| self.oracle.output(&input, i, self.space.modulus()))
            .collect()
    }
}
