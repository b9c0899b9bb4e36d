//! The linear map proved by the sigma protocol.
//!
//! For a witness x = (v, w, r, d, e') and the public bridging commitments
//! c_0..c_{N-1} (with c_{-1} = h):
//!
//!   f(x) = ( g^v,
//!            g^w · Π_i g_i^{e'_i},
//!            { g^{r_i} · c_{i-1}^{e'_i} }_{i=0..N-1},
//!            g^d )
//!
//! f is a homomorphism from Z_q^{2N+3} into G^{N+3}, so
//! f(ω + c·x) = f(ω) · f(x)^c, which is what the verifier checks.

use mixnet_macros::track_modexps;
use num_bigint::BigUint;

use super::error::ProofError;
use crate::batching::ExpBatchEngine;
use crate::commitment::GeneralizedPedersenCommitmentScheme;
use crate::group::{GroupElement, GroupError, ZMod};

/// Witness or response of the sigma protocol.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Preimage {
    /// Sum of the commitment randomizers.
    pub v: BigUint,
    /// Inner product of the randomizers with the e-values.
    pub w: BigUint,
    /// Bridging-commitment randomizers.
    pub r: Vec<BigUint>,
    /// Randomness accumulated along the bridging chain.
    pub d: BigUint,
    /// Permuted e-values.
    pub e: Vec<BigUint>,
}

impl Preimage {
    /// Number of top-level components: (v, w, r, d, e).
    pub const ARITY: usize = 5;

    pub fn size(&self) -> usize {
        self.r.len()
    }

    /// `self + c · other` componentwise in `ring`.
    pub fn add_scaled(&self, c: &BigUint, other: &Preimage, ring: &ZMod) -> Preimage {
        let combine = |a: &BigUint, b: &BigUint| ring.add(a, &ring.mul(c, b));
        Preimage {
            v: combine(&self.v, &other.v),
            w: combine(&self.w, &other.w),
            r: self.r.iter().zip(&other.r).map(|(a, b)| combine(a, b)).collect(),
            d: combine(&self.d, &other.d),
            e: self.e.iter().zip(&other.e).map(|(a, b)| combine(a, b)).collect(),
        }
    }

    pub(crate) fn scalars(&self) -> impl Iterator<Item = &BigUint> {
        [&self.v, &self.w, &self.d]
            .into_iter()
            .chain(self.r.iter())
            .chain(self.e.iter())
    }
}

/// f for one set of bridging commitments.
pub struct PreimageProofFunction<'a> {
    pedersen: &'a GeneralizedPedersenCommitmentScheme,
    bridging: &'a [GroupElement],
}

impl<'a> PreimageProofFunction<'a> {
    pub fn new(
        pedersen: &'a GeneralizedPedersenCommitmentScheme,
        bridging: &'a [GroupElement],
    ) -> Self {
        Self { pedersen, bridging }
    }

    pub fn size(&self) -> usize {
        self.bridging.len()
    }

    /// Length of the image: N + 3.
    pub fn image_len(&self) -> usize {
        self.size() + 3
    }

    /// Evaluates f. The commitment and link components each run as one batched
    /// window; `g^v` and `g^d` are computed directly.
    #[track_modexps(target = "zk_mixnet::permutation_proof::preimage", counter = "engine")]
    pub fn apply(
        &self,
        engine: &ExpBatchEngine<'_>,
        x: &Preimage,
    ) -> Result<Vec<GroupElement>, ProofError> {
        let n = self.size();
        if x.r.len() != n || x.e.len() != n {
            return Err(ProofError::InvalidArgument(format!(
                "preimage of size ({}, {}) for a function of size {n}",
                x.r.len(),
                x.e.len()
            )));
        }

        let group = self.pedersen.group();
        let g = self.pedersen.randomization_generator();
        let h = &self.pedersen.message_generators()[0];

        let mut image = Vec::with_capacity(self.image_len());
        image.push(group.self_apply(engine, g, &x.v)?);

        let commitment = engine.run_batched("preimage_commitment", || {
            self.pedersen.commit(engine, &x.e, &x.w)
        })?;
        image.push(commitment);

        let links = engine.run_batched("preimage_links", || {
            (0..n)
                .map(|i| {
                    let previous = if i == 0 { h } else { &self.bridging[i - 1] };
                    let blinding = group.self_apply(engine, g, &x.r[i])?;
                    let carried = group.self_apply(engine, previous, &x.e[i])?;
                    group.apply(&blinding, &carried)
                })
                .collect::<Result<Vec<_>, GroupError>>()
        })?;
        image.extend(links);

        image.push(group.self_apply(engine, g, &x.d)?);
        Ok(image)
    }
}
