//! Non-interactive proof that a permutation commitment is well formed
//! (Terelius–Wikström, "Protocol 1: Permutation Matrix").
//!
//! Public input: a permutation commitment cπ with cπ_i = g^{s_i} · g_{π(i)}.
//! Private input: (π, s).
//!
//! ## Protocol
//!
//! With e-values e = H(cπ) and e' the e-values moved by π (e'_{π(i)} = e_i):
//!
//!   v = Σ s_i,   w = Σ s_i · e_i
//!   c_{-1} = h,  c_i = g^{r_i} · c_{i-1}^{e'_i}        (bridging commitments)
//!   d_0 = r_0,   d_i = r_i + d_{i-1} · e'_i,  d = d_{N-1}
//!
//! The prover shows knowledge of a preimage x = (v, w, r, d, e') of
//!
//!   y = ( Πcπ_i / Πg_i,  Πcπ_i^{e_i},  c_0..c_{N-1},  c_{N-1} / h^{Πe_i} )
//!
//! under the homomorphism f of [`preimage`], by a Schnorr-style proof made
//! non-interactive with Fiat–Shamir:
//!
//!   t = f(ω),   c = H(cπ, c_0..c_{N-1}, t),   z = ω + c·x
//!   accept iff  f(z) = t · y^c
//!
//! ## Security Properties
//! - Completeness: an honest prover always convinces an honest verifier.
//! - Soundness: the first component binds Σ s_i, the second binds the
//!   permuted e-values to cπ, and the chain binds Π e'_i = Π e_i. Together
//!   these force cπ to commit to a permutation matrix.
//! - HVZK: transcripts are simulatable; ω_e is drawn from a range 2^kr times
//!   larger than the e-values, hiding e' statistically.
//!
//! ## Batching
//! Every exponentiation goes through a per-call [`ExpBatchEngine`]. The
//! data-parallel parts (randomizer powers, both components of f that depend
//! on i, the inner product and the powers of y) each run as one batched
//! window. The bridging chain is inherently sequential and is computed
//! outside any window.

pub mod error;
pub mod preimage;


use std::sync::Arc;

use num_bigint::{BigUint, RandBigInt};
use rand::{CryptoRng, RngCore};

pub use error::ProofError;
pub use preimage::{Preimage, PreimageProofFunction};

use crate::batching::{ExpBatchEngine, ModExpBackend};
use crate::challenge::{ChallengeSpace, EValuesGenerator, SigmaChallengeGenerator};
use crate::commitment::{GeneralizedPedersenCommitmentScheme, PermutationCommitmentScheme};
use crate::config::ProofSystemConfig;
use crate::group::{derive_generators, GroupElement, GroupError, SchnorrGroup};
use crate::permutation::Permutation;
use crate::track_modexps;

const LOG_TARGET: &str = "zk_mixnet::permutation_proof";

/// Transcript of one permutation-commitment proof.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PermutationCommitmentProof {
    /// e-values the prover derived from the public input.
    pub e_values: Vec<BigUint>,
    /// Bridging commitments c_0..c_{N-1}.
    pub bridging_commitments: Vec<GroupElement>,
    /// Sigma commitment t = f(ω), N + 3 elements.
    pub commitment: Vec<GroupElement>,
    pub challenge: BigUint,
    pub response: Preimage,
}

/// Prover and verifier for permutation commitments of a fixed size.
pub struct PermutationCommitmentProofSystem {
    group: SchnorrGroup,
    size: usize,
    kr: u32,
    scheme: PermutationCommitmentScheme,
    sigma_challenges: SigmaChallengeGenerator,
    e_values: EValuesGenerator,
    backend: Arc<dyn ModExpBackend>,
}

impl PermutationCommitmentProofSystem {
    /// Proof system for commitments of `size` positions, using the backend the
    /// configuration selects.
    pub fn new(
        group: SchnorrGroup,
        size: usize,
        config: &ProofSystemConfig,
    ) -> Result<Self, ProofError> {
        let backend = config
            .backend
            .build()
            .map_err(crate::config::ConfigError::from)?;
        Self::with_backend(group, size, config, backend)
    }

    pub fn with_backend(
        group: SchnorrGroup,
        size: usize,
        config: &ProofSystemConfig,
        backend: Arc<dyn ModExpBackend>,
    ) -> Result<Self, ProofError> {
        if size == 0 {
            return Err(ProofError::InvalidArgument(
                "permutation size must be at least 1".to_string(),
            ));
        }
        config.validate(&group)?;

        let e_space = ChallengeSpace::for_group(config.ke, &group)?;
        let c_space = ChallengeSpace::for_group(config.kc, &group)?;

        let generators = derive_generators(
            &group,
            config.generator_seed.as_bytes(),
            size + 1,
            &*backend,
        )?;
        let pedersen = GeneralizedPedersenCommitmentScheme::new(group.clone(), generators)?;

        tracing::debug!(
            target: LOG_TARGET,
            size,
            ke = e_space.bit_length(),
            kc = c_space.bit_length(),
            kr = config.kr,
            backend = backend.name(),
            "Created permutation commitment proof system"
        );

        Ok(Self {
            group,
            size,
            kr: config.kr,
            scheme: PermutationCommitmentScheme::new(pedersen),
            sigma_challenges: SigmaChallengeGenerator::new(
                c_space,
                config.prover_id.as_ref().map(|id| id.as_bytes().to_vec()),
            ),
            e_values: EValuesGenerator::new(e_space, size),
            backend,
        })
    }

    pub fn group(&self) -> &SchnorrGroup {
        &self.group
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn commitment_scheme(&self) -> &PermutationCommitmentScheme {
        &self.scheme
    }

    pub fn challenge_space(&self) -> &ChallengeSpace {
        self.sigma_challenges.space()
    }

    pub fn e_values_space(&self) -> &ChallengeSpace {
        self.e_values.space()
    }

    /// Length of the sigma commitment and of f's image: N + 3.
    pub fn commitment_space_len(&self) -> usize {
        self.size + 3
    }

    /// Top-level arity of the response, (v, w, r, d, e').
    pub fn response_arity(&self) -> usize {
        Preimage::ARITY
    }

    fn randomization_generator(&self) -> &GroupElement {
        self.scheme.pedersen().randomization_generator()
    }

    fn h(&self) -> &GroupElement {
        &self.scheme.pedersen().message_generators()[0]
    }

    /// Commits to `permutation` under `randomization`, batched.
    pub fn commit(
        &self,
        permutation: &Permutation,
        randomization: &[BigUint],
    ) -> Result<Vec<GroupElement>, ProofError> {
        let engine = ExpBatchEngine::new(&*self.backend);
        let commitment = engine.run_batched("permutation_commitment", || {
            self.scheme.commit(&engine, permutation, randomization)
        })?;
        Ok(commitment)
    }

    fn check_public_input(&self, public: &[GroupElement]) -> Result<(), ProofError> {
        if public.len() != self.size {
            return Err(ProofError::InvalidArgument(format!(
                "public input has {} elements, expected {}",
                public.len(),
                self.size
            )));
        }
        if !public.iter().all(|c| self.group.contains(c)) {
            return Err(ProofError::InvalidArgument(
                "public input contains a non-member element".to_string(),
            ));
        }
        Ok(())
    }

    /// Random preimage ω. The e'-component is drawn from 2^(ke + kc + kr) and
    /// then reduced into Z_q.
    fn random_preimage<R: RngCore + CryptoRng>(&self, rng: &mut R) -> Preimage {
        let zq = self.group.zmod();
        let e_bits = self.e_values.space().bit_length()
            + self.sigma_challenges.space().bit_length()
            + u64::from(self.kr);
        Preimage {
            v: zq.random(rng),
            w: zq.random(rng),
            r: zq.random_vector(rng, self.size),
            d: zq.random(rng),
            e: (0..self.size)
                .map(|_| zq.reduce(&rng.gen_biguint(e_bits)))
                .collect(),
        }
    }

    /// Proves that `public` commits to `permutation` under `randomization`.
    #[tracing::instrument(target = LOG_TARGET, skip_all, fields(N = self.size))]
    pub fn generate<R: RngCore + CryptoRng>(
        &self,
        permutation: &Permutation,
        randomization: &[BigUint],
        public: &[GroupElement],
        rng: &mut R,
    ) -> Result<PermutationCommitmentProof, ProofError> {
        self.check_public_input(public)?;
        if permutation.len() != self.size || randomization.len() != self.size {
            return Err(ProofError::InvalidArgument(format!(
                "private input of size ({}, {}), expected {}",
                permutation.len(),
                randomization.len(),
                self.size
            )));
        }

        let zq = self.group.zmod();
        let g = self.randomization_generator();
        let engine = ExpBatchEngine::new(&*self.backend);

        let proof = track_modexps!(&engine, "permutation_proof_generate", LOG_TARGET, {
            let e = self.e_values.generate(public);
            let e_prime = permutation.permute(&e)?;
            let v = zq.sum(randomization);
            let w = zq.inner_product(randomization, &e);
            let r = zq.random_vector(rng, self.size);

            let blindings = engine.run_batched("bridging_randomizers", || {
                r.iter()
                    .map(|r_i| self.group.self_apply(&engine, g, r_i))
                    .collect::<Result<Vec<_>, GroupError>>()
            })?;

            // c_i = g^{r_i} · c_{i-1}^{e'_i}, d_i = r_i + d_{i-1} · e'_i
            let mut bridging = Vec::with_capacity(self.size);
            let mut d = r[0].clone();
            let mut previous = self.h().clone();
            for (i, (blinding, e_i)) in blindings.iter().zip(&e_prime).enumerate() {
                let carried = self.group.self_apply(&engine, &previous, e_i)?;
                let link = self.group.apply(blinding, &carried)?;
                if i > 0 {
                    d = zq.add(&r[i], &zq.mul(&d, e_i));
                }
                bridging.push(link.clone());
                previous = link;
            }
            tracing::debug!(target: LOG_TARGET, "Built bridging commitment chain");

            let witness = Preimage { v, w, r, d, e: e_prime };
            let omega = self.random_preimage(rng);
            let f = PreimageProofFunction::new(self.scheme.pedersen(), &bridging);
            let commitment = f.apply(&engine, &omega)?;

            let challenge = self
                .sigma_challenges
                .generate(&(public, bridging.as_slice()), &commitment);
            let response = omega.add_scaled(&challenge, &witness, zq);

            PermutationCommitmentProof {
                e_values: e,
                bridging_commitments: bridging,
                commitment,
                challenge,
                response,
            }
        });

        tracing::debug!(target: LOG_TARGET, stats = ?engine.stats(), "Generated permutation commitment proof");
        Ok(proof)
    }

    fn check_proof_shape(&self, proof: &PermutationCommitmentProof) -> Result<(), ProofError> {
        let n = self.size;
        let zq = self.group.zmod();
        let shape_ok = proof.e_values.len() == n
            && proof.bridging_commitments.len() == n
            && proof.commitment.len() == self.commitment_space_len()
            && proof.response.r.len() == n
            && proof.response.e.len() == n;
        if !shape_ok {
            return Err(ProofError::InvalidArgument(
                "proof does not have the arities of this proof system".to_string(),
            ));
        }
        if !proof
            .e_values
            .iter()
            .all(|e| self.e_values.space().contains(e))
            || !self.sigma_challenges.space().contains(&proof.challenge)
            || !proof.response.scalars().all(|x| zq.contains(x))
        {
            return Err(ProofError::InvalidArgument(
                "proof contains an out-of-range scalar".to_string(),
            ));
        }
        if !proof
            .bridging_commitments
            .iter()
            .chain(&proof.commitment)
            .all(|c| self.group.contains(c))
        {
            return Err(ProofError::InvalidArgument(
                "proof contains a non-member element".to_string(),
            ));
        }
        Ok(())
    }

    /// Checks `proof` against `public`. A well-formed but invalid proof gives
    /// `Ok(false)`; malformed input is an error.
    #[tracing::instrument(target = LOG_TARGET, skip_all, fields(N = self.size))]
    pub fn verify(
        &self,
        proof: &PermutationCommitmentProof,
        public: &[GroupElement],
    ) -> Result<bool, ProofError> {
        self.check_public_input(public)?;
        self.check_proof_shape(proof)?;

        let n = self.size;
        let group = &self.group;
        let zq = group.zmod();

        let e = self.e_values.generate(public);
        if e != proof.e_values {
            tracing::warn!(target: LOG_TARGET, "e-values do not match the public input");
            return Ok(false);
        }

        let bridging = &proof.bridging_commitments;
        let challenge = self
            .sigma_challenges
            .generate(&(public, bridging.as_slice()), &proof.commitment);
        if challenge != proof.challenge {
            tracing::warn!(target: LOG_TARGET, "Sigma challenge does not match the transcript");
            return Ok(false);
        }

        let engine = ExpBatchEngine::new(&*self.backend);
        let accepted = track_modexps!(&engine, "permutation_proof_verify", LOG_TARGET, {
            // y = (Πcπ / Πg_i, Πcπ_i^{e_i}, c_0..c_{N-1}, c_{N-1} / h^{Πe_i})
            let message_generators = self.scheme.pedersen().message_generators();
            let mut target = Vec::with_capacity(self.commitment_space_len());
            target.push(group.divide(
                &group.apply_all(public)?,
                &group.apply_all(message_generators)?,
            )?);
            target.push(engine.run_batched("public_inner_product", || {
                group.product_of_powers(&engine, public, &e)
            })?);
            target.extend(bridging.iter().cloned());
            let h_power = group.self_apply(&engine, self.h(), &zq.product(&e))?;
            target.push(group.divide(&bridging[n - 1], &h_power)?);

            let powered = engine.run_batched("target_powers", || {
                target
                    .iter()
                    .map(|y| group.self_apply(&engine, y, &challenge))
                    .collect::<Result<Vec<_>, GroupError>>()
            })?;
            let rhs = proof
                .commitment
                .iter()
                .zip(&powered)
                .map(|(t, y)| group.apply(t, y))
                .collect::<Result<Vec<_>, GroupError>>()?;

            let f = PreimageProofFunction::new(self.scheme.pedersen(), bridging);
            let lhs = f.apply(&engine, &proof.response)?;

            match lhs.iter().zip(&rhs).position(|(l, r)| l != r) {
                None => true,
                Some(index) => {
                    tracing::warn!(target: LOG_TARGET, index, "Verification equation failed");
                    false
                }
            }
        });

        tracing::debug!(target: LOG_TARGET, accepted, stats = ?engine.stats(), "Verified permutation commitment proof");
        Ok(accepted)
    }
}
