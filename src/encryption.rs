//! ElGamal over a Schnorr group, the re-encryption scheme a mix-net shuffles.
//!
//!   Enc(pk, m; r) = (g^r, m · pk^r)
//!   ReEnc(pk, (a, b); r') = (a · g^{r'}, b · pk^{r'})
//!   Dec(sk, (a, b)) = b / a^sk

use num_bigint::BigUint;
use rand::{CryptoRng, RngCore};

use crate::batching::ModExp;
use crate::group::{GroupElement, GroupError, SchnorrGroup};

const LOG_TARGET: &str = "zk_mixnet::encryption";

/// What a shuffler needs from an encryption scheme.
pub trait ReEncryptionScheme {
    type PublicKey;
    type SecretKey;
    type Plaintext;
    type Ciphertext;
    type Error;

    fn encrypt<E: ModExp + ?Sized>(
        &self,
        exp: &E,
        pk: &Self::PublicKey,
        message: &Self::Plaintext,
        randomness: &BigUint,
    ) -> Result<Self::Ciphertext, Self::Error>;

    fn decrypt<E: ModExp + ?Sized>(
        &self,
        exp: &E,
        sk: &Self::SecretKey,
        ciphertext: &Self::Ciphertext,
    ) -> Result<Self::Plaintext, Self::Error>;

    /// Fresh ciphertext of the same plaintext.
    fn re_encrypt<E: ModExp + ?Sized>(
        &self,
        exp: &E,
        pk: &Self::PublicKey,
        ciphertext: &Self::Ciphertext,
        randomness: &BigUint,
    ) -> Result<Self::Ciphertext, Self::Error>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElGamalCiphertext {
    pub c1: GroupElement,
    pub c2: GroupElement,
}

impl ElGamalCiphertext {
    pub fn new(c1: GroupElement, c2: GroupElement) -> Self {
        Self { c1, c2 }
    }
}

#[derive(Clone, Debug)]
pub struct ElGamal {
    group: SchnorrGroup,
    generator: GroupElement,
}

impl ElGamal {
    /// ElGamal with the group's default generator.
    pub fn new(group: SchnorrGroup) -> Self {
        let generator = group.generator();
        Self { group, generator }
    }

    pub fn with_generator(group: SchnorrGroup, generator: GroupElement) -> Result<Self, GroupError> {
        if !group.contains(&generator) || generator.is_identity() {
            return Err(GroupError::InvalidElement);
        }
        Ok(Self { group, generator })
    }

    pub fn group(&self) -> &SchnorrGroup {
        &self.group
    }

    pub fn generator(&self) -> &GroupElement {
        &self.generator
    }

    /// Returns `(sk, g^sk)`.
    pub fn keygen<E: ModExp + ?Sized, R: RngCore + CryptoRng>(
        &self,
        exp: &E,
        rng: &mut R,
    ) -> Result<(BigUint, GroupElement), GroupError> {
        let sk = self.group.zmod().random(rng);
        let pk = self.group.self_apply(exp, &self.generator, &sk)?;
        tracing::debug!(target: LOG_TARGET, "Generated ElGamal key pair");
        Ok((sk, pk))
    }
}

impl ReEncryptionScheme for ElGamal {
    type PublicKey = GroupElement;
    type SecretKey = BigUint;
    type Plaintext = GroupElement;
    type Ciphertext = ElGamalCiphertext;
    type Error = GroupError;

    fn encrypt<E: ModExp + ?Sized>(
        &self,
        exp: &E,
        pk: &GroupElement,
        message: &GroupElement,
        randomness: &BigUint,
    ) -> Result<ElGamalCiphertext, GroupError> {
        let c1 = self.group.self_apply(exp, &self.generator, randomness)?;
        let shared = self.group.self_apply(exp, pk, randomness)?;
        let c2 = self.group.apply(message, &shared)?;
        Ok(ElGamalCiphertext::new(c1, c2))
    }

    fn decrypt<E: ModExp + ?Sized>(
        &self,
        exp: &E,
        sk: &BigUint,
        ciphertext: &ElGamalCiphertext,
    ) -> Result<GroupElement, GroupError> {
        let shared = self.group.self_apply(exp, &ciphertext.c1, sk)?;
        self.group.divide(&ciphertext.c2, &shared)
    }

    fn re_encrypt<E: ModExp + ?Sized>(
        &self,
        exp: &E,
        pk: &GroupElement,
        ciphertext: &ElGamalCiphertext,
        randomness: &BigUint,
    ) -> Result<ElGamalCiphertext, GroupError> {
        let blank = self.encrypt(exp, pk, &self.group.identity(), randomness)?;
        Ok(ElGamalCiphertext::new(
            self.group.apply(&ciphertext.c1, &blank.c1)?,
            self.group.apply(&ciphertext.c2, &blank.c2)?,
        ))
    }
}
