//! Prime-order subgroups of Z*_p.
//!
//! A [`SchnorrGroup`] is the subgroup of order `q` inside the multiplicative
//! group modulo `p`, for `q | p - 1`. Its elements are the `k`-th powers mod
//! `p` where `k = (p - 1) / q` is the cofactor.
//!
//! Every exponentiation on elements goes through a [`ModExp`] so that it can be
//! deferred by the batching engine. Membership and generator checks on raw
//! values are boundary checks and are computed directly.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use num_traits::{One, Zero};
use rand::Rng;

use super::error::GroupError;
use super::random::DeterministicRandomSequence;
use super::zmod::ZMod;
use crate::batching::ModExp;

const LOG_TARGET: &str = "zk_mixnet::group::schnorr";

struct GroupParams {
    modulus: BigUint,
    order: BigUint,
    cofactor: BigUint,
    order_factors: Vec<BigUint>,
    generator: BigUint,
    exponents: ZMod,
}

/// Subgroup of order `q` of Z*_p. Cloning shares the parameters.
#[derive(Clone)]
pub struct SchnorrGroup {
    params: Arc<GroupParams>,
}

impl SchnorrGroup {
    /// Group of prime order `order` modulo `modulus`.
    pub fn new(modulus: BigUint, order: BigUint) -> Result<Self, GroupError> {
        let factors = vec![order.clone()];
        Self::from_factorization(modulus, order, factors)
    }

    /// Group whose order has the given distinct prime factors. The factors
    /// drive the generator test.
    pub fn from_factorization(
        modulus: BigUint,
        order: BigUint,
        order_factors: Vec<BigUint>,
    ) -> Result<Self, GroupError> {
        let one = BigUint::one();
        if modulus <= BigUint::from(2u32) {
            return Err(GroupError::InvalidParameters(format!(
                "modulus must exceed 2, got {modulus}"
            )));
        }
        if order < BigUint::from(2u32) {
            return Err(GroupError::InvalidParameters(format!(
                "order must be at least 2, got {order}"
            )));
        }
        let (cofactor, rem) = (&modulus - &one).div_rem(&order);
        if !rem.is_zero() {
            return Err(GroupError::InvalidParameters(
                "order does not divide modulus - 1".to_string(),
            ));
        }
        if order_factors.is_empty()
            || order_factors
                .iter()
                .any(|f| f <= &one || !(&order % f).is_zero())
        {
            return Err(GroupError::InvalidParameters(
                "order factors must be non-trivial divisors of the order".to_string(),
            ));
        }

        let generator = default_generator(&modulus, &order, &cofactor, &order_factors)?;
        let exponents = ZMod::new(order.clone())?;

        tracing::debug!(
            target: LOG_TARGET,
            modulus_bits = modulus.bits(),
            order_bits = order.bits(),
            generator = %generator,
            "Constructed Schnorr group"
        );

        Ok(Self {
            params: Arc::new(GroupParams {
                modulus,
                order,
                cofactor,
                order_factors,
                generator,
                exponents,
            }),
        })
    }

    pub fn modulus(&self) -> &BigUint {
        &self.params.modulus
    }

    pub fn order(&self) -> &BigUint {
        &self.params.order
    }

    pub fn cofactor(&self) -> &BigUint {
        &self.params.cofactor
    }

    /// Exponent ring Z_q.
    pub fn zmod(&self) -> &ZMod {
        &self.params.exponents
    }

    pub fn identity(&self) -> GroupElement {
        self.wrap(BigUint::one())
    }

    /// Canonical generator: the first `α^k` with `α = 1, 2, …` coprime to `p`
    /// that passes the generator test.
    pub fn generator(&self) -> GroupElement {
        self.wrap(self.params.generator.clone())
    }

    pub(crate) fn wrap(&self, value: BigUint) -> GroupElement {
        GroupElement {
            group: self.clone(),
            value,
        }
    }

    /// `0 < x < p` and `x^q ≡ 1 (mod p)`.
    pub fn contains_value(&self, value: &BigUint) -> bool {
        !value.is_zero()
            && value < self.modulus()
            && value.modpow(self.order(), self.modulus()).is_one()
    }

    pub fn contains(&self, element: &GroupElement) -> bool {
        element.group == *self && self.contains_value(&element.value)
    }

    /// Checked conversion of a raw residue into an element.
    pub fn element(&self, value: BigUint) -> Result<GroupElement, GroupError> {
        if !self.contains_value(&value) {
            return Err(GroupError::InvalidElement);
        }
        Ok(self.wrap(value))
    }

    fn check(&self, element: &GroupElement) -> Result<(), GroupError> {
        if element.group != *self {
            return Err(GroupError::InvalidElement);
        }
        Ok(())
    }

    pub fn apply(&self, a: &GroupElement, b: &GroupElement) -> Result<GroupElement, GroupError> {
        self.check(a)?;
        self.check(b)?;
        Ok(self.wrap((&a.value * &b.value) % self.modulus()))
    }

    /// Product of all elements; the identity for an empty input.
    pub fn apply_all<'a>(
        &self,
        elements: impl IntoIterator<Item = &'a GroupElement>,
    ) -> Result<GroupElement, GroupError> {
        elements
            .into_iter()
            .try_fold(self.identity(), |acc, e| self.apply(&acc, e))
    }

    pub fn invert(&self, a: &GroupElement) -> Result<GroupElement, GroupError> {
        self.check(a)?;
        let inverse = a
            .value
            .modinv(self.modulus())
            .ok_or(GroupError::InvalidElement)?;
        Ok(self.wrap(inverse))
    }

    /// `a · b⁻¹`
    pub fn divide(&self, a: &GroupElement, b: &GroupElement) -> Result<GroupElement, GroupError> {
        self.apply(a, &self.invert(b)?)
    }

    /// `a^k`, with `k` reduced modulo the group order.
    pub fn self_apply<E: ModExp + ?Sized>(
        &self,
        exp: &E,
        a: &GroupElement,
        k: &BigUint,
    ) -> Result<GroupElement, GroupError> {
        self.check(a)?;
        let k = self.zmod().reduce(k);
        let value = exp.mod_pow(&a.value, &k, self.modulus())?;
        Ok(self.wrap(value))
    }

    /// `a^k` for a signed exponent. Negative exponents are rejected.
    pub fn self_apply_signed<E: ModExp + ?Sized>(
        &self,
        exp: &E,
        a: &GroupElement,
        k: &BigInt,
    ) -> Result<GroupElement, GroupError> {
        let k = self.zmod().try_element(k)?;
        self.self_apply(exp, a, &k)
    }

    /// `Π bases_i ^ exponents_i`, one exponentiation per base in order.
    pub fn product_of_powers<E: ModExp + ?Sized>(
        &self,
        exp: &E,
        bases: &[GroupElement],
        exponents: &[BigUint],
    ) -> Result<GroupElement, GroupError> {
        if bases.len() != exponents.len() {
            return Err(GroupError::InvalidParameters(format!(
                "{} bases but {} exponents",
                bases.len(),
                exponents.len()
            )));
        }
        let mut acc = self.identity();
        for (base, k) in bases.iter().zip(exponents) {
            acc = self.apply(&acc, &self.self_apply(exp, base, k)?)?;
        }
        Ok(acc)
    }

    /// Whether `a` generates the whole group: `a^(q / f) ≠ 1` for every prime
    /// factor `f` of `q`.
    pub fn is_generator(&self, a: &GroupElement) -> bool {
        a.group == *self
            && self.contains_value(&a.value)
            && passes_generator_test(&a.value, self.modulus(), self.order(), &self.params.order_factors)
    }

    /// `g^r` for a fresh uniform `r`.
    pub fn random_element<E: ModExp + ?Sized, R: Rng + ?Sized>(
        &self,
        exp: &E,
        rng: &mut R,
    ) -> Result<GroupElement, GroupError> {
        let r = self.zmod().random(rng);
        self.self_apply(exp, &self.generator(), &r)
    }

    /// Raw candidates `x ∈ [1, p - 1]` coprime to `p`, drawn from the seeded
    /// sequence. Mapping each through `x^k` lands in the group.
    pub fn random_values(&self, seed: &[u8]) -> RandomValues {
        RandomValues {
            modulus: self.modulus().clone(),
            range: self.modulus() - BigUint::one(),
            sequence: DeterministicRandomSequence::new(seed),
        }
    }

    /// Reproducible element sequence for `seed`.
    pub fn random_elements<'a, E: ModExp + ?Sized>(
        &'a self,
        exp: &'a E,
        seed: &[u8],
    ) -> RandomElements<'a, E> {
        RandomElements {
            group: self,
            exp,
            values: self.random_values(seed),
        }
    }
}

fn passes_generator_test(
    value: &BigUint,
    modulus: &BigUint,
    order: &BigUint,
    order_factors: &[BigUint],
) -> bool {
    !value.is_one()
        && order_factors
            .iter()
            .all(|f| !value.modpow(&(order / f), modulus).is_one())
}

fn default_generator(
    modulus: &BigUint,
    order: &BigUint,
    cofactor: &BigUint,
    order_factors: &[BigUint],
) -> Result<BigUint, GroupError> {
    let mut alpha = BigUint::one();
    while &alpha < modulus {
        if alpha.gcd(modulus).is_one() {
            let candidate = alpha.modpow(cofactor, modulus);
            if candidate.modpow(order, modulus).is_one()
                && passes_generator_test(&candidate, modulus, order, order_factors)
            {
                return Ok(candidate);
            }
        }
        alpha += 1u32;
    }
    Err(GroupError::InvalidParameters(
        "group has no generator for these parameters".to_string(),
    ))
}

impl PartialEq for SchnorrGroup {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.params, &other.params)
            || (self.params.modulus == other.params.modulus
                && self.params.order == other.params.order)
    }
}

impl Eq for SchnorrGroup {}

impl Hash for SchnorrGroup {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.params.modulus.hash(state);
        self.params.order.hash(state);
    }
}

impl fmt::Debug for SchnorrGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchnorrGroup")
            .field("modulus_bits", &self.params.modulus.bits())
            .field("order_bits", &self.params.order.bits())
            .field("generator", &self.params.generator)
            .finish()
    }
}

/// Member of a [`SchnorrGroup`]. Carries its group, so mixing elements of
/// different groups fails with [`GroupError::InvalidElement`].
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct GroupElement {
    group: SchnorrGroup,
    value: BigUint,
}

impl GroupElement {
    pub fn value(&self) -> &BigUint {
        &self.value
    }

    pub fn group(&self) -> &SchnorrGroup {
        &self.group
    }

    pub fn is_identity(&self) -> bool {
        self.value.is_one()
    }

    pub fn to_bytes_be(&self) -> Vec<u8> {
        self.value.to_bytes_be()
    }
}

impl fmt::Debug for GroupElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GroupElement({:#x})", self.value)
    }
}

impl fmt::Display for GroupElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.value)
    }
}

/// Iterator over seeded candidate values, see [`SchnorrGroup::random_values`].
#[derive(Clone, Debug)]
pub struct RandomValues {
    modulus: BigUint,
    range: BigUint,
    sequence: DeterministicRandomSequence,
}

impl Iterator for RandomValues {
    type Item = BigUint;

    fn next(&mut self) -> Option<BigUint> {
        loop {
            let x = self.sequence.next_below(&self.range) + 1u32;
            if x.gcd(&self.modulus).is_one() {
                return Some(x);
            }
        }
    }
}

/// Iterator over seeded group elements, see [`SchnorrGroup::random_elements`].
pub struct RandomElements<'a, E: ModExp + ?Sized> {
    group: &'a SchnorrGroup,
    exp: &'a E,
    values: RandomValues,
}

impl<E: ModExp + ?Sized> Iterator for RandomElements<'_, E> {
    type Item = Result<GroupElement, GroupError>;

    fn next(&mut self) -> Option<Self::Item> {
        let x = self.values.next()?;
        let element = self
            .exp
            .mod_pow(&x, self.group.cofactor(), self.group.modulus())
            .map(|v| self.group.wrap(v))
            .map_err(GroupError::from);
        Some(element)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batching::DirectModExp;
    use crate::test_utils::{group_2039, toy_group};
    use crate::test_utils::test_rng;

    fn n(v: u32) -> BigUint {
        BigUint::from(v)
    }

    #[test]
    fn test_toy_group_parameters() {
        let group = toy_group();
        assert_eq!(group.modulus(), &n(23));
        assert_eq!(group.order(), &n(11));
        assert_eq!(group.cofactor(), &n(2));
        assert_eq!(group.generator().value(), &n(4));
        assert!(group.is_generator(&group.generator()));
        assert!(!group.is_generator(&group.identity()));
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(SchnorrGroup::new(n(2), n(1)).is_err());
        assert!(SchnorrGroup::new(n(23), n(1)).is_err());
        // 7 does not divide 22
        assert!(matches!(
            SchnorrGroup::new(n(23), n(7)),
            Err(GroupError::InvalidParameters(_))
        ));
        assert!(SchnorrGroup::from_factorization(n(23), n(11), vec![n(3)]).is_err());
    }

    #[test]
    fn test_membership() {
        let group = toy_group();
        // Quadratic residues mod 23
        for qr in [1u32, 2, 3, 4, 6, 8, 9, 12, 13, 16, 18] {
            assert!(group.contains_value(&n(qr)), "{qr} should be a member");
        }
        for non in [0u32, 5, 7, 22, 23, 100] {
            assert!(!group.contains_value(&n(non)), "{non} should not be a member");
        }
        assert_eq!(group.element(n(5)), Err(GroupError::InvalidElement));
    }

    #[test]
    fn test_group_operations() {
        let group = toy_group();
        let exp = DirectModExp::new();
        let g = group.generator();

        let g3 = group.self_apply(&exp, &g, &n(3)).unwrap();
        let g7 = group.self_apply(&exp, &g, &n(7)).unwrap();
        let g10 = group.apply(&g3, &g7).unwrap();
        assert_eq!(g10, group.self_apply(&exp, &g, &n(10)).unwrap());

        // exponents are taken modulo the order
        assert_eq!(group.self_apply(&exp, &g, &n(14)).unwrap(), g3);
        assert_eq!(group.self_apply(&exp, &g, &n(11)).unwrap(), group.identity());

        let inv = group.invert(&g3).unwrap();
        assert_eq!(group.apply(&g3, &inv).unwrap(), group.identity());
        assert_eq!(group.divide(&g10, &g7).unwrap(), g3);

        let prod = group.apply_all([&g3, &g7, &inv]).unwrap();
        assert_eq!(prod, g7);
        assert_eq!(
            group.apply_all(&[] as &[GroupElement]).unwrap(),
            group.identity()
        );

        let pp = group
            .product_of_powers(&exp, &[g.clone(), g3.clone()], &[n(2), n(1)])
            .unwrap();
        assert_eq!(pp, group.self_apply(&exp, &g, &n(5)).unwrap());
        assert_eq!(exp.modexp_count(), 8);
    }

    #[test]
    fn test_foreign_elements_rejected() {
        let toy = toy_group();
        let other = group_2039();
        let exp = DirectModExp::new();
        let foreign = other.generator();

        assert_eq!(
            toy.apply(&toy.generator(), &foreign),
            Err(GroupError::InvalidElement)
        );
        assert_eq!(toy.invert(&foreign), Err(GroupError::InvalidElement));
        assert_eq!(
            toy.self_apply(&exp, &foreign, &n(2)),
            Err(GroupError::InvalidElement)
        );
        assert!(!toy.contains(&foreign));
        assert!(!toy.is_generator(&foreign));
    }

    #[test]
    fn test_negative_exponent_rejected() {
        let group = toy_group();
        let exp = DirectModExp::new();
        let g = group.generator();
        assert_eq!(
            group.self_apply_signed(&exp, &g, &BigInt::from(-3)),
            Err(GroupError::InvalidExponent)
        );
        assert_eq!(
            group.self_apply_signed(&exp, &g, &BigInt::from(3)).unwrap(),
            group.self_apply(&exp, &g, &n(3)).unwrap()
        );
    }

    #[test]
    fn test_generator_test_with_composite_order() {
        // Z*_23 itself: order 22 = 2 · 11
        let full = SchnorrGroup::from_factorization(n(23), n(22), vec![n(2), n(11)]).unwrap();
        assert_eq!(full.generator().value(), &n(5));
        // 4 has order 11, so it does not generate Z*_23
        let four = full.element(n(4)).unwrap();
        assert!(!full.is_generator(&four));
        let five = full.element(n(5)).unwrap();
        assert!(full.is_generator(&five));
    }

    #[test]
    fn test_random_elements_are_members_and_reproducible() {
        let group = group_2039();
        let exp = DirectModExp::new();
        let a: Vec<GroupElement> = group
            .random_elements(&exp, b"seed")
            .take(20)
            .collect::<Result<_, _>>()
            .unwrap();
        let b: Vec<GroupElement> = group
            .random_elements(&exp, b"seed")
            .take(20)
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(a, b);
        assert!(a.iter().all(|e| group.contains(e)));

        let mut rng = test_rng();
        let r = group.random_element(&exp, &mut rng).unwrap();
        assert!(group.contains(&r));
    }
}
