//! The exponent ring Z_m, used for scalars modulo a group order.

use num_bigint::{BigInt, BigUint, RandBigInt};
use num_traits::{One, Zero};
use rand::Rng;

use super::error::GroupError;

/// Integers modulo `m`. Elements are plain `BigUint`s in `[0, m)`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ZMod {
    modulus: BigUint,
}

impl ZMod {
    pub fn new(modulus: BigUint) -> Result<Self, GroupError> {
        if modulus < BigUint::from(2u32) {
            return Err(GroupError::InvalidParameters(format!(
                "ring modulus must be at least 2, got {modulus}"
            )));
        }
        Ok(Self { modulus })
    }

    /// Z_{2^bits}.
    pub fn power_of_two(bits: u32) -> Result<Self, GroupError> {
        if bits == 0 {
            return Err(GroupError::InvalidParameters(
                "ring bit length must be positive".to_string(),
            ));
        }
        Ok(Self {
            modulus: BigUint::one() << bits,
        })
    }

    pub fn modulus(&self) -> &BigUint {
        &self.modulus
    }

    pub fn contains(&self, value: &BigUint) -> bool {
        value < &self.modulus
    }

    pub fn reduce(&self, value: &BigUint) -> BigUint {
        value % &self.modulus
    }

    /// Converts a signed integer. Negative values are rejected rather than
    /// wrapped, values past the modulus are reduced.
    pub fn try_element(&self, value: &BigInt) -> Result<BigUint, GroupError> {
        value
            .to_biguint()
            .map(|v| self.reduce(&v))
            .ok_or(GroupError::InvalidExponent)
    }

    pub fn add(&self, a: &BigUint, b: &BigUint) -> BigUint {
        (a + b) % &self.modulus
    }

    pub fn sub(&self, a: &BigUint, b: &BigUint) -> BigUint {
        let b = self.reduce(b);
        (a + &self.modulus - b) % &self.modulus
    }

    pub fn mul(&self, a: &BigUint, b: &BigUint) -> BigUint {
        (a * b) % &self.modulus
    }

    pub fn neg(&self, a: &BigUint) -> BigUint {
        self.sub(&BigUint::zero(), a)
    }

    pub fn sum<'a>(&self, values: impl IntoIterator<Item = &'a BigUint>) -> BigUint {
        values
            .into_iter()
            .fold(BigUint::zero(), |acc, v| self.add(&acc, v))
    }

    pub fn product<'a>(&self, values: impl IntoIterator<Item = &'a BigUint>) -> BigUint {
        values
            .into_iter()
            .fold(BigUint::one(), |acc, v| self.mul(&acc, v))
    }

    /// `Σ a_i · b_i`; the shorter slice bounds the sum.
    pub fn inner_product(&self, a: &[BigUint], b: &[BigUint]) -> BigUint {
        a.iter()
            .zip(b)
            .fold(BigUint::zero(), |acc, (x, y)| self.add(&acc, &self.mul(x, y)))
    }

    pub fn random<R: Rng + ?Sized>(&self, rng: &mut R) -> BigUint {
        rng.gen_biguint_below(&self.modulus)
    }

    pub fn random_vector<R: Rng + ?Sized>(&self, rng: &mut R, len: usize) -> Vec<BigUint> {
        (0..len).map(|_| self.random(rng)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_rng;

    fn z11() -> ZMod {
        ZMod::new(BigUint::from(11u32)).unwrap()
    }

    fn n(v: u32) -> BigUint {
        BigUint::from(v)
    }

    #[test]
    fn test_arithmetic_wraps() {
        let z = z11();
        assert_eq!(z.add(&n(7), &n(9)), n(5));
        assert_eq!(z.sub(&n(3), &n(9)), n(5));
        assert_eq!(z.mul(&n(7), &n(9)), n(8));
        assert_eq!(z.neg(&n(4)), n(7));
        assert_eq!(z.neg(&n(0)), n(0));
        assert_eq!(z.sum(&[n(2), n(5), n(7)]), n(3));
        assert_eq!(z.product(&[n(2), n(5), n(7)]), n(4));
        assert_eq!(z.inner_product(&[n(2), n(5)], &[n(3), n(4)]), n(4));
    }

    #[test]
    fn test_signed_conversion() {
        let z = z11();
        assert_eq!(z.try_element(&BigInt::from(25)).unwrap(), n(3));
        assert_eq!(
            z.try_element(&BigInt::from(-1)),
            Err(GroupError::InvalidExponent)
        );
    }

    #[test]
    fn test_random_in_range() {
        let z = z11();
        let mut rng = test_rng();
        for _ in 0..100 {
            assert!(z.contains(&z.random(&mut rng)));
        }
        let two = ZMod::power_of_two(4).unwrap();
        assert_eq!(two.modulus(), &n(16));
    }

    #[test]
    fn test_degenerate_rings_rejected() {
        assert!(ZMod::new(n(1)).is_err());
        assert!(ZMod::power_of_two(0).is_err());
    }
}
