//! Cyclic group algebra: Schnorr groups, their exponent ring and seeded
//! generator derivation.

pub mod error;
pub mod generators;
pub mod random;
pub mod schnorr;
pub mod zmod;

pub use error::GroupError;
pub use generators::{derive_generators, derive_generators_uncached};
pub use random::DeterministicRandomSequence;
pub use schnorr::{GroupElement, RandomElements, RandomValues, SchnorrGroup};
pub use zmod::ZMod;
