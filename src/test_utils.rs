//! Common test utilities: small groups, instrumented backends, tracing setup.

use std::sync::atomic::{AtomicUsize, Ordering};

use num_bigint::BigUint;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::batching::{BackendError, ModExpBackend, ModExpRequest, SequentialBackend};
use crate::config::GroupParameters;
use crate::group::SchnorrGroup;
use crate::permutation::Permutation;

/// Helpers shared across test modules.
pub mod serde {
    use std::fmt::Debug;

    /// Assert that a value survives a serde_json round-trip using structural equality.
    pub fn assert_round_trip_eq<T>(value: &T)
    where
        T: ::serde::Serialize + ::serde::de::DeserializeOwned + PartialEq + Debug,
    {
        let json = serde_json::to_string(value)
            .expect("serialization should succeed during round-trip testing");
        let restored: T = serde_json::from_str(&json)
            .expect("deserialization should succeed during round-trip testing");
        assert_eq!(restored, *value, "serde_json round-trip altered the value");
    }
}

/// Install a fmt subscriber writing through the test harness. Safe to call
/// from every test.
pub fn setup_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Fixed-seed `StdRng`, usable wherever a `CryptoRng` is required.
pub fn test_rng() -> StdRng {
    StdRng::seed_from_u64(0x6d69_786e_6574)
}

/// p = 23, q = 11.
pub fn toy_group() -> SchnorrGroup {
    GroupParameters::toy()
        .build()
        .expect("toy parameters should form a group")
}

/// p = 2039 = 2·1019 + 1.
pub fn group_2039() -> SchnorrGroup {
    SchnorrGroup::new(BigUint::from(2039u32), BigUint::from(1019u32))
        .expect("2039 should be a safe prime")
}

/// 256-bit safe-prime group.
pub fn test_group_256() -> SchnorrGroup {
    GroupParameters::test_256()
        .build()
        .expect("256-bit parameters should form a group")
}

pub fn random_permutation<R: Rng + ?Sized>(size: usize, rng: &mut R) -> Permutation {
    Permutation::random(size, rng).expect("size should be non-zero")
}

/// Correct backend that counts how often it is called.
#[derive(Debug, Default)]
pub struct CountingBackend {
    batches: AtomicUsize,
    requests: AtomicUsize,
}

impl CountingBackend {
    pub fn batches(&self) -> usize {
        self.batches.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl ModExpBackend for CountingBackend {
    fn compute_batch(
        &self,
        modulus: &BigUint,
        requests: &[ModExpRequest],
    ) -> Result<Vec<BigUint>, BackendError> {
        self.batches.fetch_add(1, Ordering::SeqCst);
        self.requests.fetch_add(requests.len(), Ordering::SeqCst);
        SequentialBackend.compute_batch(modulus, requests)
    }

    fn name(&self) -> &'static str {
        "counting"
    }
}

/// Broken backend that drops the last answer of every batch.
#[derive(Debug, Default, Clone, Copy)]
pub struct TruncatingBackend;

impl ModExpBackend for TruncatingBackend {
    fn compute_batch(
        &self,
        modulus: &BigUint,
        requests: &[ModExpRequest],
    ) -> Result<Vec<BigUint>, BackendError> {
        let mut answers = SequentialBackend.compute_batch(modulus, requests)?;
        answers.pop();
        Ok(answers)
    }

    fn name(&self) -> &'static str {
        "truncating"
    }
}
