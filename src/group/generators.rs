//! Deterministic derivation of independent generators.
//!
//! Candidates are drawn from [`SchnorrGroup::random_values`] for a public seed,
//! lifted into the group by the cofactor exponentiation and kept when they pass
//! the generator test, in the order they are found. Prover and verifier derive
//! the same list from the same `(group, seed, count)` without interaction.
//!
//! The cofactor exponentiations of each round of candidates go to the backend
//! as one batch. Results are cached process-wide and shared read-only.

use std::collections::HashMap;
use std::sync::Arc;

use num_bigint::BigUint;
use once_cell::sync::Lazy;
use parking_lot::RwLock;

use super::error::GroupError;
use super::schnorr::{GroupElement, SchnorrGroup};
use crate::batching::{DeferredExps, ModExpBackend};

const LOG_TARGET: &str = "zk_mixnet::group::generators";

/// Distinct `(group, seed, count)` sets kept before the cache is cleared.
const MAX_CACHED_SETS: usize = 256;

#[derive(Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    modulus: BigUint,
    order: BigUint,
    seed: Vec<u8>,
    count: usize,
}

impl CacheKey {
    fn new(group: &SchnorrGroup, seed: &[u8], count: usize) -> Self {
        Self {
            modulus: group.modulus().clone(),
            order: group.order().clone(),
            seed: seed.to_vec(),
            count,
        }
    }
}

/// Read-mostly map of derived generator lists. Holds at most `capacity`
/// entries; inserting a new key into a full cache drops every entry first.
struct GeneratorCache {
    capacity: usize,
    entries: RwLock<HashMap<CacheKey, Arc<[GroupElement]>>>,
}

impl GeneratorCache {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn get(&self, key: &CacheKey) -> Option<Arc<[GroupElement]>> {
        self.entries.read().get(key).map(Arc::clone)
    }

    /// Stores `generators` unless another thread got there first, and returns
    /// the stored list.
    fn insert(&self, key: CacheKey, generators: Arc<[GroupElement]>) -> Arc<[GroupElement]> {
        let mut entries = self.entries.write();
        if entries.len() >= self.capacity && !entries.contains_key(&key) {
            tracing::debug!(target: LOG_TARGET, evicted = entries.len(), "Generator cache full, clearing");
            entries.clear();
        }
        Arc::clone(entries.entry(key).or_insert(generators))
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.read().len()
    }
}

static GENERATOR_CACHE: Lazy<GeneratorCache> = Lazy::new(|| GeneratorCache::new(MAX_CACHED_SETS));

/// Cached [`derive_generators_uncached`]. The process-wide cache is bounded;
/// once it holds `MAX_CACHED_SETS` lists it starts over.
#[tracing::instrument(target = LOG_TARGET, skip_all, fields(count = count, seed_len = seed.len()))]
pub fn derive_generators<B: ModExpBackend + ?Sized>(
    group: &SchnorrGroup,
    seed: &[u8],
    count: usize,
    backend: &B,
) -> Result<Arc<[GroupElement]>, GroupError> {
    let key = CacheKey::new(group, seed, count);

    if let Some(cached) = GENERATOR_CACHE.get(&key) {
        tracing::debug!(target: LOG_TARGET, count, "Generator cache hit");
        return Ok(cached);
    }

    let derived: Arc<[GroupElement]> = derive_generators_uncached(group, seed, count, backend)?.into();
    Ok(GENERATOR_CACHE.insert(key, derived))
}

/// Derives `count` generators of `group` from `seed`.
pub fn derive_generators_uncached<B: ModExpBackend + ?Sized>(
    group: &SchnorrGroup,
    seed: &[u8],
    count: usize,
    backend: &B,
) -> Result<Vec<GroupElement>, GroupError> {
    let mut candidates = group.random_values(seed);
    let mut generators = Vec::with_capacity(count);
    let mut rounds = 0usize;

    while generators.len() < count {
        let wanted = count - generators.len();
        let mut deferred = DeferredExps::new();
        let handles = candidates
            .by_ref()
            .take(wanted)
            .map(|x| deferred.push(x, group.cofactor().clone(), group.modulus()))
            .collect::<Result<Vec<_>, _>>()?;
        let lifted = deferred.resolve(backend)?;
        rounds += 1;

        for handle in handles {
            let candidate = group.wrap(lifted[handle].clone());
            if group.is_generator(&candidate) {
                generators.push(candidate);
            }
        }
    }

    tracing::debug!(target: LOG_TARGET, count, rounds, "Derived generators");
    Ok(generators)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batching::{DirectModExp, SequentialBackend};
    use crate::test_utils::{group_2039, test_group_256, toy_group, CountingBackend};

    #[test]
    fn test_derivation_is_deterministic() {
        let group = test_group_256();
        let a = derive_generators_uncached(&group, b"ballot-42", 6, &SequentialBackend).unwrap();
        let b = derive_generators_uncached(&group, b"ballot-42", 6, &SequentialBackend).unwrap();
        assert_eq!(a, b);
        assert!(a.iter().all(|g| group.is_generator(g)));

        let other_seed =
            derive_generators_uncached(&group, b"ballot-43", 6, &SequentialBackend).unwrap();
        assert_ne!(a, other_seed);

        let longer = derive_generators_uncached(&group, b"ballot-42", 7, &SequentialBackend).unwrap();
        assert_ne!(a, longer);
        assert_eq!(&longer[..6], a.as_slice());
    }

    #[test]
    fn test_batched_derivation_matches_sequential_enumeration() {
        let group = group_2039();
        let exp = DirectModExp::new();
        let sequential: Vec<GroupElement> = group
            .random_elements(&exp, b"enumerate")
            .map(|e| e.unwrap())
            .filter(|e| group.is_generator(e))
            .take(12)
            .collect();
        let derived = derive_generators_uncached(&group, b"enumerate", 12, &SequentialBackend).unwrap();
        assert_eq!(derived, sequential);
    }

    #[test]
    fn test_toy_group_rejects_identity_candidates() {
        // In a group of order 11 the only non-generator is the identity.
        let group = toy_group();
        let gens = derive_generators_uncached(&group, b"", 30, &SequentialBackend).unwrap();
        assert_eq!(gens.len(), 30);
        assert!(gens.iter().all(|g| !g.is_identity() && group.contains(g)));
    }

    #[test]
    fn test_cache_returns_shared_instance() {
        let group = group_2039();
        let backend = CountingBackend::default();
        let first = derive_generators(&group, b"cache-test", 5, &backend).unwrap();
        let batches = backend.batches();
        let second = derive_generators(&group, b"cache-test", 5, &backend).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(backend.batches(), batches);
    }

    #[test]
    fn test_cache_is_bounded() {
        let group = toy_group();
        let cache = GeneratorCache::new(2);
        let gens: Arc<[GroupElement]> =
            derive_generators_uncached(&group, b"bounded", 2, &SequentialBackend)
                .unwrap()
                .into();

        cache.insert(CacheKey::new(&group, b"a", 2), Arc::clone(&gens));
        cache.insert(CacheKey::new(&group, b"b", 2), Arc::clone(&gens));
        assert_eq!(cache.len(), 2);

        // an existing key never triggers eviction
        cache.insert(CacheKey::new(&group, b"b", 2), Arc::clone(&gens));
        assert_eq!(cache.len(), 2);
        assert!(cache.get(&CacheKey::new(&group, b"a", 2)).is_some());

        for seed in [b"c", b"d", b"e"] {
            cache.insert(CacheKey::new(&group, seed, 2), Arc::clone(&gens));
            assert!(cache.len() <= 2);
        }
        assert!(cache.get(&CacheKey::new(&group, b"e", 2)).is_some());
        assert!(cache.get(&CacheKey::new(&group, b"a", 2)).is_none());
    }

    #[test]
    fn test_zero_count() {
        let group = toy_group();
        let gens = derive_generators_uncached(&group, b"none", 0, &SequentialBackend).unwrap();
        assert!(gens.is_empty());
    }
}
