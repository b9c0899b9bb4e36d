//! Compute backends that answer a whole batch of modular exponentiations.
//!
//! A backend receives one shared modulus and an ordered request list and must
//! return exactly one result per request, in request order:
//!
//!   results[i] = requests[i].base ^ requests[i].exponent mod modulus
//!
//! The engine treats any length mismatch as fatal for the enclosing call.

use num_bigint::BigUint;
use rayon::prelude::*;
use thiserror::Error;

use super::deferred::ModExpRequest;

const LOG_TARGET: &str = "zk_mixnet::batching::backend";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Backend failed: {0}")]
    Failure(String),

    #[error("Backend returned {actual} results for {expected} requests")]
    MalformedAnswer { expected: usize, actual: usize },
}

/// Batch modular exponentiation service.
pub trait ModExpBackend: Send + Sync {
    fn compute_batch(
        &self,
        modulus: &BigUint,
        requests: &[ModExpRequest],
    ) -> Result<Vec<BigUint>, BackendError>;

    /// Short name used in logs.
    fn name(&self) -> &'static str {
        "backend"
    }
}

impl<B: ModExpBackend + ?Sized> ModExpBackend for std::sync::Arc<B> {
    fn compute_batch(
        &self,
        modulus: &BigUint,
        requests: &[ModExpRequest],
    ) -> Result<Vec<BigUint>, BackendError> {
        (**self).compute_batch(modulus, requests)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

impl<B: ModExpBackend + ?Sized> ModExpBackend for Box<B> {
    fn compute_batch(
        &self,
        modulus: &BigUint,
        requests: &[ModExpRequest],
    ) -> Result<Vec<BigUint>, BackendError> {
        (**self).compute_batch(modulus, requests)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Computes every request in order on the calling thread.
#[derive(Clone, Copy, Debug, Default)]
pub struct SequentialBackend;

impl ModExpBackend for SequentialBackend {
    #[tracing::instrument(target = LOG_TARGET, name = "sequential_batch", skip_all, fields(requests = requests.len()))]
    fn compute_batch(
        &self,
        modulus: &BigUint,
        requests: &[ModExpRequest],
    ) -> Result<Vec<BigUint>, BackendError> {
        Ok(requests
            .iter()
            .map(|req| req.base.modpow(&req.exponent, modulus))
            .collect())
    }

    fn name(&self) -> &'static str {
        "sequential"
    }
}

/// Spreads a batch over a rayon thread pool.
///
/// Without an explicit thread count the global rayon pool is used.
#[derive(Default)]
pub struct ParallelBackend {
    pool: Option<rayon::ThreadPool>,
}

impl ParallelBackend {
    pub fn new(threads: Option<usize>) -> Result<Self, BackendError> {
        let pool = match threads {
            None => None,
            Some(0) => {
                return Err(BackendError::Failure(
                    "parallel backend needs at least one thread".to_string(),
                ))
            }
            Some(n) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .thread_name(|i| format!("modexp-{i}"))
                    .build()
                    .map_err(|e| BackendError::Failure(e.to_string()))?,
            ),
        };
        tracing::debug!(target: LOG_TARGET, threads = ?threads, "Created parallel modexp backend");
        Ok(Self { pool })
    }

    pub fn num_threads(&self) -> usize {
        match &self.pool {
            Some(pool) => pool.current_num_threads(),
            None => rayon::current_num_threads(),
        }
    }

    fn run(modulus: &BigUint, requests: &[ModExpRequest]) -> Vec<BigUint> {
        requests
            .par_iter()
            .map(|req| req.base.modpow(&req.exponent, modulus))
            .collect()
    }
}

impl std::fmt::Debug for ParallelBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParallelBackend")
            .field("threads", &self.num_threads())
            .finish()
    }
}

impl ModExpBackend for ParallelBackend {
    #[tracing::instrument(target = LOG_TARGET, name = "parallel_batch", skip_all, fields(requests = requests.len()))]
    fn compute_batch(
        &self,
        modulus: &BigUint,
        requests: &[ModExpRequest],
    ) -> Result<Vec<BigUint>, BackendError> {
        let results = match &self.pool {
            Some(pool) => pool.install(|| Self::run(modulus, requests)),
            None => Self::run(modulus, requests),
        };
        Ok(results)
    }

    fn name(&self) -> &'static str {
        "parallel"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn requests() -> Vec<ModExpRequest> {
        (1u32..=40)
            .map(|i| ModExpRequest::new(BigUint::from(i + 1), BigUint::from(i * 7)))
            .collect()
    }

    #[test]
    fn test_backends_agree_and_preserve_order() {
        let modulus = BigUint::from(2039u32);
        let reqs = requests();

        let expected: Vec<BigUint> = reqs
            .iter()
            .map(|r| r.base.modpow(&r.exponent, &modulus))
            .collect();

        let sequential = SequentialBackend.compute_batch(&modulus, &reqs).unwrap();
        let parallel = ParallelBackend::new(Some(3))
            .unwrap()
            .compute_batch(&modulus, &reqs)
            .unwrap();
        let global = ParallelBackend::default()
            .compute_batch(&modulus, &reqs)
            .unwrap();

        assert_eq!(sequential, expected);
        assert_eq!(parallel, expected);
        assert_eq!(global, expected);
    }

    #[test]
    fn test_empty_batch() {
        let modulus = BigUint::from(23u32);
        assert!(SequentialBackend
            .compute_batch(&modulus, &[])
            .unwrap()
            .is_empty());
        assert!(ParallelBackend::default()
            .compute_batch(&modulus, &[])
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_zero_threads_rejected() {
        assert!(matches!(
            ParallelBackend::new(Some(0)),
            Err(BackendError::Failure(_))
        ));
    }
}
