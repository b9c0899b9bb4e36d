//! Deferred exponentiation handles.
//!
//! Callers push `(base, exponent)` pairs under one shared modulus and get an
//! [`ExpHandle`] back; a single [`DeferredExps::resolve`] call sends the whole
//! list to a backend and returns a [`ResolvedExps`] table indexed by handle.

use std::ops::Index;

use num_bigint::BigUint;

use super::backend::{BackendError, ModExpBackend};
use super::error::BatchError;

const LOG_TARGET: &str = "zk_mixnet::batching::deferred";

/// One `base^exponent` request. The modulus is shared by the whole batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModExpRequest {
    pub base: BigUint,
    pub exponent: BigUint,
}

impl ModExpRequest {
    pub fn new(base: BigUint, exponent: BigUint) -> Self {
        Self { base, exponent }
    }
}

/// Position of a deferred exponentiation inside its batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ExpHandle(usize);

impl ExpHandle {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Ordered list of pending exponentiations sharing one modulus.
#[derive(Clone, Debug, Default)]
pub struct DeferredExps {
    modulus: Option<BigUint>,
    requests: Vec<ModExpRequest>,
}

impl DeferredExps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(
        &mut self,
        base: BigUint,
        exponent: BigUint,
        modulus: &BigUint,
    ) -> Result<ExpHandle, BatchError> {
        match &self.modulus {
            Some(m) if m != modulus => return Err(BatchError::InconsistentModulus),
            Some(_) => {}
            None => self.modulus = Some(modulus.clone()),
        }
        self.requests.push(ModExpRequest::new(base, exponent));
        Ok(ExpHandle(self.requests.len() - 1))
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Shared modulus, set by the first push.
    pub fn modulus(&self) -> Option<&BigUint> {
        self.modulus.as_ref()
    }

    pub fn requests(&self) -> &[ModExpRequest] {
        &self.requests
    }

    /// Sends every pending request to `backend` in one call.
    ///
    /// An empty list resolves to an empty table without contacting the backend.
    pub fn resolve<B: ModExpBackend + ?Sized>(
        self,
        backend: &B,
    ) -> Result<ResolvedExps, BatchError> {
        let Some(modulus) = self.modulus else {
            return Ok(ResolvedExps { values: Vec::new() });
        };

        tracing::debug!(
            target: LOG_TARGET,
            backend = backend.name(),
            requests = self.requests.len(),
            modulus_bits = modulus.bits(),
            "Dispatching modexp batch"
        );

        let values = backend.compute_batch(&modulus, &self.requests)?;
        if values.len() != self.requests.len() {
            tracing::error!(
                target: LOG_TARGET,
                expected = self.requests.len(),
                actual = values.len(),
                "Backend answer does not match the request list"
            );
            return Err(BackendError::MalformedAnswer {
                expected: self.requests.len(),
                actual: values.len(),
            }
            .into());
        }

        Ok(ResolvedExps { values })
    }
}

/// Results of a resolved batch, positionally aligned with the pushes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedExps {
    values: Vec<BigUint>,
}

impl ResolvedExps {
    pub fn get(&self, handle: ExpHandle) -> Option<&BigUint> {
        self.values.get(handle.0)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_vec(self) -> Vec<BigUint> {
        self.values
    }
}

impl Index<ExpHandle> for ResolvedExps {
    type Output = BigUint;

    fn index(&self, handle: ExpHandle) -> &BigUint {
        &self.values[handle.0]
    }
}
