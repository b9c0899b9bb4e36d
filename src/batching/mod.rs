//! Modular-exponentiation batching.
//!
//! Group code never calls `BigUint::modpow` itself: every exponentiation goes
//! through a [`ModExp`] implementation. [`DirectModExp`] computes on the spot;
//! [`ExpBatchEngine`] can additionally run a closure twice, first recording its
//! exponentiations (answering each with the placeholder `1`), then sending the
//! recorded list to a [`ModExpBackend`] in one call and replaying the closure
//! with the real answers substituted in call order.
//!
//! The closure handed to [`ExpBatchEngine::run_batched`] must issue the same
//! sequence of exponentiations on both passes, i.e. its control flow may depend
//! on input sizes but never on the value of an exponentiation result. A closure
//! that breaks this trips [`BatchError::ReplayExhausted`] or
//! [`BatchError::ReplayIncomplete`], or silently consumes the wrong answer.
//!
//! An engine is a per-computation context: it is `!Sync`, and a fresh one is
//! created for each proof generation or verification.

pub mod backend;
pub mod deferred;
pub mod error;

use std::cell::{Cell, RefCell};
use std::sync::atomic::{AtomicU64, Ordering};

use num_bigint::BigUint;
use num_traits::One;

pub use backend::{BackendError, ModExpBackend, ParallelBackend, SequentialBackend};
pub use deferred::{DeferredExps, ExpHandle, ModExpRequest, ResolvedExps};
pub use error::BatchError;

const LOG_TARGET: &str = "zk_mixnet::batching";

/// Interception point for `base^exponent mod modulus`.
pub trait ModExp {
    fn mod_pow(
        &self,
        base: &BigUint,
        exponent: &BigUint,
        modulus: &BigUint,
    ) -> Result<BigUint, BatchError>;

    /// Number of exponentiations this instance has caused to be computed.
    fn modexp_count(&self) -> u64;
}

/// Computes every exponentiation immediately.
#[derive(Debug, Default)]
pub struct DirectModExp {
    count: AtomicU64,
}

impl DirectModExp {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ModExp for DirectModExp {
    fn mod_pow(
        &self,
        base: &BigUint,
        exponent: &BigUint,
        modulus: &BigUint,
    ) -> Result<BigUint, BatchError> {
        self.count.fetch_add(1, Ordering::Relaxed);
        Ok(base.modpow(exponent, modulus))
    }

    fn modexp_count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

/// Per-engine exponentiation counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Computed on the spot, outside any batched window.
    pub direct: u64,
    /// Captured during a recording pass and sent to the backend.
    pub recorded: u64,
    /// Answered from a backend result during a replay pass.
    pub replayed: u64,
    /// Backend round trips.
    pub batches: u64,
}

enum EngineState {
    Idle,
    Recording {
        tag: String,
        deferred: DeferredExps,
    },
    Replaying {
        tag: String,
        answers: std::vec::IntoIter<BigUint>,
    },
}

impl EngineState {
    fn tag(&self) -> Option<&str> {
        match self {
            EngineState::Idle => None,
            EngineState::Recording { tag, .. } | EngineState::Replaying { tag, .. } => {
                Some(tag.as_str())
            }
        }
    }
}

/// Record/replay batching context bound to one backend.
pub struct ExpBatchEngine<'b> {
    backend: &'b dyn ModExpBackend,
    state: RefCell<EngineState>,
    stats: Cell<EngineStats>,
}

impl<'b> ExpBatchEngine<'b> {
    pub fn new(backend: &'b dyn ModExpBackend) -> Self {
        Self {
            backend,
            state: RefCell::new(EngineState::Idle),
            stats: Cell::new(EngineStats::default()),
        }
    }

    pub fn stats(&self) -> EngineStats {
        self.stats.get()
    }

    pub fn backend(&self) -> &'b dyn ModExpBackend {
        self.backend
    }

    /// Whether a batched window is currently open.
    pub fn is_active(&self) -> bool {
        !matches!(*self.state.borrow(), EngineState::Idle)
    }

    fn bump(&self, update: impl FnOnce(&mut EngineStats)) {
        let mut stats = self.stats.get();
        update(&mut stats);
        self.stats.set(stats);
    }

    /// Runs `f` as one batched window tagged `tag`.
    ///
    /// The first pass only records; its result is dropped. If nothing was
    /// recorded the first result is already real and is returned as is.
    /// Otherwise the recorded list goes to the backend in one call and `f` runs
    /// again against the answers. Nested windows fail with
    /// [`BatchError::AlreadyRecording`].
    #[tracing::instrument(target = LOG_TARGET, skip_all, fields(tag = tag))]
    pub fn run_batched<T, E, F>(&self, tag: &str, mut f: F) -> Result<T, E>
    where
        F: FnMut() -> Result<T, E>,
        E: From<BatchError>,
    {
        self.begin_recording(tag)?;
        let first = f();
        let deferred = self.take_recording();
        let first = first?;

        if deferred.is_empty() {
            tracing::debug!(target: LOG_TARGET, tag, "No exponentiations recorded");
            return Ok(first);
        }
        drop(first);

        let recorded = deferred.len();
        let answers = deferred.resolve(self.backend)?;
        self.bump(|s| s.batches += 1);

        *self.state.borrow_mut() = EngineState::Replaying {
            tag: tag.to_string(),
            answers: answers.into_vec().into_iter(),
        };
        let second = f();
        let remaining = self.take_replay();
        let second = second?;

        if remaining > 0 {
            tracing::error!(
                target: LOG_TARGET,
                tag,
                recorded,
                remaining,
                "Replay pass consumed fewer exponentiations than were recorded"
            );
            return Err(BatchError::ReplayIncomplete { remaining }.into());
        }

        tracing::debug!(target: LOG_TARGET, tag, recorded, "Batched window complete");
        Ok(second)
    }

    fn begin_recording(&self, tag: &str) -> Result<(), BatchError> {
        let mut state = self.state.borrow_mut();
        if let Some(active) = state.tag() {
            tracing::error!(target: LOG_TARGET, active, requested = tag, "Nested batched window");
            return Err(BatchError::AlreadyRecording(active.to_string()));
        }
        *state = EngineState::Recording {
            tag: tag.to_string(),
            deferred: DeferredExps::new(),
        };
        Ok(())
    }

    fn take_recording(&self) -> DeferredExps {
        match std::mem::replace(&mut *self.state.borrow_mut(), EngineState::Idle) {
            EngineState::Recording { deferred, .. } => deferred,
            _ => DeferredExps::new(),
        }
    }

    fn take_replay(&self) -> usize {
        match std::mem::replace(&mut *self.state.borrow_mut(), EngineState::Idle) {
            EngineState::Replaying { answers, .. } => answers.len(),
            _ => 0,
        }
    }
}

impl ModExp for ExpBatchEngine<'_> {
    fn mod_pow(
        &self,
        base: &BigUint,
        exponent: &BigUint,
        modulus: &BigUint,
    ) -> Result<BigUint, BatchError> {
        let mut state = self.state.borrow_mut();
        match &mut *state {
            EngineState::Idle => {
                self.bump(|s| s.direct += 1);
                Ok(base.modpow(exponent, modulus))
            }
            EngineState::Recording { deferred, .. } => {
                deferred.push(base.clone(), exponent.clone(), modulus)?;
                self.bump(|s| s.recorded += 1);
                Ok(BigUint::one())
            }
            EngineState::Replaying { answers, .. } => {
                let answer = answers.next().ok_or(BatchError::ReplayExhausted)?;
                self.bump(|s| s.replayed += 1);
                Ok(answer)
            }
        }
    }

    fn modexp_count(&self) -> u64 {
        let stats = self.stats.get();
        stats.direct + stats.recorded
    }
}
