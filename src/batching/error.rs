use thiserror::Error;

use super::backend::BackendError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BatchError {
    #[error("Exponentiations in one batch must share a single modulus")]
    InconsistentModulus,

    #[error("A batched window is already active on this engine (tag `{0}`)")]
    AlreadyRecording(String),

    #[error("Replay requested more exponentiations than were recorded")]
    ReplayExhausted,

    #[error("Replay finished with {remaining} recorded exponentiations unconsumed")]
    ReplayIncomplete { remaining: usize },

    #[error("Backend failure: {0}")]
    Backend(#[from] BackendError),
}
