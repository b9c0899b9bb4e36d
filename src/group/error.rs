use thiserror::Error;

use crate::batching::BatchError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GroupError {
    #[error("Element does not belong to this group")]
    InvalidElement,

    #[error("Exponent is outside the range accepted by this operation")]
    InvalidExponent,

    #[error("Invalid group parameters: {0}")]
    InvalidParameters(String),

    #[error("Batching error: {0}")]
    Batch(#[from] BatchError),
}
