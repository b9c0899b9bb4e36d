//! Permutations of `{0, …, N-1}`.

use rand::Rng;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PermutationError {
    #[error("Permutation must not be empty")]
    Empty,

    #[error("Index {index} is out of range for a permutation of size {size}")]
    OutOfRange { index: usize, size: usize },

    #[error("Index {index} appears more than once")]
    NotABijection { index: usize },

    #[error("Length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
}

/// Bijection on `{0, …, N-1}` stored as its image list: `π(i) = indices[i]`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Permutation {
    indices: Vec<usize>,
}

impl Permutation {
    pub fn new(indices: Vec<usize>) -> Result<Self, PermutationError> {
        if indices.is_empty() {
            return Err(PermutationError::Empty);
        }
        let size = indices.len();
        let mut seen = vec![false; size];
        for &index in &indices {
            if index >= size {
                return Err(PermutationError::OutOfRange { index, size });
            }
            if std::mem::replace(&mut seen[index], true) {
                return Err(PermutationError::NotABijection { index });
            }
        }
        Ok(Self { indices })
    }

    pub fn identity(size: usize) -> Result<Self, PermutationError> {
        Self::new((0..size).collect())
    }

    /// Uniform permutation by Fisher–Yates.
    pub fn random<R: Rng + ?Sized>(size: usize, rng: &mut R) -> Result<Self, PermutationError> {
        let mut indices: Vec<usize> = (0..size).collect();
        for i in (1..size).rev() {
            let j = rng.gen_range(0..=i);
            indices.swap(i, j);
        }
        Self::new(indices)
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// `π(i)`. Panics if `i` is out of range.
    pub fn apply(&self, i: usize) -> usize {
        self.indices[i]
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.indices
    }

    pub fn inverse(&self) -> Self {
        let mut inverse = vec![0; self.indices.len()];
        for (i, &pi) in self.indices.iter().enumerate() {
            inverse[pi] = i;
        }
        Self { indices: inverse }
    }

    /// `(self ∘ other)(i) = self(other(i))`.
    pub fn compose(&self, other: &Self) -> Result<Self, PermutationError> {
        self.check_len(other.len())?;
        Ok(Self {
            indices: other.indices.iter().map(|&i| self.indices[i]).collect(),
        })
    }

    /// Moves the entry at position `i` to position `π(i)`:
    /// `out[π(i)] = values[i]`.
    pub fn permute<T: Clone>(&self, values: &[T]) -> Result<Vec<T>, PermutationError> {
        self.check_len(values.len())?;
        let inverse = self.inverse();
        Ok(inverse
            .indices
            .iter()
            .map(|&source| values[source].clone())
            .collect())
    }

    fn check_len(&self, actual: usize) -> Result<(), PermutationError> {
        if actual != self.indices.len() {
            return Err(PermutationError::LengthMismatch {
                expected: self.indices.len(),
                actual,
            });
        }
        Ok(())
    }
}
