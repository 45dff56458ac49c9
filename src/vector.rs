//! Embedding vector type

use crate::error::{FfpError, Result};
use serde::{Deserialize, Serialize};

/// A fixed-length embedding produced by an [`EmbeddingProvider`].
///
/// Beyond its dimension the contents are opaque; it is only ever compared
/// against other vectors of the same dimension.
///
/// [`EmbeddingProvider`]: crate::embedding::EmbeddingProvider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmbeddingVector {
    data: Vec<f32>,
}

impl EmbeddingVector {
    /// Create a new vector from a Vec<f32>
    pub fn new(data: Vec<f32>) -> Self {
        Self { data }
    }

    /// Build a vector from provider output, rejecting non-finite components.
    pub fn from_f64(values: &[f64]) -> Result<Self> {
        let data: Vec<f32> = values.iter().map(|&v| v as f32).collect();
        let vector = Self::new(data);
        vector.ensure_finite()?;
        Ok(vector)
    }

    pub fn dimension(&self) -> usize {
        self.data.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.data
    }

    pub fn has_same_dimension(&self, other: &EmbeddingVector) -> bool {
        self.dimension() == other.dimension()
    }

    /// Fail unless this vector has exactly `expected` components.
    pub fn check_dimension(&self, expected: usize) -> Result<()> {
        if self.dimension() != expected {
            return Err(FfpError::DimensionMismatch {
                expected,
                actual: self.dimension(),
            });
        }
        Ok(())
    }

    pub fn ensure_finite(&self) -> Result<()> {
        if let Some(pos) = self.data.iter().position(|x| !x.is_finite()) {
            return Err(FfpError::InvalidVector {
                reason: format!("component {} is not finite", pos),
            });
        }
        Ok(())
    }

    /// Compute the L2 norm (magnitude) of the vector
    pub fn norm(&self) -> f32 {
        self.data.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    /// Normalize the vector to unit length
    pub fn normalize(&mut self) -> Result<()> {
        let norm = self.norm();
        if norm == 0.0 {
            return Err(FfpError::InvalidVector {
                reason: "Cannot normalize zero vector".to_string(),
            });
        }
        for x in &mut self.data {
            *x /= norm;
        }
        Ok(())
    }

    /// Create a normalized copy of the vector
    pub fn normalized(&self) -> Result<EmbeddingVector> {
        let mut v = self.clone();
        v.normalize()?;
        Ok(v)
    }
}

impl From<Vec<f32>> for EmbeddingVector {
    fn from(data: Vec<f32>) -> Self {
        Self::new(data)
    }
}
