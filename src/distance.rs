//! Vector spaces: distance functions and their relevance scores

use crate::error::{FfpError, Result};
use crate::vector::EmbeddingVector;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Similarity space of a k-NN vector field.
///
/// Serialized names match the `space_type` values of the OpenSearch k-NN
/// plugin so a schema can be sent to the backend verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SpaceType {
    /// Cosine similarity (distance: 1 - similarity)
    #[default]
    #[serde(rename = "cosinesimil")]
    CosineSimil,
    /// Euclidean (L2) distance
    #[serde(rename = "l2")]
    L2,
    /// Inner product (negated for minimum distance)
    #[serde(rename = "innerproduct")]
    InnerProduct,
}

impl SpaceType {
    /// Compute the distance between two vectors in this space. Smaller is closer.
    pub fn distance(&self, v1: &EmbeddingVector, v2: &EmbeddingVector) -> Result<f32> {
        if !v1.has_same_dimension(v2) {
            return Err(FfpError::DimensionMismatch {
                expected: v1.dimension(),
                actual: v2.dimension(),
            });
        }

        match self {
            SpaceType::CosineSimil => cosine_distance(v1, v2),
            SpaceType::L2 => Ok(euclidean_distance(v1, v2)),
            SpaceType::InnerProduct => Ok(-dot_product(v1, v2)),
        }
    }

    /// Convert a distance into a relevance score where higher is more similar.
    ///
    /// Uses the same scales as the OpenSearch k-NN plugin, so results coming
    /// from the in-memory backend and from a remote cluster are comparable.
    pub fn score(&self, distance: f32) -> f32 {
        match self {
            // (1 + cos) / 2, in [0, 1]
            SpaceType::CosineSimil => (2.0 - distance) / 2.0,
            SpaceType::L2 => 1.0 / (1.0 + distance * distance),
            SpaceType::InnerProduct => {
                let dot = -distance;
                if dot >= 0.0 {
                    dot + 1.0
                } else {
                    1.0 / (1.0 - dot)
                }
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SpaceType::CosineSimil => "cosinesimil",
            SpaceType::L2 => "l2",
            SpaceType::InnerProduct => "innerproduct",
        }
    }
}

impl fmt::Display for SpaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compute Euclidean (L2) distance between two vectors
pub fn euclidean_distance(v1: &EmbeddingVector, v2: &EmbeddingVector) -> f32 {
    v1.as_slice()
        .iter()
        .zip(v2.as_slice().iter())
        .map(|(a, b)| (a - b).powi(2))
        .sum::<f32>()
        .sqrt()
}

/// Compute cosine distance between two vectors (1 - cosine similarity)
pub fn cosine_distance(v1: &EmbeddingVector, v2: &EmbeddingVector) -> Result<f32> {
    let norm1 = v1.norm();
    let norm2 = v2.norm();

    if norm1 == 0.0 || norm2 == 0.0 {
        return Err(FfpError::InvalidVector {
            reason: "Cannot compute cosine distance with zero vector".to_string(),
        });
    }

    let similarity = dot_product(v1, v2) / (norm1 * norm2);

    // Clamp to [-1, 1] to handle floating point errors
    let similarity = similarity.clamp(-1.0, 1.0);

    Ok(1.0 - similarity)
}

pub fn dot_product(v1: &EmbeddingVector, v2: &EmbeddingVector) -> f32 {
    v1.as_slice()
        .iter()
        .zip(v2.as_slice().iter())
        .map(|(a, b)| a * b)
        .sum()
}
