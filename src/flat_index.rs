//! Brute-force flat index: exact O(n) k-NN search

use std::collections::HashMap;

use rayon::prelude::*;

use crate::distance::SpaceType;
use crate::error::Result;
use crate::index::{by_distance_then_id, AnnIndex};
use crate::vector::EmbeddingVector;

/// Below this many vectors the search stays on the calling thread.
const PARALLEL_THRESHOLD: usize = 2_048;

/// A flat (brute-force) index that computes distance to every stored vector.
#[derive(Debug)]
pub struct FlatIndex {
    vectors: HashMap<usize, EmbeddingVector>,
    space: SpaceType,
}

impl FlatIndex {
    pub fn new(space: SpaceType) -> Self {
        Self {
            vectors: HashMap::new(),
            space,
        }
    }
}

impl AnnIndex for FlatIndex {
    fn add(&mut self, id: usize, vector: EmbeddingVector) -> Result<()> {
        self.vectors.insert(id, vector);
        Ok(())
    }

    fn remove(&mut self, id: usize) -> Result<()> {
        self.vectors.remove(&id);
        Ok(())
    }

    fn search(&self, query: &EmbeddingVector, k: usize) -> Result<Vec<(usize, f32)>> {
        let space = self.space;
        let score = |(&id, vec): (&usize, &EmbeddingVector)| -> Result<(usize, f32)> {
            Ok((id, space.distance(query, vec)?))
        };

        let mut results: Vec<(usize, f32)> = if self.vectors.len() >= PARALLEL_THRESHOLD {
            self.vectors
                .par_iter()
                .map(score)
                .collect::<Result<Vec<_>>>()?
        } else {
            self.vectors.iter().map(score).collect::<Result<Vec<_>>>()?
        };

        results.sort_by(by_distance_then_id);
        results.truncate(k);
        Ok(results)
    }

    fn space(&self) -> SpaceType {
        self.space
    }

    fn len(&self) -> usize {
        self.vectors.len()
    }
}
