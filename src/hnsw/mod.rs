//! HNSW (Hierarchical Navigable Small World) index module.

pub mod graph;
pub mod neighbor_queue;

pub use graph::{HnswGraph, HnswParams};

use crate::distance::SpaceType;
use crate::error::Result;
use crate::index::AnnIndex;
use crate::vector::EmbeddingVector;

/// An HNSW-based approximate nearest neighbor index.
#[derive(Debug)]
pub struct HnswIndex {
    graph: HnswGraph,
}

impl HnswIndex {
    pub fn new(space: SpaceType) -> Self {
        Self::with_params(space, HnswParams::default())
    }

    pub fn with_params(space: SpaceType, params: HnswParams) -> Self {
        Self {
            graph: HnswGraph::new(space, params),
        }
    }

    /// Search with a specific ef value for runtime tuning.
    pub fn search_with_ef(
        &self,
        query: &EmbeddingVector,
        k: usize,
        ef: usize,
    ) -> Result<Vec<(usize, f32)>> {
        let results = self.graph.search_knn(query, k, ef)?;
        Ok(results.into_iter().map(|n| (n.id, n.distance)).collect())
    }
}

impl AnnIndex for HnswIndex {
    fn add(&mut self, id: usize, vector: EmbeddingVector) -> Result<()> {
        self.graph.insert(id, vector)
    }

    fn remove(&mut self, id: usize) -> Result<()> {
        self.graph.remove(id)
    }

    fn search(&self, query: &EmbeddingVector, k: usize) -> Result<Vec<(usize, f32)>> {
        self.search_with_ef(query, k, self.graph.params().ef_search)
    }

    fn space(&self) -> SpaceType {
        self.graph.space()
    }

    fn len(&self) -> usize {
        self.graph.len()
    }
}
