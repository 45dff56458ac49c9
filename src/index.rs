//! ANN index trait for the in-memory backend's vector field

use crate::distance::SpaceType;
use crate::error::Result;
use crate::vector::EmbeddingVector;

/// An approximate (or exact) nearest-neighbor index over embedding vectors.
///
/// Implementations use `usize` internal IDs for cache efficiency;
/// the `DocumentStore` handles document-id-to-usize mapping. Internal IDs are
/// handed out in write order, so they double as the insertion-order
/// tie-breaker for equal distances.
pub trait AnnIndex: Send + Sync {
    fn add(&mut self, id: usize, vector: EmbeddingVector) -> Result<()>;

    /// Remove the vector with the given internal ID. Unknown IDs are ignored.
    fn remove(&mut self, id: usize) -> Result<()>;

    /// Search for the `k` nearest neighbors of `query`.
    /// Returns `(id, distance)` pairs sorted by distance ascending, then by id.
    fn search(&self, query: &EmbeddingVector, k: usize) -> Result<Vec<(usize, f32)>>;

    fn space(&self) -> SpaceType;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Order `(id, distance)` pairs by distance, then by internal id.
pub(crate) fn by_distance_then_id(a: &(usize, f32), b: &(usize, f32)) -> std::cmp::Ordering {
    a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0))
}
