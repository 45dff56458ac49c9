//! Vector index backends
//!
//! An [`IndexBackend`] hosts named indices with a mapping, accepts document
//! writes by id and answers k-NN queries against the vector field. Writes are
//! near-real-time: they become searchable after [`IndexBackend::refresh`].
//!
//! - [`MemoryBackend`]: in-process, built on the crate's HNSW and flat indices.
//! - [`OpenSearchBackend`]: an OpenSearch cluster with the k-NN plugin.

mod memory;
mod opensearch;

pub use memory::MemoryBackend;
pub use opensearch::OpenSearchBackend;

use async_trait::async_trait;
use serde_json::Value;

use crate::document::{DocumentId, IndexedDocument};
use crate::error::Result;
use crate::schema::IndexSchema;
use crate::vector::EmbeddingVector;

/// A k-nearest-neighbour query against one vector field.
#[derive(Debug, Clone)]
pub struct KnnQuery {
    pub field: String,
    pub vector: EmbeddingVector,
    pub k: usize,
}

/// One ranked hit. `source` is the stored body without its vector.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub id: String,
    /// Higher is more similar.
    pub score: f32,
    pub source: Value,
}

#[async_trait]
pub trait IndexBackend: Send + Sync {
    /// Short backend name for logs.
    fn kind(&self) -> &'static str;

    async fn index_exists(&self, index: &str) -> Result<bool>;

    /// Create `index` with `schema`. Fails with `IndexAlreadyExists` when the
    /// name is taken, including when another writer created it first.
    async fn create_index(&self, index: &str, schema: &IndexSchema) -> Result<()>;

    /// Write `document` under `id`, replacing any previous body.
    async fn upsert_document(
        &self,
        index: &str,
        id: &DocumentId,
        document: &IndexedDocument,
    ) -> Result<()>;

    /// Make every acknowledged write visible to search.
    async fn refresh(&self, index: &str) -> Result<()>;

    /// Hits in descending score order, at most `query.k` of them.
    async fn search(&self, index: &str, query: &KnnQuery) -> Result<Vec<SearchHit>>;

    /// Number of searchable documents.
    async fn count(&self, index: &str) -> Result<usize>;

    async fn delete_index(&self, index: &str) -> Result<()>;
}
