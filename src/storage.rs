//! In-memory document storage over a pluggable ANN index

use std::collections::HashMap;

use crate::distance::SpaceType;
use crate::document::IndexedDocument;
use crate::error::{FfpError, Result};
use crate::flat_index::FlatIndex;
use crate::hnsw::HnswIndex;
use crate::index::AnnIndex;
use crate::schema::VectorField;
use crate::vector::EmbeddingVector;

/// A nearest-neighbor hit: document id plus its distance to the query.
#[derive(Debug, Clone)]
pub struct StoredHit {
    pub id: String,
    pub distance: f32,
}

/// Documents keyed by string id, with their vectors held in an ANN index.
///
/// Writing an id that already exists replaces the previous document and
/// vector (upsert). Every write gets a fresh internal id, so internal ids
/// reflect write order.
pub struct DocumentStore {
    index: Box<dyn AnnIndex>,
    /// String ID -> usize internal ID
    id_to_internal: HashMap<String, usize>,
    /// usize internal ID -> String ID
    internal_to_id: HashMap<usize, String>,
    /// Document bodies keyed by internal ID
    documents: HashMap<usize, IndexedDocument>,
    next_id: usize,
    dimension: usize,
}

impl std::fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStore")
            .field("len", &self.len())
            .field("dimension", &self.dimension)
            .field("space", &self.index.space())
            .finish()
    }
}

impl DocumentStore {
    pub fn with_index(index: Box<dyn AnnIndex>, dimension: usize) -> Self {
        Self {
            index,
            id_to_internal: HashMap::new(),
            internal_to_id: HashMap::new(),
            documents: HashMap::new(),
            next_id: 0,
            dimension,
        }
    }

    /// Build the store a schema's vector field asks for.
    pub fn for_field(field: &VectorField) -> Result<Self> {
        let index: Box<dyn AnnIndex> = match field.method.hnsw_params()? {
            Some(params) => Box::new(HnswIndex::with_params(field.space, params)),
            None => Box::new(FlatIndex::new(field.space)),
        };
        Ok(Self::with_index(index, field.dimension))
    }

    /// Insert or replace the document stored under `id`.
    pub fn upsert(&mut self, id: impl Into<String>, document: IndexedDocument) -> Result<()> {
        let id = id.into();
        document.vector.check_dimension(self.dimension)?;
        document.vector.ensure_finite()?;
        if self.index.space() == SpaceType::CosineSimil && document.vector.norm() == 0.0 {
            return Err(FfpError::InvalidVector {
                reason: format!("zero vector for '{}' has no cosine direction", id),
            });
        }

        let internal_id = self.next_id;
        // Add first: if the index rejects the vector the old document survives.
        self.index.add(internal_id, document.vector.clone())?;
        self.next_id += 1;

        if let Some(old_internal) = self.id_to_internal.insert(id.clone(), internal_id) {
            self.index.remove(old_internal)?;
            self.documents.remove(&old_internal);
            self.internal_to_id.remove(&old_internal);
        }
        self.internal_to_id.insert(internal_id, id);
        self.documents.insert(internal_id, document);

        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&IndexedDocument> {
        self.id_to_internal
            .get(id)
            .and_then(|internal| self.documents.get(internal))
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// The k nearest documents, closest first; ties in write order.
    pub fn search(&self, query: &EmbeddingVector, k: usize) -> Result<Vec<StoredHit>> {
        if self.is_empty() || k == 0 {
            return Ok(vec![]);
        }
        query.check_dimension(self.dimension)?;

        let hits = self
            .index
            .search(query, k)?
            .into_iter()
            .filter_map(|(internal_id, distance)| {
                self.internal_to_id.get(&internal_id).map(|id| StoredHit {
                    id: id.clone(),
                    distance,
                })
            })
            .collect();
        Ok(hits)
    }

    pub fn space(&self) -> SpaceType {
        self.index.space()
    }

    /// Move every document from `other` into this store, overwriting by id.
    /// Documents are applied in the order they were written to `other`.
    pub fn absorb(&mut self, other: DocumentStore) -> Result<usize> {
        let mut pending: Vec<(usize, IndexedDocument)> = other.documents.into_iter().collect();
        pending.sort_by_key(|(internal, _)| *internal);

        let mut applied = 0;
        for (internal, document) in pending {
            if let Some(id) = other.internal_to_id.get(&internal) {
                self.upsert(id.clone(), document)?;
                applied += 1;
            }
        }
        Ok(applied)
    }
}
