use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::backend::{IndexBackend, KnnQuery, SearchHit};
use crate::document::{DocumentId, IndexedDocument};
use crate::error::{FfpError, Result};
use crate::schema::{IndexSchema, VectorField};
use crate::storage::DocumentStore;

/// One hosted index: what search sees, plus writes waiting for a refresh.
struct HostedIndex {
    schema: IndexSchema,
    vector_field: String,
    field: VectorField,
    visible: DocumentStore,
    pending: DocumentStore,
}

impl HostedIndex {
    fn new(schema: IndexSchema) -> Result<Self> {
        let (name, field) = schema.vector_field()?;
        let (vector_field, field) = (name.to_string(), *field);
        Ok(Self {
            schema,
            vector_field,
            field,
            visible: DocumentStore::for_field(&field)?,
            pending: DocumentStore::for_field(&field)?,
        })
    }
}

/// In-process backend with near-real-time visibility.
///
/// Writes land in a pending buffer and only show up in search and counts
/// after [`IndexBackend::refresh`], the same contract a search cluster gives.
#[derive(Default)]
pub struct MemoryBackend {
    indices: RwLock<HashMap<String, HostedIndex>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schema `index` was created with.
    pub async fn schema(&self, index: &str) -> Option<IndexSchema> {
        self.indices
            .read()
            .await
            .get(index)
            .map(|hosted| hosted.schema.clone())
    }

    /// The visible document stored under `id`.
    pub async fn document(&self, index: &str, id: &str) -> Option<IndexedDocument> {
        self.indices
            .read()
            .await
            .get(index)
            .and_then(|hosted| hosted.visible.get(id).cloned())
    }

    pub async fn index_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.indices.read().await.keys().cloned().collect();
        names.sort();
        names
    }
}

fn not_found(index: &str) -> FfpError {
    FfpError::IndexNotFound {
        name: index.to_string(),
    }
}

#[async_trait]
impl IndexBackend for MemoryBackend {
    fn kind(&self) -> &'static str {
        "memory"
    }

    async fn index_exists(&self, index: &str) -> Result<bool> {
        Ok(self.indices.read().await.contains_key(index))
    }

    async fn create_index(&self, index: &str, schema: &IndexSchema) -> Result<()> {
        let mut indices = self.indices.write().await;
        if indices.contains_key(index) {
            return Err(FfpError::IndexAlreadyExists {
                name: index.to_string(),
            });
        }
        schema.validate()?;
        let hosted = HostedIndex::new(schema.clone())?;
        info!(index, dimension = hosted.field.dimension, space = %hosted.field.space, "created in-memory index");
        indices.insert(index.to_string(), hosted);
        Ok(())
    }

    async fn upsert_document(
        &self,
        index: &str,
        id: &DocumentId,
        document: &IndexedDocument,
    ) -> Result<()> {
        let mut indices = self.indices.write().await;
        let hosted = indices.get_mut(index).ok_or_else(|| not_found(index))?;
        hosted.pending.upsert(id.as_str(), document.clone())?;
        debug!(index, id = %id, "buffered document");
        Ok(())
    }

    async fn refresh(&self, index: &str) -> Result<()> {
        let mut indices = self.indices.write().await;
        let hosted = indices.get_mut(index).ok_or_else(|| not_found(index))?;
        let pending = std::mem::replace(&mut hosted.pending, DocumentStore::for_field(&hosted.field)?);
        let applied = hosted.visible.absorb(pending)?;
        debug!(index, applied, total = hosted.visible.len(), "refreshed");
        Ok(())
    }

    async fn search(&self, index: &str, query: &KnnQuery) -> Result<Vec<SearchHit>> {
        let indices = self.indices.read().await;
        let hosted = indices.get(index).ok_or_else(|| not_found(index))?;
        if query.field != hosted.vector_field {
            return Err(FfpError::Index(format!(
                "field '{}' is not the vector field of '{}'",
                query.field, index
            )));
        }

        let space = hosted.visible.space();
        let hits = hosted
            .visible
            .search(&query.vector, query.k)?
            .into_iter()
            .filter_map(|hit| {
                let document = hosted.visible.get(&hit.id)?;
                Some(SearchHit {
                    score: space.score(hit.distance),
                    source: json!({
                        "club": document.club,
                        "year": document.year,
                        "text_content": document.text_content,
                        "metadata": document.metadata,
                    }),
                    id: hit.id,
                })
            })
            .collect();
        Ok(hits)
    }

    async fn count(&self, index: &str) -> Result<usize> {
        let indices = self.indices.read().await;
        let hosted = indices.get(index).ok_or_else(|| not_found(index))?;
        Ok(hosted.visible.len())
    }

    async fn delete_index(&self, index: &str) -> Result<()> {
        match self.indices.write().await.remove(index) {
            Some(_) => Ok(()),
            None => Err(not_found(index)),
        }
    }
}
