//! Natural-language similarity search over indexed records

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::backend::{IndexBackend, KnnQuery, SearchHit};
use crate::document::DocumentId;
use crate::embedding::EmbeddingProvider;
use crate::error::{FfpError, Result};
use crate::record::FinancialRecord;

/// Results returned when the caller does not ask for a count.
pub const DEFAULT_K: usize = 5;

/// One ranked record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    /// Higher is more similar.
    pub score: f32,
    pub club: String,
    /// The record exactly as it was indexed.
    pub metadata: FinancialRecord,
}

pub struct SimilaritySearcher {
    embedder: Arc<dyn EmbeddingProvider>,
    backend: Arc<dyn IndexBackend>,
    index_name: String,
    vector_field: String,
}

impl SimilaritySearcher {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        backend: Arc<dyn IndexBackend>,
        index_name: impl Into<String>,
        vector_field: impl Into<String>,
    ) -> Self {
        Self {
            embedder,
            backend,
            index_name: index_name.into(),
            vector_field: vector_field.into(),
        }
    }

    /// The `k` records most similar to `query`, best first.
    ///
    /// Fewer than `k` come back when the index holds fewer documents. Equal
    /// scores keep the order the backend returned them in.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchResult>> {
        if query.trim().is_empty() {
            return Err(FfpError::validation("search query is empty"));
        }
        if k == 0 {
            return Err(FfpError::validation("k must be at least 1"));
        }

        let vector = self.embedder.embed(query).await?;
        let knn = KnnQuery {
            field: self.vector_field.clone(),
            vector,
            k,
        };
        let hits = self.backend.search(&self.index_name, &knn).await?;
        debug!(index = %self.index_name, k, hits = hits.len(), "knn search");

        let mut results = hits
            .into_iter()
            .map(into_result)
            .collect::<Result<Vec<_>>>()?;
        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(k);
        Ok(results)
    }

    pub async fn search_default(&self, query: &str) -> Result<Vec<SearchResult>> {
        self.search(query, DEFAULT_K).await
    }
}

fn into_result(hit: SearchHit) -> Result<SearchResult> {
    let SearchHit { id, score, source } = hit;
    let raw_metadata = source
        .get("metadata")
        .cloned()
        .ok_or_else(|| FfpError::Index(format!("hit '{id}' has no metadata")))?;
    let metadata: FinancialRecord = serde_json::from_value(raw_metadata)
        .map_err(|e| FfpError::Index(format!("hit '{id}' has unreadable metadata: {e}")))?;

    let club = source
        .get("club")
        .and_then(|c| c.as_str())
        .map(str::to_string)
        .or_else(|| DocumentId::parse(&id).map(|(club, _)| club.to_string()))
        .unwrap_or_else(|| metadata.club.clone());

    Ok(SearchResult {
        score,
        club,
        metadata,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::distance::SpaceType;
    use crate::document::IndexedDocument;
    use crate::embedding::HashingEmbeddingProvider;
    use crate::record::Metric;
    use crate::schema::{AnnMethod, IndexSchema};
    use async_trait::async_trait;
    use serde_json::json;

    /// Serves a fixed hit list regardless of the query.
    struct CannedBackend {
        hits: Vec<SearchHit>,
    }

    #[async_trait]
    impl IndexBackend for CannedBackend {
        fn kind(&self) -> &'static str {
            "canned"
        }

        async fn index_exists(&self, _index: &str) -> Result<bool> {
            Ok(true)
        }

        async fn create_index(&self, _index: &str, _schema: &IndexSchema) -> Result<()> {
            Ok(())
        }

        async fn upsert_document(
            &self,
            _index: &str,
            _id: &DocumentId,
            _document: &IndexedDocument,
        ) -> Result<()> {
            Ok(())
        }

        async fn refresh(&self, _index: &str) -> Result<()> {
            Ok(())
        }

        async fn search(&self, _index: &str, query: &KnnQuery) -> Result<Vec<SearchHit>> {
            Ok(self.hits.iter().take(query.k).cloned().collect())
        }

        async fn count(&self, _index: &str) -> Result<usize> {
            Ok(self.hits.len())
        }

        async fn delete_index(&self, _index: &str) -> Result<()> {
            Ok(())
        }
    }

    fn hit(club: &str, score: f32) -> SearchHit {
        let record = FinancialRecord::new(club, 2023, true).with_metric(Metric::Debt, 1_000_000);
        SearchHit {
            id: DocumentId::new(club, 2023).to_string(),
            score,
            source: json!({ "club": club, "metadata": record }),
        }
    }

    fn searcher(backend: Arc<dyn IndexBackend>) -> SimilaritySearcher {
        SimilaritySearcher::new(
            Arc::new(HashingEmbeddingProvider::new(16).unwrap()),
            backend,
            "ffp-vectors",
            "vector",
        )
    }

    #[tokio::test]
    async fn test_validation_precedes_embedding() {
        let s = searcher(Arc::new(CannedBackend { hits: vec![] }));
        assert!(s.search("", 5).await.unwrap_err().is_validation());
        assert!(s.search("   ", 5).await.unwrap_err().is_validation());
        assert!(s.search("high debt", 0).await.unwrap_err().is_validation());
    }

    #[tokio::test]
    async fn test_results_sorted_and_truncated() {
        let backend = CannedBackend {
            hits: vec![hit("Chelsea", 0.4), hit("Arsenal", 0.9), hit("Brighton", 0.4)],
        };
        let s = searcher(Arc::new(backend));

        let results = s.search("debt", 3).await.unwrap();
        let clubs: Vec<&str> = results.iter().map(|r| r.club.as_str()).collect();
        assert_eq!(clubs, vec!["Arsenal", "Chelsea", "Brighton"]);
        assert_eq!(results[0].metadata.metric(Metric::Debt), Some(1_000_000));

        assert_eq!(s.search("debt", 1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_metadata_is_index_error() {
        let mut bad = hit("Arsenal", 0.5);
        bad.source = json!({ "club": "Arsenal", "metadata": { "club": 42 } });
        let s = searcher(Arc::new(CannedBackend { hits: vec![bad] }));
        assert!(s.search("debt", 5).await.unwrap_err().is_index());
    }

    #[tokio::test]
    async fn test_club_falls_back_to_document_id() {
        let mut bare = hit("Liverpool", 0.5);
        bare.source.as_object_mut().unwrap().remove("club");
        let s = searcher(Arc::new(CannedBackend { hits: vec![bare] }));
        assert_eq!(s.search_default("wages").await.unwrap()[0].club, "Liverpool");
    }

    #[tokio::test]
    async fn test_missing_index_is_index_error() {
        let s = searcher(Arc::new(MemoryBackend::new()));
        let err = s.search("debt", 5).await.unwrap_err();
        assert!(matches!(err, FfpError::IndexNotFound { .. }));
    }

    #[tokio::test]
    async fn test_empty_index_returns_nothing() {
        let backend = Arc::new(MemoryBackend::new());
        let schema = IndexSchema::ffp(16, SpaceType::CosineSimil, AnnMethod::Flat);
        backend.create_index("ffp-vectors", &schema).await.unwrap();
        let s = searcher(backend);
        assert!(s.search("debt", 5).await.unwrap().is_empty());
    }
}
