//! # ffp_vectors
//!
//! Embedding and similarity search over football club financial records
//! (revenue, wages, transfer spending, debt, FFP compliance).
//!
//! This library provides:
//! - A canonical text rendering of each [`FinancialRecord`]
//! - Pluggable [`EmbeddingProvider`]s (HTTP model endpoint, local hashing)
//! - Pluggable [`IndexBackend`]s (OpenSearch k-NN, in-memory HNSW/flat)
//! - Idempotent index creation, batch indexing and top-k retrieval
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use ffp_vectors::{
//!     AnnMethod, FinancialRecord, HashingEmbeddingProvider, IndexSchema, MemoryBackend,
//!     Metric, SpaceType, StoreContext, StoreSettings, VectorStore,
//! };
//!
//! # #[tokio::main]
//! # async fn main() {
//! let context = StoreContext::new(
//!     Arc::new(HashingEmbeddingProvider::new(256).unwrap()),
//!     Arc::new(MemoryBackend::new()),
//! );
//! let settings = StoreSettings {
//!     schema: IndexSchema::ffp(256, SpaceType::CosineSimil, AnnMethod::default()),
//!     ..StoreSettings::default()
//! };
//! let store = VectorStore::new(context, settings).unwrap();
//!
//! let arsenal = FinancialRecord::new("Arsenal", 2023, true).with_metric(Metric::Debt, 180_000_000);
//! store.ingest(&[arsenal]).await.unwrap();
//!
//! let results = store.query("Arsenal debt", 5).await.unwrap();
//! assert_eq!(results[0].club, "Arsenal");
//! # }
//! ```

pub mod backend;
pub mod config;
pub mod context;
pub mod distance;
pub mod document;
pub mod embedding;
pub mod error;
pub mod flat_index;
pub mod hnsw;
pub mod index;
pub mod indexer;
pub mod manager;
pub mod metrics;
pub mod record;
pub mod schema;
pub mod searcher;
pub mod storage;
pub mod store;
pub mod vector;

pub use backend::{IndexBackend, KnnQuery, MemoryBackend, OpenSearchBackend, SearchHit};
pub use config::Config;
pub use context::StoreContext;
pub use distance::SpaceType;
pub use document::{DocumentId, IndexedDocument};
pub use embedding::{EmbeddingProvider, HashingEmbeddingProvider, HttpEmbeddingProvider};
pub use error::{FfpError, Result};
pub use flat_index::FlatIndex;
pub use hnsw::{HnswIndex, HnswParams};
pub use index::AnnIndex;
pub use indexer::{DocumentIndexer, IngestReport, RecordFailure};
pub use manager::{EnsureOutcome, IndexLifecycleState, IndexManager};
pub use metrics::{MetricsSnapshot, StoreMetrics};
pub use record::{FinancialRecord, Metric, Metrics};
pub use schema::{AnnMethod, IndexSchema};
pub use searcher::{SearchResult, SimilaritySearcher, DEFAULT_K};
pub use storage::DocumentStore;
pub use store::{StoreSettings, VectorStore};
pub use vector::EmbeddingVector;
