//! The vector store facade: ingest records, query by text

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use tracing::{info, instrument, warn};

use crate::config::{Config, DEFAULT_INDEX_NAME};
use crate::context::StoreContext;
use crate::error::{FfpError, Result};
use crate::indexer::{DocumentIndexer, IngestReport};
use crate::manager::{EnsureOutcome, IndexManager};
use crate::metrics::{MetricsSnapshot, StoreMetrics};
use crate::record::FinancialRecord;
use crate::schema::IndexSchema;
use crate::searcher::{SearchResult, SimilaritySearcher};

/// Index name, schema and batch settings for a [`VectorStore`].
#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub index_name: String,
    pub schema: IndexSchema,
    pub concurrency: usize,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            index_name: DEFAULT_INDEX_NAME.to_string(),
            schema: IndexSchema::default(),
            concurrency: 1,
        }
    }
}

impl From<&Config> for StoreSettings {
    fn from(config: &Config) -> Self {
        Self {
            index_name: config.index.name.clone(),
            schema: config.schema(),
            concurrency: config.ingest.concurrency,
        }
    }
}

/// Entry point for ingest and retrieval over club financial records.
///
/// ```no_run
/// use ffp_vectors::{Config, FinancialRecord, VectorStore};
///
/// # async fn run() -> ffp_vectors::Result<()> {
/// let store = VectorStore::from_config(&Config::from_env()?)?;
/// let records = vec![FinancialRecord::new("Arsenal", 2023, true)];
/// let report = store.ingest(&records).await?;
/// println!("indexed {}", report.success_count());
///
/// for hit in store.query("clubs with high debt", 5).await? {
///     println!("{:.3} {}", hit.score, hit.club);
/// }
/// # Ok(())
/// # }
/// ```
pub struct VectorStore {
    context: StoreContext,
    manager: Arc<IndexManager>,
    indexer: DocumentIndexer,
    searcher: SimilaritySearcher,
    index_name: String,
    schema: IndexSchema,
    metrics: Mutex<StoreMetrics>,
}

impl VectorStore {
    pub fn new(context: StoreContext, settings: StoreSettings) -> Result<Self> {
        let vector_field = {
            let (name, field) = settings.schema.vector_field()?;
            if field.dimension != context.embedder.dimension() {
                return Err(FfpError::Config(format!(
                    "index dimension {} does not match embedding model {} ({} dimensions)",
                    field.dimension,
                    context.embedder.model_id(),
                    context.embedder.dimension()
                )));
            }
            name.to_string()
        };

        let manager = Arc::new(IndexManager::new(context.backend.clone()));
        let indexer = DocumentIndexer::new(
            context.embedder.clone(),
            context.backend.clone(),
            manager.clone(),
            settings.index_name.clone(),
            settings.schema.clone(),
        )
        .with_concurrency(settings.concurrency);
        let searcher = SimilaritySearcher::new(
            context.embedder.clone(),
            context.backend.clone(),
            settings.index_name.clone(),
            vector_field,
        );

        Ok(Self {
            context,
            manager,
            indexer,
            searcher,
            index_name: settings.index_name,
            schema: settings.schema,
            metrics: Mutex::new(StoreMetrics::new()),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        Self::new(StoreContext::from_config(config)?, StoreSettings::from(config))
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    pub fn context(&self) -> &StoreContext {
        &self.context
    }

    pub async fn ensure_index(&self) -> Result<EnsureOutcome> {
        self.manager.ensure_index(&self.index_name, &self.schema).await
    }

    /// Index `records` and make them searchable.
    ///
    /// Fails outright only when the index cannot be ensured or refreshed;
    /// per-record failures are listed in the report. A failed refresh
    /// returns [`FfpError::RefreshFailed`], which still carries the report.
    #[instrument(skip_all, fields(index = %self.index_name, records = records.len()))]
    pub async fn ingest(&self, records: &[FinancialRecord]) -> Result<IngestReport> {
        self.ensure_index().await?;
        let report = self.indexer.index_all(records).await;
        self.with_metrics(|m| m.record_ingest(report.success_count(), report.failure_count()));

        if report.success_count() > 0 {
            if let Err(source) = self.refresh().await {
                warn!(indexed = report.success_count(), error = %source, "refresh after ingest failed");
                return Err(FfpError::RefreshFailed {
                    report: Box::new(report),
                    source: Box::new(source),
                });
            }
        }

        info!(
            indexed = report.success_count(),
            failed = report.failure_count(),
            "ingest finished"
        );
        Ok(report)
    }

    /// Same as [`Self::ingest`].
    pub async fn index_all(&self, records: &[FinancialRecord]) -> Result<IngestReport> {
        self.ingest(records).await
    }

    /// Index one record. It becomes searchable after [`Self::refresh`].
    pub async fn index_record(&self, record: &FinancialRecord) -> Result<()> {
        let outcome = self.indexer.index_record(record).await;
        match &outcome {
            Ok(_) => self.with_metrics(|m| m.record_ingest(1, 0)),
            Err(_) => self.with_metrics(|m| m.record_ingest(0, 1)),
        }
        outcome.map(|_| ())
    }

    pub async fn refresh(&self) -> Result<()> {
        self.context.backend.refresh(&self.index_name).await?;
        self.with_metrics(StoreMetrics::record_refresh);
        Ok(())
    }

    /// The `k` records most similar to `text`, best first.
    pub async fn query(&self, text: &str, k: usize) -> Result<Vec<SearchResult>> {
        let started = Instant::now();
        let outcome = self.searcher.search(text, k).await;
        match &outcome {
            Ok(_) => self.with_metrics(|m| m.record_query(started.elapsed())),
            Err(_) => self.with_metrics(StoreMetrics::record_failed_query),
        }
        outcome
    }

    /// Same as [`Self::query`].
    pub async fn search_similar(&self, text: &str, k: usize) -> Result<Vec<SearchResult>> {
        self.query(text, k).await
    }

    /// Searchable document count.
    pub async fn count(&self) -> Result<usize> {
        self.context.backend.count(&self.index_name).await
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot()
    }

    fn with_metrics(&self, f: impl FnOnce(&mut StoreMetrics)) {
        let mut metrics = self.metrics.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut *metrics);
    }
}

impl std::fmt::Debug for VectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorStore")
            .field("index_name", &self.index_name)
            .field("context", &self.context)
            .finish()
    }
}
