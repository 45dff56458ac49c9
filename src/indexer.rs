//! Turning financial records into indexed documents

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::backend::IndexBackend;
use crate::document::{DocumentId, IndexedDocument};
use crate::embedding::EmbeddingProvider;
use crate::error::{FfpError, Result};
use crate::manager::IndexManager;
use crate::record::FinancialRecord;
use crate::schema::IndexSchema;

/// A record that could not be indexed, and why.
#[derive(Debug)]
pub struct RecordFailure {
    /// Position of the record in the input batch.
    pub position: usize,
    pub club: String,
    pub year: i32,
    pub error: FfpError,
}

/// Outcome of a batch: which records landed and which did not.
#[derive(Debug, Default)]
pub struct IngestReport {
    pub indexed: Vec<DocumentId>,
    pub failures: Vec<RecordFailure>,
}

impl IngestReport {
    pub fn success_count(&self) -> usize {
        self.indexed.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Embeds records and writes them to the index, one document per
/// `(club, year)`.
pub struct DocumentIndexer {
    embedder: Arc<dyn EmbeddingProvider>,
    backend: Arc<dyn IndexBackend>,
    manager: Arc<IndexManager>,
    index_name: String,
    schema: IndexSchema,
    concurrency: usize,
}

impl DocumentIndexer {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        backend: Arc<dyn IndexBackend>,
        manager: Arc<IndexManager>,
        index_name: impl Into<String>,
        schema: IndexSchema,
    ) -> Self {
        Self {
            embedder,
            backend,
            manager,
            index_name: index_name.into(),
            schema,
            concurrency: 1,
        }
    }

    /// Records embedded in flight at once during [`Self::index_all`].
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    /// Embed and write one record. Re-indexing the same club and year
    /// overwrites the previous document.
    pub async fn index_record(&self, record: &FinancialRecord) -> Result<DocumentId> {
        record.validate()?;
        self.manager.ensure_index(&self.index_name, &self.schema).await?;

        let text = record.text_representation();
        let vector = self.embedder.embed(&text).await?;
        let document = IndexedDocument::from_record(record, text, vector)?;
        let id = DocumentId::for_record(record);

        self.backend
            .upsert_document(&self.index_name, &id, &document)
            .await?;
        debug!(index = %self.index_name, id = %id, "indexed record");
        Ok(id)
    }

    /// Index every record, continuing past failures.
    ///
    /// Each record succeeds or fails on its own; the report lists failures
    /// in input order.
    pub async fn index_all(&self, records: &[FinancialRecord]) -> IngestReport {
        let mut outcomes: Vec<(usize, &FinancialRecord, Result<DocumentId>)> =
            stream::iter(
                records
                    .iter()
                    .enumerate()
                    .map(|(position, record)| async move {
                        (position, record, self.index_record(record).await)
                    })
                    .collect::<Vec<_>>(),
            )
                .buffer_unordered(self.concurrency)
                .collect()
                .await;
        outcomes.sort_by_key(|(position, _, _)| *position);

        let mut report = IngestReport::default();
        for (position, record, outcome) in outcomes {
            match outcome {
                Ok(id) => report.indexed.push(id),
                Err(error) => {
                    warn!(club = %record.club, year = record.year, error = %error, "failed to index record");
                    report.failures.push(RecordFailure {
                        position,
                        club: record.club.clone(),
                        year: record.year,
                        error,
                    });
                }
            }
        }

        info!(
            index = %self.index_name,
            indexed = report.success_count(),
            failed = report.failure_count(),
            "batch indexed"
        );
        report
    }
}
