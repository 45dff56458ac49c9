//! Idempotent index creation

use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, info};

use crate::backend::IndexBackend;
use crate::error::{FfpError, Result};
use crate::schema::{validate_index_name, IndexSchema};

/// What [`IndexManager::ensure_index`] found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    /// This call created the index.
    Created,
    /// The index was already there, or a concurrent writer created it first.
    AlreadyExists,
}

/// Lifecycle of a named index as seen by one manager. The only transition
/// is `NotCreated -> Created`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexLifecycleState {
    /// Not yet ensured by this manager. It may still exist on the backend.
    NotCreated,
    Created,
}

/// Makes sure the vector index exists before anything writes to it.
///
/// Safe to call repeatedly and from concurrent tasks. Once a name has been
/// ensured, later calls answer from memory without touching the backend.
pub struct IndexManager {
    backend: Arc<dyn IndexBackend>,
    ready: RwLock<HashSet<String>>,
}

impl IndexManager {
    pub fn new(backend: Arc<dyn IndexBackend>) -> Self {
        Self {
            backend,
            ready: RwLock::new(HashSet::new()),
        }
    }

    pub fn state(&self, index: &str) -> IndexLifecycleState {
        let ready = self.ready.read().unwrap_or_else(PoisonError::into_inner);
        if ready.contains(index) {
            IndexLifecycleState::Created
        } else {
            IndexLifecycleState::NotCreated
        }
    }

    /// Create `index` with `schema` unless it already exists.
    pub async fn ensure_index(&self, index: &str, schema: &IndexSchema) -> Result<EnsureOutcome> {
        validate_index_name(index)?;
        schema.validate()?;

        if self.state(index) == IndexLifecycleState::Created {
            return Ok(EnsureOutcome::AlreadyExists);
        }

        let outcome = if self.backend.index_exists(index).await? {
            debug!(index, backend = self.backend.kind(), "index already exists");
            EnsureOutcome::AlreadyExists
        } else {
            match self.backend.create_index(index, schema).await {
                Ok(()) => {
                    info!(index, backend = self.backend.kind(), "created index");
                    EnsureOutcome::Created
                }
                Err(FfpError::IndexAlreadyExists { .. }) => {
                    debug!(index, "index created concurrently");
                    EnsureOutcome::AlreadyExists
                }
                Err(e) => return Err(e),
            }
        };

        self.ready
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(index.to_string());
        Ok(outcome)
    }

    /// Forget that `index` was ensured. Only for callers that deleted it.
    pub fn forget(&self, index: &str) {
        self.ready
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(index);
    }
}
