//! Shared handles to the external services

use std::sync::Arc;

use crate::backend::IndexBackend;
use crate::config::Config;
use crate::embedding::EmbeddingProvider;
use crate::error::Result;

/// The embedding provider and index backend, built once and shared by every
/// component that needs them.
#[derive(Clone)]
pub struct StoreContext {
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub backend: Arc<dyn IndexBackend>,
}

impl StoreContext {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, backend: Arc<dyn IndexBackend>) -> Self {
        Self { embedder, backend }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            embedder: config.build_embedder()?,
            backend: config.build_backend()?,
        })
    }
}

impl std::fmt::Debug for StoreContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreContext")
            .field("model_id", &self.embedder.model_id())
            .field("dimension", &self.embedder.dimension())
            .field("backend", &self.backend.kind())
            .finish()
    }
}
