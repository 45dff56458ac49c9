//! Configuration: TOML file, environment overrides, validation.
//!
//! ```toml
//! [index]
//! name = "ffp-vectors"
//! dimension = 1536
//! space = "cosinesimil"
//! method = "hnsw"
//!
//! [embedding]
//! provider = "http"
//! endpoint = "https://bedrock-runtime.us-east-1.amazonaws.com"
//! model_id = "amazon.titan-embed-text-v1"
//!
//! [backend]
//! kind = "opensearch"
//! endpoint = "https://search-ffp.example.com"
//!
//! [ingest]
//! concurrency = 4
//! ```

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::backend::{IndexBackend, MemoryBackend, OpenSearchBackend};
use crate::distance::SpaceType;
use crate::embedding::{EmbeddingProvider, HashingEmbeddingProvider, HttpEmbeddingProvider, DEFAULT_MODEL_ID};
use crate::error::{FfpError, Result};
use crate::schema::{validate_index_name, AnnMethod, IndexSchema, DEFAULT_DIMENSION};

pub const DEFAULT_INDEX_NAME: &str = "ffp-vectors";

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub index: IndexConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub ingest: IngestConfig,
}

/// Name and shape of the vector index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    #[serde(default = "default_index_name")]
    pub name: String,

    /// Must equal the embedding model's output length
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    #[serde(default)]
    pub space: SpaceType,

    #[serde(default)]
    pub method: MethodKind,

    /// HNSW neighbours per node
    #[serde(default = "default_m")]
    pub m: usize,

    #[serde(default = "default_ef_construction")]
    pub ef_construction: usize,

    #[serde(default = "default_ef_search")]
    pub ef_search: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MethodKind {
    #[default]
    Hnsw,
    Flat,
}

fn default_index_name() -> String {
    DEFAULT_INDEX_NAME.to_string()
}

fn default_dimension() -> usize {
    DEFAULT_DIMENSION
}

fn default_m() -> usize {
    16
}

fn default_ef_construction() -> usize {
    200
}

fn default_ef_search() -> usize {
    50
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            name: default_index_name(),
            dimension: default_dimension(),
            space: SpaceType::default(),
            method: MethodKind::default(),
            m: default_m(),
            ef_construction: default_ef_construction(),
            ef_search: default_ef_search(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Http,
    /// Local feature hashing, no network
    Hashing,
}

/// Embedding provider configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub provider: ProviderKind,

    #[serde(default = "default_embedding_endpoint")]
    pub endpoint: Option<String>,

    #[serde(default = "default_model_id")]
    pub model_id: String,

    /// Sent as a bearer token
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl std::fmt::Debug for EmbeddingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingConfig")
            .field("provider", &self.provider)
            .field("endpoint", &self.endpoint)
            .field("model_id", &self.model_id)
            .field("api_key", &self.api_key.as_ref().map(|_| "<REDACTED>"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

fn default_embedding_endpoint() -> Option<String> {
    Some("https://bedrock-runtime.us-east-1.amazonaws.com".to_string())
}

fn default_model_id() -> String {
    DEFAULT_MODEL_ID.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            endpoint: default_embedding_endpoint(),
            model_id: default_model_id(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Memory,
    OpenSearch,
}

/// Index backend configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default)]
    pub kind: BackendKind,

    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("kind", &self.kind)
            .field("endpoint", &self.endpoint)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<REDACTED>"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::default(),
            endpoint: None,
            username: None,
            password: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Batch ingest configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Records embedded in flight at once
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_concurrency() -> usize {
    1
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
        }
    }
}

impl Config {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| FfpError::Config(e.to_string()))
    }

    /// Read a TOML file, apply environment overrides and validate.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let mut config = Self::from_toml_str(&raw)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus environment overrides.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value.
    ///
    /// Recognised: `FFP_INDEX_NAME`, `EMBEDDING_ENDPOINT`, `EMBEDDING_MODEL_ID`,
    /// `EMBEDDING_API_KEY`, `OPENSEARCH_ENDPOINT`, `OPENSEARCH_USERNAME`,
    /// `OPENSEARCH_PASSWORD`. Setting `OPENSEARCH_ENDPOINT` selects the
    /// OpenSearch backend.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(name) = lookup("FFP_INDEX_NAME") {
            self.index.name = name;
        }
        if let Some(endpoint) = lookup("EMBEDDING_ENDPOINT") {
            self.embedding.endpoint = Some(endpoint);
        }
        if let Some(model_id) = lookup("EMBEDDING_MODEL_ID") {
            self.embedding.model_id = model_id;
        }
        if let Some(key) = lookup("EMBEDDING_API_KEY") {
            self.embedding.api_key = Some(key);
        }
        if let Some(endpoint) = lookup("OPENSEARCH_ENDPOINT") {
            self.backend.kind = BackendKind::OpenSearch;
            self.backend.endpoint = Some(endpoint);
        }
        if let Some(username) = lookup("OPENSEARCH_USERNAME") {
            self.backend.username = Some(username);
        }
        if let Some(password) = lookup("OPENSEARCH_PASSWORD") {
            self.backend.password = Some(password);
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_index_name(&self.index.name).map_err(|e| FfpError::Config(e.to_string()))?;
        if self.index.dimension == 0 {
            return Err(FfpError::Config("index.dimension must be positive".to_string()));
        }
        if self.index.method == MethodKind::Hnsw && self.index.m < 2 {
            return Err(FfpError::Config("index.m must be at least 2".to_string()));
        }
        if self.index.method == MethodKind::Hnsw
            && (self.index.ef_construction == 0 || self.index.ef_search == 0)
        {
            return Err(FfpError::Config(
                "index.ef_construction and index.ef_search must be positive".to_string(),
            ));
        }
        if self.ingest.concurrency == 0 {
            return Err(FfpError::Config("ingest.concurrency must be positive".to_string()));
        }
        if self.embedding.provider == ProviderKind::Http && self.embedding.endpoint.is_none() {
            return Err(FfpError::Config(
                "embedding.endpoint is required for the http provider".to_string(),
            ));
        }
        if self.backend.kind == BackendKind::OpenSearch && self.backend.endpoint.is_none() {
            return Err(FfpError::Config(
                "backend.endpoint is required for the opensearch backend".to_string(),
            ));
        }
        Ok(())
    }

    pub fn ann_method(&self) -> AnnMethod {
        match self.index.method {
            MethodKind::Hnsw => AnnMethod::Hnsw {
                m: self.index.m,
                ef_construction: self.index.ef_construction,
                ef_search: self.index.ef_search,
            },
            MethodKind::Flat => AnnMethod::Flat,
        }
    }

    pub fn schema(&self) -> IndexSchema {
        IndexSchema::ffp(self.index.dimension, self.index.space, self.ann_method())
    }

    pub fn build_embedder(&self) -> Result<Arc<dyn EmbeddingProvider>> {
        match self.embedding.provider {
            ProviderKind::Http => {
                let endpoint = self.embedding.endpoint.as_deref().ok_or_else(|| {
                    FfpError::Config("embedding.endpoint is not set".to_string())
                })?;
                let mut provider = HttpEmbeddingProvider::new(endpoint)?
                    .with_model(self.embedding.model_id.clone(), self.index.dimension)
                    .with_timeout(Duration::from_secs(self.embedding.timeout_secs))?;
                if let Some(key) = &self.embedding.api_key {
                    provider = provider.with_api_key(key.clone());
                }
                Ok(Arc::new(provider))
            }
            ProviderKind::Hashing => Ok(Arc::new(HashingEmbeddingProvider::new(self.index.dimension)?)),
        }
    }

    pub fn build_backend(&self) -> Result<Arc<dyn IndexBackend>> {
        match self.backend.kind {
            BackendKind::Memory => Ok(Arc::new(MemoryBackend::new())),
            BackendKind::OpenSearch => {
                let endpoint = self.backend.endpoint.as_deref().ok_or_else(|| {
                    FfpError::Config("backend.endpoint is not set".to_string())
                })?;
                let mut backend = OpenSearchBackend::new(endpoint)?
                    .with_timeout(Duration::from_secs(self.backend.timeout_secs))?;
                if let Some(username) = &self.backend.username {
                    let password = self.backend.password.clone().unwrap_or_default();
                    backend = backend.with_basic_auth(username.clone(), password);
                }
                Ok(Arc::new(backend))
            }
        }
    }
}
