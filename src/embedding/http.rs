use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::embedding::EmbeddingProvider;
use crate::error::{FfpError, Result};
use crate::schema::DEFAULT_DIMENSION;
use crate::vector::EmbeddingVector;

/// Titan text embeddings v1.
pub const DEFAULT_MODEL_ID: &str = "amazon.titan-embed-text-v1";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InvokeRequest<'a> {
    input_text: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InvokeResponse {
    embedding: Vec<f64>,
    #[serde(default)]
    input_text_token_count: Option<u64>,
}

/// Client for a model-hosting endpoint that answers
/// `POST {endpoint}/model/{model_id}/invoke` with `{"embedding": [...]}`.
pub struct HttpEmbeddingProvider {
    endpoint: Url,
    model_id: String,
    dimension: usize,
    api_key: Option<String>,
    http_client: reqwest::Client,
}

impl std::fmt::Debug for HttpEmbeddingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpEmbeddingProvider")
            .field("endpoint", &self.endpoint.as_str())
            .field("model_id", &self.model_id)
            .field("dimension", &self.dimension)
            .field("api_key", &self.api_key.as_ref().map(|_| "<REDACTED>"))
            .finish()
    }
}

impl HttpEmbeddingProvider {
    pub fn new(endpoint: &str) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| FfpError::Config(format!("invalid embedding endpoint '{endpoint}': {e}")))?;
        if endpoint.cannot_be_a_base() {
            return Err(FfpError::Config(format!(
                "embedding endpoint '{endpoint}' cannot carry a path"
            )));
        }
        Ok(Self {
            endpoint,
            model_id: DEFAULT_MODEL_ID.to_string(),
            dimension: DEFAULT_DIMENSION,
            api_key: None,
            http_client: build_client(DEFAULT_TIMEOUT)?,
        })
    }

    pub fn with_model(mut self, model_id: impl Into<String>, dimension: usize) -> Self {
        self.model_id = model_id.into();
        self.dimension = dimension;
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.http_client = build_client(timeout)?;
        Ok(self)
    }

    fn invoke_url(&self) -> Url {
        let mut url = self.endpoint.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["model", self.model_id.as_str(), "invoke"]);
        }
        url
    }
}

fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| FfpError::Config(format!("failed to build HTTP client: {e}")))
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn invoke(&self, text: &str) -> Result<EmbeddingVector> {
        let url = self.invoke_url();
        debug!(target: "ffp_vectors::embedding", url = %url, chars = text.len(), "invoking embedding model");

        let mut request = self
            .http_client
            .post(url)
            .header("Accept", "application/json")
            .json(&InvokeRequest { input_text: text });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            FfpError::provider(e.status().map(|s| s.as_u16()), format!("request failed: {e}"))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FfpError::provider(Some(status.as_u16()), body));
        }

        let payload: InvokeResponse = response
            .json()
            .await
            .map_err(|e| FfpError::provider(Some(status.as_u16()), format!("malformed response: {e}")))?;
        debug!(
            target: "ffp_vectors::embedding",
            dimension = payload.embedding.len(),
            tokens = payload.input_text_token_count,
            "embedding received"
        );

        EmbeddingVector::from_f64(&payload.embedding)
            .map_err(|e| FfpError::provider(None, format!("unusable embedding: {e}")))
    }
}
