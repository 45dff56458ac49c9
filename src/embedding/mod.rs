//! Text embedding providers
//!
//! An [`EmbeddingProvider`] turns one non-empty text into one vector of a
//! fixed dimension. Each call is a single attempt: retry and backoff belong
//! to whoever wraps the provider.
//!
//! Two implementations ship with the crate:
//! - [`HttpEmbeddingProvider`]: a Titan-style `invoke` endpoint over HTTP.
//! - [`HashingEmbeddingProvider`]: local feature hashing, no network.
//!
//! Providers are not required to be deterministic. Callers should only rely
//! on embeddings of similar texts being close, never on bit-identical output.

mod hashing;
mod http;

pub use hashing::HashingEmbeddingProvider;
pub use http::{HttpEmbeddingProvider, DEFAULT_MODEL_ID};

use async_trait::async_trait;

use crate::error::{FfpError, Result};
use crate::vector::EmbeddingVector;

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Model identifier sent with each request.
    fn model_id(&self) -> &str;

    /// Length of every vector this provider returns.
    fn dimension(&self) -> usize;

    /// One round trip to the model. `text` has already been validated.
    async fn invoke(&self, text: &str) -> Result<EmbeddingVector>;

    /// Embed `text`, rejecting blank input before anything is sent and
    /// rejecting responses of the wrong length.
    async fn embed(&self, text: &str) -> Result<EmbeddingVector> {
        validate_text(text)?;
        let vector = self.invoke(text).await?;
        if vector.dimension() != self.dimension() {
            return Err(FfpError::provider(
                None,
                format!(
                    "model {} returned {} dimensions, expected {}",
                    self.model_id(),
                    vector.dimension(),
                    self.dimension()
                ),
            ));
        }
        Ok(vector)
    }
}

/// Input check shared by every provider.
pub fn validate_text(text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(FfpError::validation("text to embed is empty"));
    }
    Ok(())
}
