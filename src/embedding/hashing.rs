use async_trait::async_trait;

use crate::embedding::EmbeddingProvider;
use crate::error::{FfpError, Result};
use crate::vector::EmbeddingVector;

/// Local embedder using signed feature hashing over word tokens.
///
/// Each lowercased alphanumeric token is hashed with CRC32 into one of
/// `dimension` buckets; the top hash bit picks the sign. The result is
/// L2-normalised, so cosine similarity tracks shared vocabulary. Useful
/// offline and in tests; it has no notion of meaning beyond word overlap.
#[derive(Debug, Clone)]
pub struct HashingEmbeddingProvider {
    dimension: usize,
}

impl HashingEmbeddingProvider {
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(FfpError::Config(
                "hashing embedder dimension must be positive".to_string(),
            ));
        }
        Ok(Self { dimension })
    }

    fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbeddingProvider {
    fn model_id(&self) -> &str {
        "local-feature-hashing"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn invoke(&self, text: &str) -> Result<EmbeddingVector> {
        let mut data = vec![0.0f32; self.dimension];
        for token in Self::tokens(text) {
            let hash = crc32fast::hash(token.as_bytes());
            let bucket = (hash & 0x7fff_ffff) as usize % self.dimension;
            let sign = if hash >> 31 == 1 { -1.0 } else { 1.0 };
            data[bucket] += sign;
        }

        let mut vector = EmbeddingVector::new(data);
        vector.normalize().map_err(|_| {
            FfpError::provider(None, "text has no embeddable tokens".to_string())
        })?;
        Ok(vector)
    }
}
