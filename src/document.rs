//! Documents as stored in the vector index

use crate::error::Result;
use crate::record::FinancialRecord;
use crate::vector::EmbeddingVector;
use serde::{Deserialize, Serialize};
use std::fmt;

const SEPARATOR: &str = "::";

/// Deterministic document identifier derived from `(club, year)`.
///
/// Re-indexing the same club and year always targets the same id, so the
/// backend overwrites instead of duplicating. The year is the last
/// `::`-separated segment, which keeps the mapping injective even if a club
/// identifier itself contains `::`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(club: &str, year: i32) -> Self {
        Self(format!("{club}{SEPARATOR}{year}"))
    }

    pub fn for_record(record: &FinancialRecord) -> Self {
        Self::new(&record.club, record.year)
    }

    /// Split an id back into `(club, year)`.
    pub fn parse(raw: &str) -> Option<(&str, i32)> {
        let (club, year) = raw.rsplit_once(SEPARATOR)?;
        Some((club, year.parse().ok()?))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DocumentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The body persisted for one record.
///
/// `metadata` holds the original record as an opaque JSON payload; the index
/// never looks inside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedDocument {
    pub club: String,
    pub year: i32,
    pub text_content: String,
    pub vector: EmbeddingVector,
    pub metadata: serde_json::Value,
}

impl IndexedDocument {
    pub fn from_record(
        record: &FinancialRecord,
        text_content: String,
        vector: EmbeddingVector,
    ) -> Result<Self> {
        Ok(Self {
            club: record.club.clone(),
            year: record.year,
            text_content,
            vector,
            metadata: serde_json::to_value(record)?,
        })
    }

    pub fn id(&self) -> DocumentId {
        DocumentId::new(&self.club, self.year)
    }
}
