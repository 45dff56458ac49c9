//! Index schema: field layout of the FFP vector index

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::distance::SpaceType;
use crate::error::{FfpError, Result};
use crate::hnsw::HnswParams;

/// Default embedding dimension (Titan text embeddings v1).
pub const DEFAULT_DIMENSION: usize = 1536;

/// Characters OpenSearch rejects in index names.
const FORBIDDEN_NAME_CHARS: &[char] = &['\\', '/', '*', '?', '"', '<', '>', '|', ',', '#', ':', ' '];

/// ANN structure backing the vector field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum AnnMethod {
    Hnsw {
        m: usize,
        ef_construction: usize,
        ef_search: usize,
    },
    /// Exact brute-force scoring.
    Flat,
}

impl Default for AnnMethod {
    fn default() -> Self {
        AnnMethod::Hnsw {
            m: 16,
            ef_construction: 200,
            ef_search: 50,
        }
    }
}

impl AnnMethod {
    pub fn hnsw_params(&self) -> Result<Option<HnswParams>> {
        match *self {
            AnnMethod::Hnsw {
                m,
                ef_construction,
                ef_search,
            } => HnswParams::new(m, ef_construction, ef_search).map(Some),
            AnnMethod::Flat => Ok(None),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorField {
    pub dimension: usize,
    pub space: SpaceType,
    pub method: AnnMethod,
}

/// How a single field is indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    /// Exact-match key.
    Keyword,
    Integer,
    /// Full-text searchable.
    Text,
    Vector(VectorField),
    /// Opaque structured payload, not indexed.
    Object,
}

/// Field name → kind. Ordered so two schemas compare and render identically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSchema {
    fields: BTreeMap<String, FieldKind>,
}

impl IndexSchema {
    pub fn new() -> Self {
        Self {
            fields: BTreeMap::new(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.insert(name.into(), kind);
        self
    }

    /// The FFP record schema: identity, year, text, vector and metadata.
    pub fn ffp(dimension: usize, space: SpaceType, method: AnnMethod) -> Self {
        Self::new()
            .field("club", FieldKind::Keyword)
            .field("year", FieldKind::Integer)
            .field("text_content", FieldKind::Text)
            .field(
                "vector",
                FieldKind::Vector(VectorField {
                    dimension,
                    space,
                    method,
                }),
            )
            .field("metadata", FieldKind::Object)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldKind)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// The single vector field of this schema.
    pub fn vector_field(&self) -> Result<(&str, &VectorField)> {
        let mut vectors = self.fields.iter().filter_map(|(name, kind)| match kind {
            FieldKind::Vector(v) => Some((name.as_str(), v)),
            _ => None,
        });
        let first = vectors
            .next()
            .ok_or_else(|| FfpError::Index("schema has no vector field".to_string()))?;
        if vectors.next().is_some() {
            return Err(FfpError::Index(
                "schema has more than one vector field".to_string(),
            ));
        }
        Ok(first)
    }

    pub fn validate(&self) -> Result<()> {
        let (name, field) = self.vector_field()?;
        if field.dimension == 0 {
            return Err(FfpError::Index(format!(
                "vector field '{}' must have a positive dimension",
                name
            )));
        }
        if let AnnMethod::Hnsw {
            m,
            ef_construction,
            ef_search,
        } = field.method
        {
            if m < 2 {
                return Err(FfpError::Index(format!(
                    "vector field '{}': hnsw m must be at least 2",
                    name
                )));
            }
            if ef_construction == 0 || ef_search == 0 {
                return Err(FfpError::Index(format!(
                    "vector field '{}': hnsw ef values must be positive",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Render as an OpenSearch `PUT /{index}` body.
    pub fn to_mapping(&self) -> Value {
        let properties: serde_json::Map<String, Value> = self
            .fields
            .iter()
            .map(|(name, kind)| (name.clone(), field_mapping(kind)))
            .collect();

        json!({
            "settings": { "index": { "knn": true } },
            "mappings": { "properties": properties }
        })
    }
}

impl Default for IndexSchema {
    fn default() -> Self {
        Self::ffp(DEFAULT_DIMENSION, SpaceType::CosineSimil, AnnMethod::default())
    }
}

fn field_mapping(kind: &FieldKind) -> Value {
    match kind {
        FieldKind::Keyword => json!({ "type": "keyword" }),
        FieldKind::Integer => json!({ "type": "integer" }),
        FieldKind::Text => json!({ "type": "text" }),
        FieldKind::Object => json!({ "type": "object", "enabled": false }),
        FieldKind::Vector(v) => match v.method {
            AnnMethod::Hnsw {
                m,
                ef_construction,
                ..
            } => json!({
                "type": "knn_vector",
                "dimension": v.dimension,
                "method": {
                    "name": "hnsw",
                    "space_type": v.space.as_str(),
                    "engine": "lucene",
                    "parameters": { "m": m, "ef_construction": ef_construction }
                }
            }),
            AnnMethod::Flat => json!({
                "type": "knn_vector",
                "dimension": v.dimension,
                "space_type": v.space.as_str()
            }),
        },
    }
}

/// Reject names the index backend would refuse.
pub fn validate_index_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(FfpError::Index("index name is empty".to_string()));
    }
    if name.starts_with(['_', '-', '+']) {
        return Err(FfpError::Index(format!(
            "index name '{}' must not start with '_', '-' or '+'",
            name
        )));
    }
    if name.chars().any(|c| c.is_uppercase() || c.is_whitespace())
        || name.contains(FORBIDDEN_NAME_CHARS)
    {
        return Err(FfpError::Index(format!(
            "index name '{}' contains forbidden characters",
            name
        )));
    }
    Ok(())
}
