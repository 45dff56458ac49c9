use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, StatusCode, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::backend::{IndexBackend, KnnQuery, SearchHit};
use crate::document::{DocumentId, IndexedDocument};
use crate::error::{FfpError, Result};
use crate::schema::IndexSchema;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Backend talking to an OpenSearch cluster over its REST API.
pub struct OpenSearchBackend {
    base_url: Url,
    credentials: Option<(String, String)>,
    http_client: reqwest::Client,
}

impl std::fmt::Debug for OpenSearchBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenSearchBackend")
            .field("base_url", &self.base_url.as_str())
            .field(
                "username",
                &self.credentials.as_ref().map(|(user, _)| user.as_str()),
            )
            .finish()
    }
}

impl OpenSearchBackend {
    pub fn new(endpoint: &str) -> Result<Self> {
        let base_url = Url::parse(endpoint)
            .map_err(|e| FfpError::Config(format!("invalid OpenSearch endpoint '{endpoint}': {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(FfpError::Config(format!(
                "OpenSearch endpoint '{endpoint}' cannot carry a path"
            )));
        }
        Ok(Self {
            base_url,
            credentials: None,
            http_client: build_client(DEFAULT_TIMEOUT)?,
        })
    }

    pub fn with_basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some((username.into(), password.into()));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.http_client = build_client(timeout)?;
        Ok(self)
    }

    /// `base_url` plus percent-encoded path segments.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send(&self, method: Method, url: Url, body: Option<&Value>) -> Result<reqwest::Response> {
        debug!(target: "ffp_vectors::opensearch", method = %method, url = %url);
        let mut request = self
            .http_client
            .request(method, url.clone())
            .header("Accept", "application/json");
        if let Some((user, password)) = &self.credentials {
            request = request.basic_auth(user, Some(password));
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        request
            .send()
            .await
            .map_err(|e| FfpError::Index(format!("request to {url} failed: {e}")))
    }

    /// Pass 2xx responses through, classify everything else.
    async fn expect_success(index: &str, response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(classify_error(index, status, &body))
    }
}

fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| FfpError::Config(format!("failed to build HTTP client: {e}")))
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    reason: Option<String>,
}

/// Map an OpenSearch error response onto the crate's error kinds.
fn classify_error(index: &str, status: StatusCode, body: &str) -> FfpError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => match envelope.error.kind.as_str() {
            "resource_already_exists_exception" => FfpError::IndexAlreadyExists {
                name: index.to_string(),
            },
            "index_not_found_exception" => FfpError::IndexNotFound {
                name: index.to_string(),
            },
            kind => FfpError::Index(format!(
                "HTTP {}: {}: {}",
                status.as_u16(),
                kind,
                envelope.error.reason.unwrap_or_default()
            )),
        },
        Err(_) if status == StatusCode::NOT_FOUND => FfpError::IndexNotFound {
            name: index.to_string(),
        },
        Err(_) => FfpError::Index(format!("HTTP {}: {}", status.as_u16(), body.trim())),
    }
}

fn knn_body(query: &KnnQuery) -> Value {
    let mut field = serde_json::Map::new();
    field.insert(
        query.field.clone(),
        json!({ "vector": query.vector.as_slice(), "k": query.k }),
    );
    json!({
        "size": query.k,
        "_source": { "excludes": [query.field.as_str()] },
        "query": { "knn": field }
    })
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: HitsEnvelope,
}

#[derive(Debug, Deserialize)]
struct HitsEnvelope {
    #[serde(default)]
    hits: Vec<RawHit>,
}

#[derive(Debug, Deserialize)]
struct RawHit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_score", default)]
    score: Option<f32>,
    #[serde(rename = "_source", default)]
    source: Value,
}

fn parse_hits(body: &str) -> Result<Vec<SearchHit>> {
    let response: SearchResponse = serde_json::from_str(body)
        .map_err(|e| FfpError::Index(format!("unreadable search response: {e}")))?;
    Ok(response
        .hits
        .hits
        .into_iter()
        .map(|raw| SearchHit {
            id: raw.id,
            score: raw.score.unwrap_or(0.0),
            source: raw.source,
        })
        .collect())
}

#[derive(Debug, Deserialize)]
struct CountResponse {
    count: usize,
}

#[async_trait]
impl IndexBackend for OpenSearchBackend {
    fn kind(&self) -> &'static str {
        "opensearch"
    }

    async fn index_exists(&self, index: &str) -> Result<bool> {
        let response = self.send(Method::HEAD, self.url(&[index]), None).await?;
        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(classify_error(index, status, "")),
        }
    }

    async fn create_index(&self, index: &str, schema: &IndexSchema) -> Result<()> {
        let mapping = schema.to_mapping();
        let response = self.send(Method::PUT, self.url(&[index]), Some(&mapping)).await?;
        Self::expect_success(index, response).await?;
        info!(target: "ffp_vectors::opensearch", index, "created index");
        Ok(())
    }

    async fn upsert_document(
        &self,
        index: &str,
        id: &DocumentId,
        document: &IndexedDocument,
    ) -> Result<()> {
        let body = serde_json::to_value(document)?;
        let url = self.url(&[index, "_doc", id.as_str()]);
        let response = self.send(Method::PUT, url, Some(&body)).await?;
        Self::expect_success(index, response).await?;
        Ok(())
    }

    async fn refresh(&self, index: &str) -> Result<()> {
        let response = self.send(Method::POST, self.url(&[index, "_refresh"]), None).await?;
        Self::expect_success(index, response).await?;
        Ok(())
    }

    async fn search(&self, index: &str, query: &KnnQuery) -> Result<Vec<SearchHit>> {
        let body = knn_body(query);
        let response = self.send(Method::POST, self.url(&[index, "_search"]), Some(&body)).await?;
        let response = Self::expect_success(index, response).await?;
        let text = response
            .text()
            .await
            .map_err(|e| FfpError::Index(format!("failed to read search response: {e}")))?;
        let mut hits = parse_hits(&text)?;
        hits.truncate(query.k);
        Ok(hits)
    }

    async fn count(&self, index: &str) -> Result<usize> {
        let response = self.send(Method::GET, self.url(&[index, "_count"]), None).await?;
        let response = Self::expect_success(index, response).await?;
        let parsed: CountResponse = response
            .json()
            .await
            .map_err(|e| FfpError::Index(format!("unreadable count response: {e}")))?;
        Ok(parsed.count)
    }

    async fn delete_index(&self, index: &str) -> Result<()> {
        let response = self.send(Method::DELETE, self.url(&[index]), None).await?;
        Self::expect_success(index, response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::EmbeddingVector;

    #[test]
    fn test_document_url_is_percent_encoded() {
        let backend = OpenSearchBackend::new("https://search.example.test/").unwrap();
        let id = DocumentId::new("Brighton & Hove/Albion", 2023);
        let url = backend.url(&["ffp-vectors", "_doc", id.as_str()]);
        assert_eq!(
            url.as_str(),
            "https://search.example.test/ffp-vectors/_doc/Brighton%20&%20Hove%2FAlbion::2023"
        );
    }

    #[test]
    fn test_classify_known_errors() {
        let exists = r#"{"error":{"type":"resource_already_exists_exception","reason":"index [ffp-vectors/abc] already exists"},"status":400}"#;
        assert!(matches!(
            classify_error("ffp-vectors", StatusCode::BAD_REQUEST, exists),
            FfpError::IndexAlreadyExists { .. }
        ));

        let missing = r#"{"error":{"type":"index_not_found_exception","reason":"no such index"},"status":404}"#;
        assert!(matches!(
            classify_error("ffp-vectors", StatusCode::NOT_FOUND, missing),
            FfpError::IndexNotFound { .. }
        ));

        let other = r#"{"error":{"type":"mapper_parsing_exception","reason":"bad dimension"},"status":400}"#;
        match classify_error("ffp-vectors", StatusCode::BAD_REQUEST, other) {
            FfpError::Index(msg) => assert!(msg.contains("mapper_parsing_exception")),
            e => panic!("unexpected {e:?}"),
        }

        assert!(matches!(
            classify_error("ffp-vectors", StatusCode::BAD_GATEWAY, "<html>"),
            FfpError::Index(_)
        ));
    }

    #[test]
    fn test_knn_body_shape() {
        let query = KnnQuery {
            field: "vector".to_string(),
            vector: EmbeddingVector::new(vec![0.5, -0.5]),
            k: 3,
        };
        let body = knn_body(&query);
        assert_eq!(body["size"], 3);
        assert_eq!(body["query"]["knn"]["vector"]["k"], 3);
        assert_eq!(body["query"]["knn"]["vector"]["vector"], json!([0.5, -0.5]));
        assert_eq!(body["_source"]["excludes"], json!(["vector"]));
    }

    #[test]
    fn test_parse_hits() {
        let body = r#"{
            "took": 3,
            "hits": {
                "total": {"value": 2, "relation": "eq"},
                "hits": [
                    {"_index": "ffp-vectors", "_id": "Arsenal::2023", "_score": 0.91,
                     "_source": {"club": "Arsenal", "metadata": {"club": "Arsenal", "year": 2023, "ffp_compliance": true}}},
                    {"_index": "ffp-vectors", "_id": "Chelsea::2023", "_score": 0.42,
                     "_source": {"club": "Chelsea"}}
                ]
            }
        }"#;
        let hits = parse_hits(body).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "Arsenal::2023");
        assert!((hits[0].score - 0.91).abs() < 1e-6);
        assert_eq!(hits[1].source["club"], "Chelsea");

        assert!(parse_hits("not json").unwrap_err().is_index());
    }
}
