//! HTTP clients against fake embedding and OpenSearch servers

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};

use ffp_vectors::config::BackendKind;
use ffp_vectors::{
    AnnMethod, Config, EmbeddingProvider, EnsureOutcome, FfpError, FinancialRecord,
    HashingEmbeddingProvider, HttpEmbeddingProvider, IndexBackend, IndexSchema, KnnQuery,
    Metric, OpenSearchBackend, SpaceType, VectorStore,
};

const DIM: usize = 8;
const API_KEY: &str = "test-key";

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

// Embedding server

#[derive(Clone)]
struct EmbedState {
    calls: Arc<AtomicUsize>,
    dimension: usize,
}

async fn invoke(
    State(state): State<EmbedState>,
    Path(_model): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.calls.fetch_add(1, Ordering::SeqCst);
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {API_KEY}"));
    if !authorized {
        return (StatusCode::FORBIDDEN, Json(json!({ "message": "missing token" })));
    }

    let text = body["inputText"].as_str().unwrap_or_default();
    if text.contains("FAIL") {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "message": "model exploded" })),
        );
    }

    let vector = HashingEmbeddingProvider::new(state.dimension).unwrap()
        .embed(text)
        .await
        .unwrap();
    (
        StatusCode::OK,
        Json(json!({ "embedding": vector.as_slice(), "inputTextTokenCount": text.split_whitespace().count() })),
    )
}

async fn embedding_server(dimension: usize) -> (String, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .route("/model/:model/invoke", post(invoke))
        .with_state(EmbedState {
            calls: calls.clone(),
            dimension,
        });
    (serve(app).await, calls)
}

// OpenSearch server

#[derive(Default)]
struct FakeIndex {
    mapping: Value,
    docs: BTreeMap<String, Value>,
}

#[derive(Clone, Default)]
struct SearchState {
    indices: Arc<Mutex<HashMap<String, FakeIndex>>>,
    creates: Arc<AtomicUsize>,
}

fn missing(index: &str) -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": { "type": "index_not_found_exception", "reason": format!("no such index [{index}]") },
            "status": 404
        })),
    )
}

async fn head_index(State(state): State<SearchState>, Path(index): Path<String>) -> StatusCode {
    if state.indices.lock().unwrap().contains_key(&index) {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn create_index(
    State(state): State<SearchState>,
    Path(index): Path<String>,
    Json(mapping): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let mut indices = state.indices.lock().unwrap();
    if indices.contains_key(&index) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": { "type": "resource_already_exists_exception", "reason": format!("index [{index}] already exists") },
                "status": 400
            })),
        );
    }
    state.creates.fetch_add(1, Ordering::SeqCst);
    indices.insert(
        index.clone(),
        FakeIndex {
            mapping,
            ..FakeIndex::default()
        },
    );
    (StatusCode::OK, Json(json!({ "acknowledged": true, "index": index })))
}

async fn delete_index(State(state): State<SearchState>, Path(index): Path<String>) -> (StatusCode, Json<Value>) {
    match state.indices.lock().unwrap().remove(&index) {
        Some(_) => (StatusCode::OK, Json(json!({ "acknowledged": true }))),
        None => missing(&index),
    }
}

async fn put_doc(
    State(state): State<SearchState>,
    Path((index, id)): Path<(String, String)>,
    Json(doc): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let mut indices = state.indices.lock().unwrap();
    let Some(target) = indices.get_mut(&index) else {
        return missing(&index);
    };
    let result = if target.docs.insert(id.clone(), doc).is_some() {
        "updated"
    } else {
        "created"
    };
    (StatusCode::CREATED, Json(json!({ "_id": id, "result": result })))
}

async fn refresh(State(state): State<SearchState>, Path(index): Path<String>) -> (StatusCode, Json<Value>) {
    if state.indices.lock().unwrap().contains_key(&index) {
        (StatusCode::OK, Json(json!({ "_shards": { "failed": 0 } })))
    } else {
        missing(&index)
    }
}

async fn count(State(state): State<SearchState>, Path(index): Path<String>) -> (StatusCode, Json<Value>) {
    match state.indices.lock().unwrap().get(&index) {
        Some(target) => (StatusCode::OK, Json(json!({ "count": target.docs.len() }))),
        None => missing(&index),
    }
}

fn as_floats(value: &Value) -> Vec<f64> {
    value
        .as_array()
        .map(|a| a.iter().filter_map(Value::as_f64).collect())
        .unwrap_or_default()
}

async fn search(
    State(state): State<SearchState>,
    Path(index): Path<String>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let indices = state.indices.lock().unwrap();
    let Some(target) = indices.get(&index) else {
        return missing(&index);
    };
    let size = body["size"].as_u64().unwrap_or(10) as usize;
    let query = as_floats(&body["query"]["knn"]["vector"]["vector"]);

    let mut scored: Vec<(f64, &String, &Value)> = target
        .docs
        .iter()
        .map(|(id, doc)| {
            let dot: f64 = as_floats(&doc["vector"])
                .iter()
                .zip(&query)
                .map(|(a, b)| a * b)
                .sum();
            ((1.0 + dot) / 2.0, id, doc)
        })
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));

    let hits: Vec<Value> = scored
        .into_iter()
        .take(size)
        .map(|(score, id, doc)| {
            let mut source = doc.clone();
            if let Some(obj) = source.as_object_mut() {
                obj.remove("vector");
            }
            json!({ "_index": index, "_id": id, "_score": score, "_source": source })
        })
        .collect();
    (
        StatusCode::OK,
        Json(json!({ "took": 1, "hits": { "total": { "value": hits.len() }, "hits": hits } })),
    )
}

async fn opensearch_server() -> (String, SearchState) {
    let state = SearchState::default();
    let app = Router::new()
        .route(
            "/:index",
            put(create_index).head(head_index).delete(delete_index),
        )
        .route("/:index/_doc/:id", put(put_doc))
        .route("/:index/_refresh", post(refresh))
        .route("/:index/_search", post(search))
        .route("/:index/_count", get(count))
        .with_state(state.clone());
    (serve(app).await, state)
}

fn config(embed_url: &str, search_url: &str) -> Config {
    let mut config = Config::default();
    config.index.dimension = DIM;
    config.embedding.endpoint = Some(embed_url.to_string());
    config.embedding.api_key = Some(API_KEY.to_string());
    config.backend.kind = BackendKind::OpenSearch;
    config.backend.endpoint = Some(search_url.to_string());
    config
}

fn records() -> Vec<FinancialRecord> {
    vec![
        FinancialRecord::new("Arsenal", 2023, true).with_metric(Metric::Debt, 180_000_000),
        FinancialRecord::new("Chelsea", 2023, false).with_metric(Metric::Debt, 1_500_000_000),
        FinancialRecord::new("Brighton & Hove Albion", 2023, true)
            .with_metric(Metric::Revenue, 221_000_000),
    ]
}

#[tokio::test]
async fn test_pipeline_over_http() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let (embed_url, calls) = embedding_server(DIM).await;
    let (search_url, state) = opensearch_server().await;

    let store = VectorStore::from_config(&config(&embed_url, &search_url)).unwrap();
    let report = store.ingest(&records()).await.unwrap();
    assert!(report.is_complete(), "{:?}", report.failures);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(state.creates.load(Ordering::SeqCst), 1);

    {
        let indices = state.indices.lock().unwrap();
        let index = &indices["ffp-vectors"];
        let vector = &index.mapping["mappings"]["properties"]["vector"];
        assert_eq!(vector["type"], "knn_vector");
        assert_eq!(vector["dimension"], DIM);
        assert_eq!(vector["method"]["space_type"], "cosinesimil");
        assert!(index.docs.contains_key("Brighton & Hove Albion::2023"));
        assert_eq!(index.docs["Arsenal::2023"]["metadata"]["debt"], 180_000_000);
    }

    let results = store.query("Club: Chelsea Debt", 2).await.unwrap();
    assert_eq!(results.len(), 2);
    assert!(results[0].score >= results[1].score);
    assert_eq!(store.count().await.unwrap(), 3);

    // Same (club, year) overwrites.
    store.ingest(&records()[..1]).await.unwrap();
    assert_eq!(store.count().await.unwrap(), 3);
}

#[tokio::test]
async fn test_ensure_index_twice_over_http() {
    let (embed_url, _) = embedding_server(DIM).await;
    let (search_url, state) = opensearch_server().await;

    let store = VectorStore::from_config(&config(&embed_url, &search_url)).unwrap();
    assert_eq!(store.ensure_index().await.unwrap(), EnsureOutcome::Created);

    let other = VectorStore::from_config(&config(&embed_url, &search_url)).unwrap();
    assert_eq!(other.ensure_index().await.unwrap(), EnsureOutcome::AlreadyExists);
    assert_eq!(state.creates.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_opensearch_error_classification() {
    let (search_url, _) = opensearch_server().await;
    let backend = OpenSearchBackend::new(&search_url).unwrap();
    let schema = IndexSchema::ffp(DIM, SpaceType::CosineSimil, AnnMethod::default());

    assert!(!backend.index_exists("ffp").await.unwrap());
    backend.create_index("ffp", &schema).await.unwrap();
    assert!(backend.index_exists("ffp").await.unwrap());
    assert!(matches!(
        backend.create_index("ffp", &schema).await.unwrap_err(),
        FfpError::IndexAlreadyExists { .. }
    ));

    let query = KnnQuery {
        field: "vector".to_string(),
        vector: HashingEmbeddingProvider::new(DIM).unwrap().embed("debt").await.unwrap(),
        k: 3,
    };
    assert!(backend.search("ffp", &query).await.unwrap().is_empty());
    assert!(matches!(
        backend.search("absent", &query).await.unwrap_err(),
        FfpError::IndexNotFound { .. }
    ));

    backend.delete_index("ffp").await.unwrap();
    assert!(backend.refresh("ffp").await.unwrap_err().is_index());
}

#[tokio::test]
async fn test_embedding_provider_errors() {
    let (embed_url, calls) = embedding_server(DIM).await;

    let anonymous = HttpEmbeddingProvider::new(&embed_url)
        .unwrap()
        .with_model("amazon.titan-embed-text-v1", DIM);
    match anonymous.embed("debt").await.unwrap_err() {
        FfpError::Provider { status, .. } => assert_eq!(status, Some(403)),
        e => panic!("unexpected {e:?}"),
    }

    let provider = anonymous.with_api_key(API_KEY);
    let vector = provider.embed("Club: Arsenal").await.unwrap();
    assert_eq!(vector.dimension(), DIM);

    match provider.embed("please FAIL").await.unwrap_err() {
        FfpError::Provider { status, message } => {
            assert_eq!(status, Some(500));
            assert!(message.contains("model exploded"));
        }
        e => panic!("unexpected {e:?}"),
    }

    let before = calls.load(Ordering::SeqCst);
    assert!(provider.embed("  ").await.unwrap_err().is_validation());
    assert_eq!(calls.load(Ordering::SeqCst), before);
}

#[tokio::test]
async fn test_wrong_embedding_length_is_provider_error() {
    let (embed_url, _) = embedding_server(4).await;
    let provider = HttpEmbeddingProvider::new(&embed_url)
        .unwrap()
        .with_model("amazon.titan-embed-text-v1", DIM)
        .with_api_key(API_KEY);
    assert!(provider.embed("Debt").await.unwrap_err().is_provider());
}

#[tokio::test]
async fn test_unreachable_provider_is_provider_error() {
    // Bind then drop to get a closed port.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let provider = HttpEmbeddingProvider::new(&format!("http://{addr}")).unwrap();
    assert!(provider.embed("Debt").await.unwrap_err().is_provider());
}
