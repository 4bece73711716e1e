//! Drives `PineconeVectorStore` against a local fake of the Pinecone REST API.
//!
//! The fake serves the control plane and the data plane from one listener and
//! reports its own address as the index host.

#![cfg(feature = "pinecone")]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
};
use healthmate_rag::pinecone::PineconeVectorStore;
use healthmate_rag::{Chunk, RagError, VectorStore};
use serde_json::{Value, json};

#[derive(Default)]
struct FakeIndex {
    dimension: usize,
    describes_until_ready: u32,
    vectors: HashMap<String, HashMap<String, Value>>,
}

#[derive(Clone)]
struct Fake {
    addr: String,
    indexes: Arc<Mutex<HashMap<String, FakeIndex>>>,
    upsert_calls: Arc<Mutex<Vec<usize>>>,
    created: Arc<Mutex<Vec<Value>>>,
}

fn authorized(headers: &HeaderMap) -> bool {
    headers.get("api-key").and_then(|v| v.to_str().ok()) == Some("test-key")
        && headers.get("x-pinecone-api-version").is_some()
}

async fn describe(
    State(fake): State<Fake>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, StatusCode> {
    if !authorized(&headers) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    let mut indexes = fake.indexes.lock().unwrap();
    let index = indexes.get_mut(&name).ok_or(StatusCode::NOT_FOUND)?;
    let ready = index.describes_until_ready == 0;
    index.describes_until_ready = index.describes_until_ready.saturating_sub(1);
    Ok(Json(json!({
        "name": name,
        "dimension": index.dimension,
        "metric": "cosine",
        "host": if ready { format!("http://{}", fake.addr) } else { String::new() },
        "status": {"ready": ready, "state": if ready { "Ready" } else { "Initializing" }},
    })))
}

async fn create(
    State(fake): State<Fake>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Value>), StatusCode> {
    if !authorized(&headers) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    let name = body["name"].as_str().unwrap_or_default().to_string();
    let dimension = body["dimension"].as_u64().unwrap_or_default() as usize;
    fake.created.lock().unwrap().push(body.clone());
    fake.indexes.lock().unwrap().insert(
        name,
        FakeIndex { dimension, describes_until_ready: 1, vectors: HashMap::new() },
    );
    Ok((StatusCode::CREATED, Json(body)))
}

async fn upsert(State(fake): State<Fake>, Json(body): Json<Value>) -> Json<Value> {
    let namespace = body["namespace"].as_str().unwrap_or_default().to_string();
    let vectors = body["vectors"].as_array().cloned().unwrap_or_default();
    fake.upsert_calls.lock().unwrap().push(vectors.len());

    let mut indexes = fake.indexes.lock().unwrap();
    let index = indexes.values_mut().next().expect("an index exists");
    let entries = index.vectors.entry(namespace).or_default();
    for v in &vectors {
        entries.insert(v["id"].as_str().unwrap_or_default().to_string(), v.clone());
    }
    Json(json!({"upsertedCount": vectors.len()}))
}

async fn query(State(fake): State<Fake>, Json(body): Json<Value>) -> Json<Value> {
    let namespace = body["namespace"].as_str().unwrap_or_default();
    let top_k = body["topK"].as_u64().unwrap_or_default() as usize;
    assert_eq!(body["includeMetadata"], true);

    let indexes = fake.indexes.lock().unwrap();
    let index = indexes.values().next().expect("an index exists");
    let mut ids: Vec<&String> =
        index.vectors.get(namespace).map(|e| e.keys().collect()).unwrap_or_default();
    ids.sort();

    // Scores ascend with id order; the client must re-sort them.
    let matches: Vec<Value> = ids
        .into_iter()
        .take(top_k)
        .enumerate()
        .map(|(i, id)| {
            let stored = &index.vectors[namespace][id];
            json!({"id": id, "score": 0.1 * (i as f64 + 1.0), "metadata": stored["metadata"]})
        })
        .collect();
    Json(json!({"matches": matches, "namespace": namespace}))
}

async fn spawn_fake() -> Fake {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind fake");
    let addr = listener.local_addr().expect("fake addr").to_string();
    let fake = Fake {
        addr,
        indexes: Arc::default(),
        upsert_calls: Arc::default(),
        created: Arc::default(),
    };

    let app = Router::new()
        .route("/indexes", post(create))
        .route("/indexes/{name}", get(describe))
        .route("/vectors/upsert", post(upsert))
        .route("/query", post(query))
        .with_state(fake.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("fake server");
    });
    fake
}

fn store(fake: &Fake) -> PineconeVectorStore {
    PineconeVectorStore::new("test-key")
        .unwrap()
        .with_control_url(format!("http://{}/", fake.addr).parse().unwrap())
        .with_serverless("gcp", "europe-west4")
        .with_readiness_polling(5, Duration::from_millis(10))
}

fn chunk(i: usize, dim: usize) -> Chunk {
    Chunk {
        id: format!("guide.pdf:0_{i:03}"),
        text: format!("chunk number {i}"),
        embedding: vec![1.0; dim],
        metadata: HashMap::from([
            ("source".to_string(), "data/guide.pdf".to_string()),
            ("page".to_string(), "0".to_string()),
        ]),
        document_id: "guide.pdf:0".to_string(),
    }
}

#[tokio::test]
async fn creates_missing_index_and_waits_until_ready() {
    let fake = spawn_fake().await;
    let store = store(&fake);

    store.create_collection("health-mate-index", 4).await.unwrap();

    let created = fake.created.lock().unwrap();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0]["dimension"], 4);
    assert_eq!(created[0]["metric"], "cosine");
    assert_eq!(created[0]["spec"]["serverless"]["cloud"], "gcp");
    assert_eq!(created[0]["spec"]["serverless"]["region"], "europe-west4");
}

#[tokio::test]
async fn existing_index_with_other_dimension_is_rejected() {
    let fake = spawn_fake().await;
    fake.indexes
        .lock()
        .unwrap()
        .insert("health-mate-index".into(), FakeIndex { dimension: 768, ..Default::default() });

    let err = store(&fake).create_collection("health-mate-index", 4).await.unwrap_err();
    assert!(matches!(err, RagError::DimensionMismatch { expected: 768, actual: 4 }));
    assert!(fake.created.lock().unwrap().is_empty());
}

#[tokio::test]
async fn upserts_in_batches_and_queries_by_namespace() {
    let fake = spawn_fake().await;
    let store = store(&fake);
    store.create_collection("health-mate-index", 3).await.unwrap();

    let chunks: Vec<Chunk> = (0..250).map(|i| chunk(i, 3)).collect();
    store.upsert("health-mate-index", "default", &chunks).await.unwrap();
    assert_eq!(*fake.upsert_calls.lock().unwrap(), vec![100, 100, 50]);

    let results = store.search("health-mate-index", "default", &[1.0, 0.0, 0.0], 4).await.unwrap();
    assert_eq!(results.len(), 4);
    for window in results.windows(2) {
        assert!(window[0].score >= window[1].score);
    }
    let top = &results[0];
    assert_eq!(top.chunk.id, "guide.pdf:0_003");
    assert_eq!(top.chunk.text, "chunk number 3");
    assert_eq!(top.chunk.document_id, "guide.pdf:0");
    assert_eq!(top.citation().page, Some(0));

    let other = store.search("health-mate-index", "other", &[1.0, 0.0, 0.0], 4).await.unwrap();
    assert!(other.is_empty());
}

#[tokio::test]
async fn wrong_dimension_never_reaches_the_server() {
    let fake = spawn_fake().await;
    let store = store(&fake);
    store.create_collection("health-mate-index", 3).await.unwrap();

    let err = store.upsert("health-mate-index", "default", &[chunk(0, 5)]).await.unwrap_err();
    assert!(matches!(err, RagError::DimensionMismatch { expected: 3, actual: 5 }));
    assert!(fake.upsert_calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn searching_an_unknown_index_is_a_store_error() {
    let fake = spawn_fake().await;
    let err = store(&fake).search("missing", "default", &[1.0], 1).await.unwrap_err();
    assert!(matches!(err, RagError::VectorStoreError { .. }));
}

#[tokio::test]
async fn bad_api_key_surfaces_the_status() {
    let fake = spawn_fake().await;
    let store = PineconeVectorStore::new("wrong")
        .unwrap()
        .with_control_url(format!("http://{}/", fake.addr).parse().unwrap());
    let err = store.create_collection("health-mate-index", 3).await.unwrap_err();
    assert!(err.to_string().contains("401"), "{err}");
}
