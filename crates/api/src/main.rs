mod cache;
mod config;
mod retry;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use cache::GraphCache;
use config::AppConfig;
use extract::OpenAiClient;
use graph::{GraphAssembler, GraphStatistics, KnowledgeGraph};
use index::{EmbeddingClient, Indexer, VectorStore};
use query::{AnswerSynthesizer, VectorRetriever};
use retry::RetryPolicy;

struct AppState {
    assembler: GraphAssembler<OpenAiClient>,
    synthesizer: AnswerSynthesizer<OpenAiClient, OpenAiClient, VectorRetriever>,
    indexer: Indexer,
    store: VectorStore,
    cache: GraphCache,
    retry: RetryPolicy,
    completion_base_url: String,
}

#[derive(Deserialize)]
struct UploadRequest {
    url: String,
}

#[derive(Serialize)]
struct UploadResponse {
    document_id: String,
    message: String,
    graph_stats: GraphStatistics,
}

#[derive(Deserialize)]
struct AnswerRequest {
    document_id: String,
    query: String,
}

#[derive(Serialize)]
struct AnswerResponse {
    answer: String,
}

#[derive(Serialize)]
struct HealthResponse {
    vector_store: String,
    completion: String,
}

type ApiError = (StatusCode, String);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = AppConfig::from_env()?;

    let extraction_llm = OpenAiClient::new(
        config.openai.base_url.clone(),
        config.openai.api_key.clone(),
        config.openai.completion_model.clone(),
        0.0,
    );
    let query_llm = extraction_llm.clone();
    let answer_llm = OpenAiClient::new(
        config.openai.base_url.clone(),
        config.openai.api_key.clone(),
        config.openai.completion_model.clone(),
        0.7,
    );

    let store = VectorStore::new(config.store.url.clone(), config.store.collection.clone());
    let embedder = EmbeddingClient::new(
        config.openai.base_url.clone(),
        config.openai.api_key.clone(),
        config.openai.embedding_model.clone(),
    );
    let retriever = VectorRetriever::new(store.clone(), embedder.clone());

    let state = Arc::new(AppState {
        assembler: GraphAssembler::new(extraction_llm),
        synthesizer: AnswerSynthesizer::new(answer_llm, query_llm, retriever),
        indexer: Indexer::new(store.clone(), embedder),
        store,
        cache: GraphCache::new(),
        retry: RetryPolicy::new(&config.retry),
        completion_base_url: config.openai.base_url.clone(),
    });

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/upload", post(upload_document))
        .route("/answer", post(answer_query))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %config.bind_addr, "server listening");
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let vector_store = match state.store.ping().await {
        Ok(()) => "ok".to_string(),
        Err(e) => format!("error: {}", e),
    };

    let completion = match reqwest::get(format!("{}/v1/models", state.completion_base_url)).await {
        Ok(resp) if resp.status().is_success() || resp.status().as_u16() == 401 => "ok".to_string(),
        Ok(resp) => format!("error: status {}", resp.status()),
        Err(e) => format!("error: {}", e),
    };

    Json(HealthResponse {
        vector_store,
        completion,
    })
}

/// Ingestion path: fetch, split, assemble the graph (all-or-nothing, with
/// retry), then persist chunks and the serialized graph together. Nothing is
/// written when assembly fails.
async fn upload_document(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UploadRequest>,
) -> Result<Json<UploadResponse>, ApiError> {
    let (document_id, chunks) = ingest::ingest_url(&req.url).await.map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            format!("Failed to process PDF: {}", e),
        )
    })?;

    if chunks.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "The document contains no text".to_string(),
        ));
    }

    let knowledge_graph = state
        .retry
        .run("assemble_graph", || {
            state.assembler.assemble(&document_id, &chunks)
        })
        .await
        .map_err(|e| {
            error!(document_id, error = %e, "graph assembly failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to create knowledge graph: {}", e),
            )
        })?;

    let stats = graph::statistics(&knowledge_graph);
    info!(
        document_id,
        total_nodes = stats.total_nodes,
        total_edges = stats.total_edges,
        "graph created"
    );

    let graph_json = knowledge_graph.to_json().map_err(internal)?;

    state
        .indexer
        .index_document(&document_id, &chunks, &graph_json)
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to create embeddings: {}", e),
            )
        })?;

    state.cache.insert(&document_id, knowledge_graph);

    Ok(Json(UploadResponse {
        document_id,
        message: "PDF processed, embeddings created, and knowledge graph built".to_string(),
        graph_stats: stats,
    }))
}

async fn answer_query(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnswerRequest>,
) -> Result<Json<AnswerResponse>, ApiError> {
    let knowledge_graph = load_graph(&state, &req.document_id).await?;

    let answer = state
        .synthesizer
        .answer(&req.document_id, &knowledge_graph, &req.query)
        .await;

    Ok(Json(AnswerResponse { answer }))
}

/// Look up a document's graph: cache first, then the store's persisted copy.
/// An unknown document is a 404; a present-but-blank graph cell degrades to
/// an empty graph.
async fn load_graph(state: &AppState, document_id: &str) -> Result<Arc<KnowledgeGraph>, ApiError> {
    if let Some(cached) = state.cache.get(document_id) {
        return Ok(cached);
    }

    let graph_json = state
        .store
        .fetch_graph_json(document_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                "Document ID not found".to_string(),
            )
        })?;

    let knowledge_graph = if graph_json.trim().is_empty() {
        KnowledgeGraph::empty(document_id)
    } else {
        KnowledgeGraph::from_json(&graph_json).map_err(|e| {
            error!(document_id, error = %e, "stored graph failed to parse");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Invalid knowledge graph JSON format".to_string(),
            )
        })?
    };

    Ok(state.cache.insert(document_id, knowledge_graph))
}

fn internal(e: impl std::fmt::Display) -> ApiError {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}
