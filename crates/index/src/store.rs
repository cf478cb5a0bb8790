use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;

/// One persisted row: a chunk's text and embedding plus the document's full
/// serialized knowledge graph. The graph JSON is duplicated verbatim across
/// every row of the document so any single row answers a retrieval without a
/// join.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRow {
    pub id: String,
    pub document_id: String,
    pub text: String,
    pub vector: Vec<f32>,
    pub knowledge_graph: String,
}

/// One similarity-search hit, highest score first.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub score: f32,
    pub text: String,
    pub knowledge_graph: String,
}

/// Vector store over the Qdrant REST API. One collection holds all
/// documents; rows are filtered by `document_id` at query time. Re-ingesting
/// a document deletes its rows and writes fresh ones (overwrite, no patch).
#[derive(Clone)]
pub struct VectorStore {
    base_url: String,
    collection: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct CreateCollection {
    vectors: VectorParams,
}

#[derive(Serialize)]
struct VectorParams {
    size: usize,
    distance: String,
}

#[derive(Serialize)]
struct UpsertPoints {
    points: Vec<Point>,
}

#[derive(Serialize)]
struct Point {
    id: u64,
    vector: Vec<f32>,
    payload: HashMap<String, serde_json::Value>,
}

impl VectorStore {
    pub fn new(base_url: String, collection: String) -> Self {
        Self {
            base_url,
            collection,
            client: reqwest::Client::new(),
        }
    }

    /// Create the collection if it does not exist. The dimension is pinned
    /// at first creation; later documents must embed to the same dimension.
    pub async fn ensure_collection(&self, dimension: usize) -> Result<()> {
        let url = format!("{}/collections/{}", self.base_url, self.collection);
        let response = self.client.get(&url).send().await?;
        if response.status().is_success() {
            return Ok(());
        }

        let create_req = CreateCollection {
            vectors: VectorParams {
                size: dimension,
                distance: "Cosine".to_string(),
            },
        };

        let response = self.client.put(&url).json(&create_req).send().await?;
        if !response.status().is_success() {
            let error_text = response.text().await?;
            anyhow::bail!("Failed to create collection: {}", error_text);
        }

        tracing::info!(collection = %self.collection, dimension, "collection created");
        Ok(())
    }

    /// Drop every row belonging to a document. Combined with `upsert_rows`
    /// this gives re-ingestion overwrite semantics; concurrent overwrite of
    /// the same document id is last-write-wins by design.
    pub async fn delete_document(&self, document_id: &str) -> Result<()> {
        let url = format!(
            "{}/collections/{}/points/delete",
            self.base_url, self.collection
        );
        let body = json!({ "filter": document_filter(document_id) });

        let response = self.client.post(&url).json(&body).send().await?;
        if !response.status().is_success() {
            let error_text = response.text().await?;
            anyhow::bail!("Failed to delete document rows: {}", error_text);
        }
        Ok(())
    }

    pub async fn upsert_rows(&self, rows: &[EmbeddingRow]) -> Result<()> {
        let points = rows
            .iter()
            .map(|row| {
                let mut payload = HashMap::new();
                payload.insert("id".to_string(), json!(row.id));
                payload.insert("document_id".to_string(), json!(row.document_id));
                payload.insert("text".to_string(), json!(row.text));
                payload.insert("knowledge_graph".to_string(), json!(row.knowledge_graph));
                Point {
                    id: hash_to_u64(&row.id),
                    vector: row.vector.clone(),
                    payload,
                }
            })
            .collect();

        let url = format!("{}/collections/{}/points", self.base_url, self.collection);
        let response = self
            .client
            .put(&url)
            .json(&UpsertPoints { points })
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            anyhow::bail!("Failed to upsert rows: {}", error_text);
        }
        Ok(())
    }

    /// Similarity search restricted to one document's rows.
    pub async fn search(
        &self,
        document_id: &str,
        query_vector: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchHit>> {
        let url = format!(
            "{}/collections/{}/points/search",
            self.base_url, self.collection
        );
        let body = json!({
            "vector": query_vector,
            "limit": limit,
            "with_payload": true,
            "filter": document_filter(document_id),
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("Failed to send search request")?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Vector search failed: {}", error_text);
        }

        let result: serde_json::Value = response
            .json()
            .await
            .context("Failed to parse search response")?;

        let points = result["result"]
            .as_array()
            .context("Invalid search response format")?;

        let mut hits = Vec::new();
        for point in points {
            let score = point["score"].as_f64().unwrap_or(0.0) as f32;
            let payload = &point["payload"];
            hits.push(SearchHit {
                score,
                text: payload["text"].as_str().unwrap_or("").to_string(),
                knowledge_graph: payload["knowledge_graph"].as_str().unwrap_or("").to_string(),
            });
        }

        Ok(hits)
    }

    /// Fetch the serialized knowledge graph for a document from any one of
    /// its rows (the JSON is identical across rows). `None` when the
    /// document has no rows.
    pub async fn fetch_graph_json(&self, document_id: &str) -> Result<Option<String>> {
        let url = format!(
            "{}/collections/{}/points/scroll",
            self.base_url, self.collection
        );
        let body = json!({
            "filter": document_filter(document_id),
            "limit": 1,
            "with_payload": true,
        });

        let response = self.client.post(&url).json(&body).send().await?;
        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Scroll request failed: {}", error_text);
        }

        let result: serde_json::Value = response.json().await?;
        let points = result["result"]["points"]
            .as_array()
            .context("Invalid scroll response format")?;

        Ok(points.first().map(|point| {
            point["payload"]["knowledge_graph"]
                .as_str()
                .unwrap_or("")
                .to_string()
        }))
    }

    /// Reachability probe for health checks.
    pub async fn ping(&self) -> Result<()> {
        let url = format!("{}/collections", self.base_url);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            anyhow::bail!("Vector store unreachable: {}", response.status());
        }
        Ok(())
    }
}

fn document_filter(document_id: &str) -> serde_json::Value {
    json!({
        "must": [{ "key": "document_id", "match": { "value": document_id } }]
    })
}

/// Stable string-id to point-id mapping.
fn hash_to_u64(s: &str) -> u64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    s.hash(&mut hasher);
    hasher.finish()
}
