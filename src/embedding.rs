//! Embedding generation: model-backed path with a deterministic fallback.
//!
//! [`EmbeddingGenerator`] turns raw text into a fixed-length vector of
//! [`EMBEDDING_DIMS`] floats and never fails observably:
//!
//! - **Model path** — chunk the text ([`crate::chunk`]), run each chunk
//!   through the lazily-initialized [`EmbeddingModel`] singleton, and pool
//!   the chunk vectors by elementwise mean. Model calls are serialized
//!   through a single-slot async mutex because the model handle is shared
//!   process-wide state.
//! - **Fallback path** — a deterministic bag-of-hashed-tokens frequency
//!   vector, used until the model finishes initializing and whenever the
//!   model path errors. Partial chunk results are discarded, never mixed
//!   with fallback output.
//!
//! Also provides the vector utilities shared with the store and search:
//! [`vec_to_blob`] / [`blob_to_vec`] for SQLite BLOB storage and
//! [`cosine_similarity`] with zero-norm hardening.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use crate::chunk::chunk_text;
use crate::config::EmbeddingConfig;

/// Dimensionality of every vector in the index. The model path and the
/// fallback path both produce vectors of this length; anything else is
/// rejected before it can poison the index.
pub const EMBEDDING_DIMS: usize = 512;

/// An external embedding-model capability.
///
/// `predict` may fail for any reason (network, rate limit, cold start);
/// the generator absorbs those failures into the fallback path.
#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    fn name(&self) -> &str;
    async fn predict(&self, text: &str) -> Result<Vec<f32>>;
}

/// Generates embeddings for ingestion and queries.
pub struct EmbeddingGenerator {
    max_chunk_tokens: usize,
    /// Shared model handle, populated once by [`initialize`](Self::initialize).
    model: RwLock<Option<Arc<dyn EmbeddingModel>>>,
    /// Single-flight gate: at most one in-flight `predict` call.
    gate: Mutex<()>,
}

impl EmbeddingGenerator {
    pub fn new(max_chunk_tokens: usize) -> Self {
        Self {
            max_chunk_tokens,
            model: RwLock::new(None),
            gate: Mutex::new(()),
        }
    }

    /// Install the configured model, if any. Called once at startup;
    /// `embed` uses the fallback until this completes, rather than
    /// blocking.
    pub async fn initialize(&self, config: &EmbeddingConfig) {
        if !config.is_enabled() {
            return;
        }
        match RemoteModel::new(config) {
            Ok(model) => {
                info!(model = model.name(), "embedding model ready");
                self.install_model(Arc::new(model)).await;
            }
            Err(e) => {
                warn!("embedding model unavailable, staying on fallback: {e:#}");
            }
        }
    }

    pub async fn install_model(&self, model: Arc<dyn EmbeddingModel>) {
        *self.model.write().await = Some(model);
    }

    /// Embed `text` into a vector of exactly [`EMBEDDING_DIMS`] floats.
    /// Total: degrades to the deterministic fallback on any model failure.
    pub async fn embed(&self, text: &str) -> Vec<f32> {
        let chunks = chunk_text(text, self.max_chunk_tokens);
        if chunks.is_empty() {
            return vec![0.0; EMBEDDING_DIMS];
        }

        let model = self.model.read().await.clone();
        let Some(model) = model else {
            return fallback_embedding(text);
        };

        match self.pool_chunks(model.as_ref(), &chunks).await {
            Ok(vector) => vector,
            Err(e) => {
                warn!(
                    model = model.name(),
                    "embedding model failed, using fallback: {e:#}"
                );
                fallback_embedding(text)
            }
        }
    }

    /// Run every chunk through the model and average the results.
    /// Any per-chunk failure aborts the whole model path.
    async fn pool_chunks(&self, model: &dyn EmbeddingModel, chunks: &[String]) -> Result<Vec<f32>> {
        let mut pooled = vec![0.0f32; EMBEDDING_DIMS];

        for chunk in chunks {
            let vector = {
                let _slot = self.gate.lock().await;
                model.predict(chunk).await?
            };
            if vector.len() != EMBEDDING_DIMS {
                bail!(
                    "model returned {} dims, expected {}",
                    vector.len(),
                    EMBEDDING_DIMS
                );
            }
            for (acc, v) in pooled.iter_mut().zip(vector.iter()) {
                *acc += v;
            }
        }

        let count = chunks.len() as f32;
        for acc in pooled.iter_mut() {
            *acc /= count;
        }

        Ok(pooled)
    }
}

/// Deterministic hashing embedding: lowercase the text, split on runs of
/// non-word characters, and count each token into the bucket selected by
/// a 32-bit wrapping polynomial hash. Order-independent; identical input
/// yields an identical vector across runs and processes.
pub fn fallback_embedding(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0f32; EMBEDDING_DIMS];
    let lower = text.to_lowercase();

    for token in lower
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|t| !t.is_empty())
    {
        let mut hash: i32 = 0;
        for c in token.chars() {
            hash = hash.wrapping_mul(31).wrapping_add(c as i32);
        }
        let index = hash.unsigned_abs() as usize % EMBEDDING_DIMS;
        vector[index] += 1.0;
    }

    vector
}

// ============ Remote model ============

/// Embedding model backed by an OpenAI-compatible embeddings API.
///
/// Requires the `OPENAI_API_KEY` environment variable. Requests pin the
/// `dimensions` parameter to [`EMBEDDING_DIMS`] so the remote space stays
/// comparable with the fallback space.
///
/// Retry strategy: HTTP 429 and 5xx retry with exponential backoff
/// (1s, 2s, 4s, ... capped at 32s); other 4xx fail immediately; network
/// errors retry.
pub struct RemoteModel {
    model: String,
    client: reqwest::Client,
    max_retries: u32,
}

impl RemoteModel {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("embedding.model required for OpenAI provider"))?;

        if std::env::var("OPENAI_API_KEY").is_err() {
            bail!("OPENAI_API_KEY environment variable not set");
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            model,
            client,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl EmbeddingModel for RemoteModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn predict(&self, text: &str) -> Result<Vec<f32>> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY not set"))?;

        let body = serde_json::json!({
            "model": self.model,
            "input": [text],
            "dimensions": EMBEDDING_DIMS,
        });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s, 8s, ...
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post("https://api.openai.com/v1/embeddings")
                .header("Authorization", format!("Bearer {}", api_key))
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response.json().await?;
                        return parse_embeddings_response(&json);
                    }

                    // Rate limited or server error — retry
                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err =
                            Some(anyhow::anyhow!("embeddings API error {}: {}", status, body_text));
                        continue;
                    }

                    // Client error (not 429) — don't retry
                    let body_text = response.text().await.unwrap_or_default();
                    bail!("embeddings API error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("embedding failed after retries")))
    }
}

fn parse_embeddings_response(json: &serde_json::Value) -> Result<Vec<f32>> {
    let embedding = json
        .get("data")
        .and_then(|d| d.as_array())
        .and_then(|d| d.first())
        .and_then(|item| item.get("embedding"))
        .and_then(|e| e.as_array())
        .ok_or_else(|| anyhow::anyhow!("Invalid embeddings response: missing data"))?;

    Ok(embedding
        .iter()
        .map(|v| v.as_f64().unwrap_or(0.0) as f32)
        .collect())
}

// ============ Vector utilities ============

/// Encode a float vector as a BLOB (little-endian f32 bytes).
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB back into a float vector.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Compute cosine similarity between two vectors.
///
/// Returns `0.0` (not NaN) when either vector has zero norm or the
/// lengths differ — comparisons across dimensionalities are undefined.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}
