//! Cosine-similarity search over the embedded context log.
//!
//! Embeds the query with the same generator that embedded the stored
//! entries, scores every embedded entry, and returns the top `k` by
//! descending score. Store read failures propagate: unlike ingestion,
//! a caller issuing a query has no fallback dataset.

use anyhow::Result;

use crate::embedding::{cosine_similarity, EmbeddingGenerator};
use crate::models::SearchHit;
use crate::store::ContextStore;

pub async fn search(
    store: &ContextStore,
    embedder: &EmbeddingGenerator,
    query: &str,
    k: usize,
) -> Result<Vec<SearchHit>> {
    let query_vector = embedder.embed(query).await;
    let entries = store.all_embedded().await?;

    let mut hits: Vec<SearchHit> = entries
        .into_iter()
        .map(|entry| {
            let score = cosine_similarity(&query_vector, &entry.embedding);
            SearchHit {
                id: entry.id,
                file_path: entry.file_path,
                content: entry.content,
                score,
            }
        })
        .collect();

    // Stable sort: ties keep store iteration order.
    hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    hits.truncate(k);

    Ok(hits)
}
