//! Ingestion pipeline orchestration and the engine API.
//!
//! [`ContextIndexer`] is the surface the hosting shell talks to:
//! `ingest(path, content)`, `search(query, k)`, `recent(n)`, `clear()`.
//! Inside `ingest`, every sub-step failure is absorbed — the affected
//! field degrades (fallback embedding, zero complexity, empty VCS
//! metadata) and the pipeline always reaches the store. A failed store
//! write is logged and dropped, never surfaced to the file-event source.

use anyhow::Result;
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::embedding::EmbeddingGenerator;
use crate::metrics;
use crate::models::{FileMetadata, NewEntry, RecentEntry, SearchHit};
use crate::search;
use crate::store::ContextStore;
use crate::vcs;

pub struct ContextIndexer {
    store: ContextStore,
    embedder: Arc<EmbeddingGenerator>,
}

impl ContextIndexer {
    pub fn new(store: ContextStore, embedder: Arc<EmbeddingGenerator>) -> Self {
        Self { store, embedder }
    }

    pub fn store(&self) -> &ContextStore {
        &self.store
    }

    pub fn embedder(&self) -> &Arc<EmbeddingGenerator> {
        &self.embedder
    }

    /// Run the full pipeline for one file event and append the result.
    ///
    /// There is no per-path mutual exclusion: two rapid edits to the same
    /// path may run concurrently and append in either order.
    pub async fn ingest(&self, path: &Path, content: &str) {
        let embedding = self.embedder.embed(content).await;
        let metrics = metrics::analyze(content, path);

        // git shells out twice; keep the subprocess wait off the
        // async workers.
        let git_path = path.to_path_buf();
        let git = tokio::task::spawn_blocking(move || vcs::fetch_git_metadata(&git_path))
            .await
            .unwrap_or_default();

        let file_type = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_string();
        let metadata = FileMetadata {
            file_type,
            timestamp: Utc::now().to_rfc3339(),
        };

        let entry = NewEntry {
            file_path: path.display().to_string(),
            content: content.to_string(),
            metadata,
            embedding: Some(embedding),
            type_info: metrics.type_info.clone(),
            metrics,
            git,
        };

        match self.store.insert(&entry).await {
            Ok(id) => debug!(id, path = %path.display(), "context entry stored"),
            Err(e) => warn!(
                "dropping context entry for {}: store write failed: {e:#}",
                path.display()
            ),
        }
    }

    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        search::search(&self.store, &self.embedder, query, k).await
    }

    pub async fn recent(&self, n: i64) -> Result<Vec<RecentEntry>> {
        self.store.recent(n).await
    }

    pub async fn clear(&self) -> Result<()> {
        self.store.clear().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::migrate;

    async fn test_indexer() -> (tempfile::TempDir, ContextIndexer) {
        let tmp = tempfile::TempDir::new().unwrap();
        let pool = db::connect_path(&tmp.path().join("cix.sqlite")).await.unwrap();
        migrate::run_migrations_on(&pool).await.unwrap();
        let indexer = ContextIndexer::new(
            ContextStore::new(pool),
            Arc::new(EmbeddingGenerator::new(500)),
        );
        (tmp, indexer)
    }

    #[tokio::test]
    async fn ingest_stores_entry_with_embedding_and_metrics() {
        let (tmp, indexer) = test_indexer().await;
        let file = tmp.path().join("sample.rs");
        let code = "use std::fmt;\n\nfn main() {\n    if true {\n        println!(\"hi\");\n    }\n}\n";
        std::fs::write(&file, code).unwrap();

        indexer.ingest(&file, code).await;

        let recent = indexer.recent(5).await.unwrap();
        assert_eq!(recent.len(), 1);
        let entry = &recent[0].entry;
        assert_eq!(entry.metrics.sloc, 8);
        assert_eq!(entry.metrics.complexity, 2);
        assert_eq!(entry.metrics.dependencies, vec!["std::fmt".to_string()]);
        assert_eq!(entry.metadata.file_type, "rs");

        let embedded = indexer.store().all_embedded().await.unwrap();
        assert_eq!(embedded.len(), 1);
    }

    #[tokio::test]
    async fn unparseable_kind_still_produces_entry_with_zero_complexity() {
        let (tmp, indexer) = test_indexer().await;
        let file = tmp.path().join("blob.dat");
        let content = "%%% not parseable by anything {{{";

        indexer.ingest(&file, content).await;

        let recent = indexer.recent(5).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].entry.metrics.complexity, 0);
        assert!(recent[0].entry.metrics.dependencies.is_empty());
        // Embedding is present via the fallback path
        assert_eq!(indexer.store().all_embedded().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn double_ingest_of_one_path_keeps_both_rows() {
        let (tmp, indexer) = test_indexer().await;
        let file = tmp.path().join("twice.txt");

        indexer.ingest(&file, "first version").await;
        indexer.ingest(&file, "second version").await;

        let recent = indexer.recent(5).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].entry.content, "second version");
        assert_eq!(recent[1].entry.content, "first version");
    }

    #[tokio::test]
    async fn ingest_carries_git_metadata_for_tracked_files() {
        let (tmp, indexer) = test_indexer().await;
        let dir = tmp.path();

        let git = |args: &[&str]| {
            std::process::Command::new("git")
                .args(args)
                .current_dir(dir)
                .output()
                .unwrap()
        };
        git(&["init", "-q"]);
        git(&["config", "user.email", "dev@example.com"]);
        git(&["config", "user.name", "Dev"]);

        let file = dir.join("tracked.rs");
        let code = "fn main() {}\n";
        std::fs::write(&file, code).unwrap();
        git(&["add", "tracked.rs"]);
        git(&["commit", "-q", "-m", "add tracked file"]);

        indexer.ingest(&file, code).await;

        let recent = indexer.recent(5).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].entry.git.author, "Dev");
        assert_eq!(recent[0].entry.git.commit_message, "add tracked file");
    }

    #[tokio::test]
    async fn clear_empties_search_and_recent() {
        let (tmp, indexer) = test_indexer().await;
        let file = tmp.path().join("gone.txt");
        indexer.ingest(&file, "ephemeral words").await;

        indexer.clear().await.unwrap();

        assert!(indexer.recent(10).await.unwrap().is_empty());
        assert!(indexer.search("ephemeral", 10).await.unwrap().is_empty());
    }
}
