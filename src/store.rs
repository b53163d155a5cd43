//! Append-only SQLite context store.
//!
//! One row per successful ingestion; rows are never updated in place, so
//! re-ingesting a changed file appends a new entry and the table reads as
//! a history log. `clear()` truncates only `context_entries` — rows in the
//! dormant relationship/cluster tables are left to orphan deliberately.

use anyhow::Result;
use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::embedding::{blob_to_vec, vec_to_blob};
use crate::models::{ContextEntry, EmbeddedEntry, NewEntry, RecentEntry};

pub struct ContextStore {
    pool: SqlitePool,
}

impl ContextStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Append one entry; the store assigns id and timestamp. The pipeline
    /// logs and drops on failure, it never retries.
    pub async fn insert(&self, entry: &NewEntry) -> Result<i64> {
        let now = Utc::now().timestamp_millis();
        let metadata = serde_json::to_string(&entry.metadata)?;
        let metrics = serde_json::to_string(&entry.metrics)?;
        let git = serde_json::to_string(&entry.git)?;
        let blob = entry.embedding.as_ref().map(|v| vec_to_blob(v));

        let result = sqlx::query(
            r#"
            INSERT INTO context_entries (
                timestamp, file_path, content, metadata,
                embedding, complexity_metrics, git_metadata, type_info
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(now)
        .bind(&entry.file_path)
        .bind(&entry.content)
        .bind(&metadata)
        .bind(&blob)
        .bind(&metrics)
        .bind(&git)
        .bind(&entry.type_info)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// The `n` most recently inserted entries, newest first, each joined
    /// with the distinct relationship types referencing it and any cluster
    /// whose file list textually contains its path. The id tiebreak keeps
    /// ordering deterministic for same-millisecond inserts.
    ///
    /// Relationship types are concatenated on a unit separator so values
    /// containing commas survive; SQLite's DISTINCT aggregate form does
    /// not allow a custom separator, so dedup happens on the Rust side.
    pub async fn recent(&self, n: i64) -> Result<Vec<RecentEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT c.id, c.timestamp, c.file_path, c.content, c.metadata,
                   c.complexity_metrics, c.git_metadata, c.type_info,
                   GROUP_CONCAT(r.relationship_type, char(31)) AS relationship_types,
                   cl.cluster_name
            FROM context_entries c
            LEFT JOIN relationships r ON r.source_id = c.id
            LEFT JOIN code_clusters cl ON cl.files LIKE '%' || c.file_path || '%'
            GROUP BY c.id
            ORDER BY c.timestamp DESC, c.id DESC
            LIMIT ?
            "#,
        )
        .bind(n)
        .fetch_all(&self.pool)
        .await?;

        let entries = rows
            .iter()
            .map(|row| {
                let metadata: String = row.get("metadata");
                let metrics: String = row.get("complexity_metrics");
                let git: String = row.get("git_metadata");
                let relationship_types: Option<String> = row.get("relationship_types");

                RecentEntry {
                    entry: ContextEntry {
                        id: row.get("id"),
                        timestamp: row.get("timestamp"),
                        file_path: row.get("file_path"),
                        content: row.get("content"),
                        metadata: serde_json::from_str(&metadata).unwrap_or_default(),
                        metrics: serde_json::from_str(&metrics).unwrap_or_default(),
                        git: serde_json::from_str(&git).unwrap_or_default(),
                        type_info: row.get("type_info"),
                    },
                    relationship_types: relationship_types
                        .map(|s| {
                            let mut types: Vec<String> = Vec::new();
                            for t in s.split('\u{1f}') {
                                if !types.iter().any(|seen| seen == t) {
                                    types.push(t.to_string());
                                }
                            }
                            types
                        })
                        .unwrap_or_default(),
                    cluster_name: row.get("cluster_name"),
                }
            })
            .collect();

        Ok(entries)
    }

    /// Every entry with a present embedding, in insertion order. This is
    /// the candidate set for similarity search.
    pub async fn all_embedded(&self) -> Result<Vec<EmbeddedEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, file_path, content, embedding
            FROM context_entries
            WHERE embedding IS NOT NULL
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let entries = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                EmbeddedEntry {
                    id: row.get("id"),
                    file_path: row.get("file_path"),
                    content: row.get("content"),
                    embedding: blob_to_vec(&blob),
                }
            })
            .collect();

        Ok(entries)
    }

    /// Truncate the context log. Relationships and clusters are not
    /// cascaded.
    pub async fn clear(&self) -> Result<()> {
        sqlx::query("DELETE FROM context_entries")
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
