//! Core data models for the context index.
//!
//! These types represent the entries that flow through the ingestion
//! pipeline and the rows handed back by retrieval queries.

use serde::{Deserialize, Serialize};

/// Static metrics computed for one file at ingestion time.
///
/// Stored as the JSON `complexity_metrics` column. Every field degrades
/// independently: a parse failure yields `complexity = 0` and empty
/// `dependencies` without touching `sloc` or `type_info`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CodeMetrics {
    pub complexity: u32,
    pub sloc: usize,
    pub dependencies: Vec<String>,
    pub type_info: String,
}

/// Version-control metadata for one file.
///
/// All fields default to empty strings when the path is not in a
/// repository or the provider fails.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GitMetadata {
    pub last_commit: String,
    pub author: String,
    pub commit_message: String,
    pub branch: String,
}

/// Derived metadata stored alongside each entry (redundant by design).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileMetadata {
    pub file_type: String,
    pub timestamp: String,
}

/// An entry ready to be appended to the store; the store assigns
/// `id` and `timestamp` on insert.
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub file_path: String,
    pub content: String,
    pub metadata: FileMetadata,
    pub embedding: Option<Vec<f32>>,
    pub metrics: CodeMetrics,
    pub git: GitMetadata,
    pub type_info: String,
}

/// A persisted context entry as read back from the store.
#[derive(Debug, Clone)]
pub struct ContextEntry {
    pub id: i64,
    /// Unix milliseconds, assigned at insert.
    pub timestamp: i64,
    pub file_path: String,
    pub content: String,
    pub metadata: FileMetadata,
    pub metrics: CodeMetrics,
    pub git: GitMetadata,
    pub type_info: String,
}

/// A recent entry joined with its relationship and cluster annotations.
#[derive(Debug, Clone)]
pub struct RecentEntry {
    pub entry: ContextEntry,
    /// Distinct relationship types referencing this entry, aggregated
    /// without ordering guarantees.
    pub relationship_types: Vec<String>,
    /// Name of a cluster whose file list textually contains this path.
    pub cluster_name: Option<String>,
}

/// Projection used by similarity search: only rows with a vector.
#[derive(Debug, Clone)]
pub struct EmbeddedEntry {
    pub id: i64,
    pub file_path: String,
    pub content: String,
    pub embedding: Vec<f32>,
}

/// A ranked search result.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub id: i64,
    pub file_path: String,
    pub content: String,
    pub score: f32,
}
