//! # Context Index
//!
//! A local-first context indexing and semantic retrieval engine for
//! development workspaces.
//!
//! Context Index maintains an append-only SQLite history of workspace
//! files: every ingested file is embedded, analyzed for complexity and
//! imports, and annotated with version-control metadata. Retrieval is
//! either cosine-similarity search over the embeddings or a
//! recency-ordered view of the log.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌───────────────────────┐   ┌──────────┐
//! │ Scan / Watch │──▶│  Pipeline              │──▶│  SQLite   │
//! │ walkdir /    │   │ embed + metrics + vcs │   │ append-  │
//! │ notify       │   └───────────────────────┘   │ only log │
//! └──────────────┘                               └────┬─────┘
//!                                                     │
//!                                   ┌─────────────────┤
//!                                   ▼                 ▼
//!                             ┌──────────┐      ┌──────────┐
//!                             │  search  │      │  recent  │
//!                             │ (cosine) │      │ (joined) │
//!                             └──────────┘      └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! cix init                      # create database
//! cix ingest --all              # index the workspace
//! cix watch                     # index on change
//! cix search "retry logic"      # semantic search
//! cix recent --limit 10         # recency view
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`chunk`] | Token-window text chunking |
//! | [`embedding`] | Embedding generation with hash fallback |
//! | [`metrics`] | Complexity, imports, and type summaries |
//! | [`vcs`] | Git metadata extraction |
//! | [`store`] | Append-only SQLite context store |
//! | [`search`] | Cosine-similarity retrieval |
//! | [`pipeline`] | Ingestion orchestration |
//! | [`workspace`] | Batch workspace scanning |
//! | [`watch`] | Filesystem watcher |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod chunk;
pub mod config;
pub mod db;
pub mod embedding;
pub mod metrics;
pub mod migrate;
pub mod models;
pub mod pipeline;
pub mod search;
pub mod store;
pub mod vcs;
pub mod watch;
pub mod workspace;
