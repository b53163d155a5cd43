//! # Context Index CLI (`cix`)
//!
//! The `cix` binary is the primary interface for Context Index. It provides
//! commands for database initialization, workspace ingestion, live watching,
//! semantic search, recency queries, and history maintenance.
//!
//! ## Usage
//!
//! ```bash
//! cix --config ./config/cix.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `cix init` | Create the SQLite database and run schema migrations |
//! | `cix ingest <paths>` | Ingest specific files |
//! | `cix ingest --all` | Scan and ingest the whole workspace |
//! | `cix watch` | Watch the workspace and ingest on change |
//! | `cix search "<query>"` | Semantic search over the context history |
//! | `cix recent` | Show the most recent context entries |
//! | `cix clear` | Delete the context history |

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use context_index::config;
use context_index::db;
use context_index::embedding::EmbeddingGenerator;
use context_index::migrate;
use context_index::pipeline::ContextIndexer;
use context_index::store::ContextStore;
use context_index::watch;
use context_index::workspace;

/// Context Index CLI — a local-first context indexing and semantic
/// retrieval engine for development workspaces.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/cix.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "cix",
    about = "Context Index — a local-first context indexing and semantic retrieval engine",
    version,
    long_about = "Context Index maintains an append-only SQLite history of workspace files, \
    embedding each one for semantic search and annotating it with complexity metrics and \
    version-control metadata. Retrieval is cosine-similarity search or a recency-ordered view."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/cix.toml`. Database, chunking, embedding,
    /// and workspace settings are read from this file.
    #[arg(long, global = true, default_value = "./config/cix.toml")]
    config: PathBuf,

    /// Enable debug logging.
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and all required tables
    /// (context_entries, relationships, code_clusters, sprint_summaries).
    /// This command is idempotent — running it multiple times is safe.
    Init,

    /// Ingest files into the context history.
    ///
    /// Each file is embedded, analyzed, and appended to the history.
    /// Re-ingesting a path appends a new entry, it never overwrites.
    Ingest {
        /// Files to ingest.
        paths: Vec<PathBuf>,

        /// Scan the configured workspace root and ingest every file
        /// matched by the include/exclude globs.
        #[arg(long)]
        all: bool,
    },

    /// Watch the workspace and ingest files as they change.
    ///
    /// Runs until interrupted. Every create or modify event for a file
    /// matching the workspace globs triggers an independent ingestion.
    Watch,

    /// Search the context history by semantic similarity.
    ///
    /// Embeds the query with the same generator used at ingestion time
    /// and returns the top entries by cosine similarity.
    Search {
        /// The search query string.
        query: String,

        /// Maximum number of results to return.
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },

    /// Show the most recent context entries.
    ///
    /// Entries are newest first, each annotated with its relationship
    /// types and cluster membership where present.
    Recent {
        /// Maximum number of entries to show.
        #[arg(long, default_value_t = 10)]
        limit: i64,
    },

    /// Delete the context history.
    ///
    /// Truncates the context log. Relationship and cluster rows are kept.
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized at {}.", cfg.db.path.display());
        }
        Commands::Ingest { paths, all } => {
            let indexer = build_indexer(&cfg).await?;

            let files: Vec<(PathBuf, String)> = if all {
                if !paths.is_empty() {
                    bail!("--all cannot be combined with explicit paths");
                }
                workspace::scan_workspace(&cfg.workspace)?
            } else {
                if paths.is_empty() {
                    bail!("No paths given. Pass file paths or use --all.");
                }
                let mut files = Vec::with_capacity(paths.len());
                for path in paths {
                    let content = std::fs::read_to_string(&path)?;
                    files.push((path, content));
                }
                files
            };

            let count = files.len();
            for (path, content) in &files {
                indexer.ingest(path, content).await;
            }
            println!("Ingested {} file(s).", count);
        }
        Commands::Watch => {
            let indexer = Arc::new(build_indexer(&cfg).await?);
            watch::run_watch(indexer, &cfg.workspace).await?;
        }
        Commands::Search { query, limit } => {
            let indexer = build_indexer(&cfg).await?;
            let hits = indexer.search(&query, limit).await?;

            if hits.is_empty() {
                println!("No results.");
                return Ok(());
            }

            for (i, hit) in hits.iter().enumerate() {
                println!("{}. [{:.4}] {}", i + 1, hit.score, hit.file_path);
                println!("    excerpt: \"{}\"", excerpt(&hit.content));
                println!("    id: {}", hit.id);
                println!();
            }
        }
        Commands::Recent { limit } => {
            let indexer = build_indexer(&cfg).await?;
            let entries = indexer.recent(limit).await?;

            if entries.is_empty() {
                println!("No entries.");
                return Ok(());
            }

            for (i, recent) in entries.iter().enumerate() {
                let entry = &recent.entry;
                let date = chrono::DateTime::from_timestamp_millis(entry.timestamp)
                    .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_default();

                println!("{}. {} ({})", i + 1, entry.file_path, date);
                println!(
                    "    complexity: {}  sloc: {}",
                    entry.metrics.complexity, entry.metrics.sloc
                );
                if !recent.relationship_types.is_empty() {
                    println!("    relationships: {}", recent.relationship_types.join(", "));
                }
                if let Some(ref cluster) = recent.cluster_name {
                    println!("    cluster: {}", cluster);
                }
                println!("    id: {}", entry.id);
                println!();
            }
        }
        Commands::Clear => {
            let indexer = build_indexer(&cfg).await?;
            indexer.clear().await?;
            println!("Context history cleared.");
        }
    }

    Ok(())
}

/// Connect the store and stand up the embedding generator.
///
/// Model initialization is awaited here so one-shot commands never race
/// it; if the provider is disabled or fails to come up, the generator
/// falls back to hash embeddings.
async fn build_indexer(cfg: &config::Config) -> Result<ContextIndexer> {
    let pool = db::connect(cfg).await?;
    let store = ContextStore::new(pool);

    let embedder = Arc::new(EmbeddingGenerator::new(cfg.chunking.max_tokens));
    embedder.initialize(&cfg.embedding).await;

    Ok(ContextIndexer::new(store, embedder))
}

fn excerpt(content: &str) -> String {
    let flat = content.replace('\n', " ");
    let trimmed = flat.trim();
    if trimmed.chars().count() > 120 {
        let cut: String = trimmed.chars().take(120).collect();
        format!("{}…", cut)
    } else {
        trimmed.to_string()
    }
}
