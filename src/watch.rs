//! Filesystem watcher feeding the ingestion pipeline.
//!
//! Bridges notify's synchronous callback into the async runtime: the
//! watcher pushes events onto a std channel, a bridge thread forwards
//! them to a tokio channel, and [`run_watch`] consumes them. Each
//! qualifying create/modify event spawns an independent ingestion task;
//! nothing waits on a slow ingest and nothing is retried.

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::WorkspaceConfig;
use crate::pipeline::ContextIndexer;
use crate::workspace;

/// Watch the workspace root and ingest every created or modified file
/// that passes the include/exclude globs. Runs until the event stream
/// closes (watcher dropped or process shutdown).
pub async fn run_watch(indexer: Arc<ContextIndexer>, config: &WorkspaceConfig) -> Result<()> {
    let include_set = workspace::build_globset(&config.include_globs)?;
    let exclude_set = workspace::build_exclude_set(&config.exclude_globs)?;
    let root = config.root.clone();

    let (std_tx, std_rx) = std::sync::mpsc::channel::<notify::Result<Event>>();
    let (tx, mut rx) = mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(std_tx, notify::Config::default())
        .context("failed to create filesystem watcher")?;
    watcher
        .watch(&root, RecursiveMode::Recursive)
        .with_context(|| format!("failed to watch {}", root.display()))?;

    // notify delivers on its own thread; forward into the runtime.
    std::thread::spawn(move || {
        for event in std_rx {
            match event {
                Ok(event) => {
                    if tx.send(event).is_err() {
                        break;
                    }
                }
                Err(e) => warn!("watch error: {e}"),
            }
        }
    });

    info!("watching {} for changes", root.display());

    while let Some(event) = rx.recv().await {
        if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
            continue;
        }

        for path in event.paths {
            if !qualifies(&path, &root, &include_set, &exclude_set) {
                continue;
            }

            let indexer = Arc::clone(&indexer);
            tokio::spawn(async move {
                match std::fs::read_to_string(&path) {
                    Ok(content) => indexer.ingest(&path, &content).await,
                    Err(e) => debug!("skipping {}: {}", path.display(), e),
                }
            });
        }
    }

    Ok(())
}

fn qualifies(
    path: &PathBuf,
    root: &PathBuf,
    include_set: &globset::GlobSet,
    exclude_set: &globset::GlobSet,
) -> bool {
    if !path.is_file() {
        return false;
    }
    let relative = path.strip_prefix(root).unwrap_or(path);
    let rel_str = relative.to_string_lossy();
    !exclude_set.is_match(rel_str.as_ref()) && include_set.is_match(rel_str.as_ref())
}
