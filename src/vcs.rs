//! Version-control metadata via the `git` CLI.
//!
//! [`fetch_git_metadata`] resolves the last commit touching a path and the
//! current branch of the enclosing repository. It is total: paths outside
//! a repository, paths with no history, and provider errors all yield
//! empty-string defaults so ingestion can proceed.

use std::path::Path;
use std::process::Command;

use crate::models::GitMetadata;

/// Unit separator keeps commit subjects with embedded spaces intact.
const FIELD_SEP: char = '\u{1f}';

pub fn fetch_git_metadata(path: &Path) -> GitMetadata {
    let repo_dir = path.parent().unwrap_or_else(|| Path::new("."));

    let mut metadata = GitMetadata::default();

    if let Some((hash, author, message)) = last_commit(repo_dir, path) {
        metadata.last_commit = hash;
        metadata.author = author;
        metadata.commit_message = message;
    }

    if let Some(branch) = current_branch(repo_dir) {
        metadata.branch = branch;
    }

    metadata
}

/// Hash, author, and subject of the most recent commit touching `path`.
fn last_commit(repo_dir: &Path, path: &Path) -> Option<(String, String, String)> {
    let output = Command::new("git")
        .args(["log", "-1", "--format=%H%x1f%an%x1f%s", "--"])
        .arg(path)
        .current_dir(repo_dir)
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let line = stdout.trim();
    if line.is_empty() {
        return None;
    }

    let mut parts = line.split(FIELD_SEP);
    let hash = parts.next()?.to_string();
    let author = parts.next()?.to_string();
    let message = parts.next().unwrap_or("").to_string();
    Some((hash, author, message))
}

fn current_branch(repo_dir: &Path) -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--abbrev-ref", "HEAD"])
        .current_dir(repo_dir)
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let branch = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if branch.is_empty() {
        None
    } else {
        Some(branch)
    }
}
