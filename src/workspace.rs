//! Workspace scanning.
//!
//! Walks the configured root, applies include/exclude globs, and reads
//! file contents — the batch counterpart of the watcher's event stream.
//! Binary or unreadable files are skipped rather than failing the scan.

use anyhow::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::PathBuf;
use tracing::debug;
use walkdir::WalkDir;

use crate::config::WorkspaceConfig;

/// Paths no workspace wants indexed, merged with the configured excludes.
const DEFAULT_EXCLUDES: &[&str] = &[
    "**/.git/**",
    "**/target/**",
    "**/node_modules/**",
    "**/out/**",
    "**/dist/**",
];

pub fn scan_workspace(config: &WorkspaceConfig) -> Result<Vec<(PathBuf, String)>> {
    let include_set = build_globset(&config.include_globs)?;
    let exclude_set = build_exclude_set(&config.exclude_globs)?;

    let mut files = Vec::new();

    for entry in WalkDir::new(&config.root).follow_links(config.follow_symlinks) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(&config.root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().to_string();

        if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
            continue;
        }

        match std::fs::read_to_string(path) {
            Ok(content) => files.push((path.to_path_buf(), content)),
            Err(e) => debug!("skipping unreadable file {}: {}", path.display(), e),
        }
    }

    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files)
}

pub(crate) fn build_exclude_set(extra: &[String]) -> Result<GlobSet> {
    let mut patterns: Vec<String> = DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect();
    patterns.extend(extra.iter().cloned());
    build_globset(&patterns)
}

pub(crate) fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn scan_applies_globs_and_default_excludes() {
        let tmp = tempfile::TempDir::new().unwrap();
        let root = tmp.path();

        fs::write(root.join("keep.rs"), "fn main() {}").unwrap();
        fs::write(root.join("skip.md"), "# skipped").unwrap();
        fs::create_dir_all(root.join("target")).unwrap();
        fs::write(root.join("target").join("ignored.rs"), "x").unwrap();

        let config = WorkspaceConfig {
            root: root.to_path_buf(),
            include_globs: vec!["**/*.rs".to_string()],
            exclude_globs: vec![],
            follow_symlinks: false,
        };

        let files = scan_workspace(&config).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].0.ends_with("keep.rs"));
    }

    #[test]
    fn scan_returns_contents() {
        let tmp = tempfile::TempDir::new().unwrap();
        fs::write(tmp.path().join("a.txt"), "hello").unwrap();

        let config = WorkspaceConfig {
            root: tmp.path().to_path_buf(),
            ..WorkspaceConfig::default()
        };

        let files = scan_workspace(&config).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].1, "hello");
    }
}
