use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn cix_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("cix");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let data_dir = root.join("data");
    fs::create_dir_all(&data_dir).unwrap();

    let files_dir = root.join("files");
    fs::create_dir_all(&files_dir).unwrap();
    fs::write(
        files_dir.join("alpha.js"),
        "function foo() { return 1 + 1; }",
    )
    .unwrap();
    fs::write(files_dir.join("beta.js"), "const x = 1 + 1;").unwrap();
    fs::write(
        files_dir.join("gamma.rs"),
        "use std::fmt;\n\nfn main() {\n    if true {\n        println!(\"hi\");\n    }\n}\n",
    )
    .unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/cix.sqlite"

[chunking]
max_tokens = 500

[workspace]
root = "{}/files"
include_globs = ["**/*.js", "**/*.rs"]
exclude_globs = []
follow_symlinks = false
"#,
        root.display(),
        root.display()
    );

    let config_path = config_dir.join("cix.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_cix(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = cix_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run cix binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_init_creates_database() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_cix(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_cix(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_cix(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_ingest_all_scans_workspace() {
    let (_tmp, config_path) = setup_test_env();

    run_cix(&config_path, &["init"]);
    let (stdout, stderr, success) = run_cix(&config_path, &["ingest", "--all"]);
    assert!(
        success,
        "ingest failed: stdout={}, stderr={}",
        stdout, stderr
    );
    assert!(stdout.contains("Ingested 3 file(s)."));
}

#[test]
fn test_ingest_requires_paths_or_all() {
    let (_tmp, config_path) = setup_test_env();

    run_cix(&config_path, &["init"]);
    let (_, stderr, success) = run_cix(&config_path, &["ingest"]);
    assert!(!success);
    assert!(stderr.contains("No paths given"));
}

#[test]
fn test_search_ranks_matching_file_first() {
    let (tmp, config_path) = setup_test_env();

    run_cix(&config_path, &["init"]);
    run_cix(&config_path, &["ingest", "--all"]);

    let (stdout, stderr, success) = run_cix(&config_path, &["search", "foo"]);
    assert!(
        success,
        "search failed: stdout={}, stderr={}",
        stdout, stderr
    );

    let alpha = tmp.path().join("files").join("alpha.js");
    let first_line = stdout.lines().next().unwrap_or_default();
    assert!(
        first_line.contains(alpha.to_str().unwrap()),
        "expected alpha.js first, got: {}",
        stdout
    );
    assert!(first_line.starts_with("1. ["));
}

#[test]
fn test_search_empty_history() {
    let (_tmp, config_path) = setup_test_env();

    run_cix(&config_path, &["init"]);
    let (stdout, _, success) = run_cix(&config_path, &["search", "anything"]);
    assert!(success);
    assert!(stdout.contains("No results."));
}

#[test]
fn test_recent_newest_first_with_limit() {
    let (tmp, config_path) = setup_test_env();

    run_cix(&config_path, &["init"]);

    // 12 distinct ingests; recent defaults to 10
    let files_dir = tmp.path().join("files");
    for i in 0..12 {
        let path = files_dir.join(format!("gen{i}.rs"));
        fs::write(&path, format!("fn f{i}() {{}}")).unwrap();
        let (_, stderr, success) = run_cix(&config_path, &["ingest", path.to_str().unwrap()]);
        assert!(success, "ingest {i} failed: {}", stderr);
    }

    let (stdout, stderr, success) = run_cix(&config_path, &["recent"]);
    assert!(
        success,
        "recent failed: stdout={}, stderr={}",
        stdout, stderr
    );

    let numbered: Vec<&str> = stdout
        .lines()
        .filter(|l| l.contains("gen") && l.contains(". "))
        .collect();
    assert_eq!(numbered.len(), 10, "expected 10 entries, got: {}", stdout);
    assert!(numbered[0].contains("gen11.rs"));
    assert!(numbered[9].contains("gen2.rs"));
}

#[test]
fn test_reingest_appends_history() {
    let (tmp, config_path) = setup_test_env();

    run_cix(&config_path, &["init"]);

    let path = tmp.path().join("files").join("evolving.rs");
    fs::write(&path, "fn one() {}").unwrap();
    run_cix(&config_path, &["ingest", path.to_str().unwrap()]);
    fs::write(&path, "fn two() {}").unwrap();
    run_cix(&config_path, &["ingest", path.to_str().unwrap()]);

    let (stdout, _, success) = run_cix(&config_path, &["recent"]);
    assert!(success);
    let mentions = stdout.matches("evolving.rs").count();
    assert_eq!(mentions, 2, "expected two history rows, got: {}", stdout);
}

#[test]
fn test_clear_empties_history() {
    let (_tmp, config_path) = setup_test_env();

    run_cix(&config_path, &["init"]);
    run_cix(&config_path, &["ingest", "--all"]);

    let (stdout, _, success) = run_cix(&config_path, &["clear"]);
    assert!(success);
    assert!(stdout.contains("Context history cleared."));

    let (stdout, _, success) = run_cix(&config_path, &["recent"]);
    assert!(success);
    assert!(stdout.contains("No entries."));

    let (stdout, _, success) = run_cix(&config_path, &["search", "foo"]);
    assert!(success);
    assert!(stdout.contains("No results."));
}
