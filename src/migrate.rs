use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    run_migrations_on(&pool).await?;
    pool.close().await;
    Ok(())
}

pub async fn run_migrations_on(pool: &SqlitePool) -> Result<()> {
    // Append-only context log. `embedding` is nullable: the row format
    // must tolerate a missing vector even though the fallback path makes
    // embedding generation total in practice.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS context_entries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp INTEGER NOT NULL,
            file_path TEXT NOT NULL,
            content TEXT NOT NULL,
            metadata TEXT NOT NULL DEFAULT '{}',
            embedding BLOB,
            complexity_metrics TEXT NOT NULL DEFAULT '{}',
            git_metadata TEXT NOT NULL DEFAULT '{}',
            type_info TEXT NOT NULL DEFAULT ''
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Knowledge-graph edges between entries. No producer populates this
    // yet; recent() still aggregates over it.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS relationships (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            source_id INTEGER NOT NULL,
            target_id INTEGER NOT NULL,
            relationship_type TEXT NOT NULL,
            weight REAL,
            FOREIGN KEY (source_id) REFERENCES context_entries(id),
            FOREIGN KEY (target_id) REFERENCES context_entries(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS code_clusters (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            cluster_name TEXT NOT NULL,
            files TEXT NOT NULL DEFAULT '',
            complexity_score REAL,
            description TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sprint_summaries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            start_date INTEGER,
            end_date INTEGER,
            summary TEXT,
            decisions TEXT,
            next_actions TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_context_entries_timestamp ON context_entries(timestamp DESC)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_context_entries_file_path ON context_entries(file_path)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_relationships_source_id ON relationships(source_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
