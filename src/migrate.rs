use anyhow::Result;

use crate::config::Config;
use crate::store::sqlite;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = sqlite::connect(config).await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS cases (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            reference TEXT,
            description TEXT,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(&pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            id TEXT PRIMARY KEY,
            case_id TEXT NOT NULL,
            name TEXT NOT NULL,
            doc_type TEXT,
            doc_date TEXT,
            page_count INTEGER,
            created_at INTEGER,
            FOREIGN KEY (case_id) REFERENCES cases(id)
        )
        "#,
    )
    .execute(&pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS findings (
            id TEXT PRIMARY KEY,
            case_id TEXT NOT NULL,
            title TEXT NOT NULL,
            description TEXT NOT NULL,
            severity TEXT,
            confidence REAL,
            engine TEXT,
            document_ids_json TEXT NOT NULL DEFAULT '[]',
            entity_ids_json TEXT NOT NULL DEFAULT '[]',
            evidence_json TEXT,
            created_at INTEGER,
            FOREIGN KEY (case_id) REFERENCES cases(id)
        )
        "#,
    )
    .execute(&pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS contradictions (
            id TEXT PRIMARY KEY,
            case_id TEXT NOT NULL,
            title TEXT NOT NULL,
            description TEXT,
            severity TEXT,
            contradiction_type TEXT,
            confidence REAL,
            source_a_document_id TEXT,
            source_a_entity_id TEXT,
            source_a_text TEXT NOT NULL,
            source_b_document_id TEXT,
            source_b_entity_id TEXT,
            source_b_text TEXT NOT NULL,
            FOREIGN KEY (case_id) REFERENCES cases(id)
        )
        "#,
    )
    .execute(&pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS entities (
            id TEXT PRIMARY KEY,
            case_id TEXT NOT NULL,
            canonical_name TEXT NOT NULL,
            entity_type TEXT,
            role TEXT,
            institution TEXT,
            mentions_json TEXT NOT NULL DEFAULT '[]',
            FOREIGN KEY (case_id) REFERENCES cases(id)
        )
        "#,
    )
    .execute(&pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS omissions (
            id TEXT PRIMARY KEY,
            case_id TEXT NOT NULL,
            title TEXT NOT NULL,
            description TEXT NOT NULL,
            severity TEXT,
            document_ids_json TEXT NOT NULL DEFAULT '[]',
            FOREIGN KEY (case_id) REFERENCES cases(id)
        )
        "#,
    )
    .execute(&pool)
    .await?;

    // Create indexes
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_documents_case_id ON documents(case_id)")
        .execute(&pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_findings_case_id ON findings(case_id)")
        .execute(&pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_contradictions_case_id ON contradictions(case_id)",
    )
    .execute(&pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_entities_case_id ON entities(case_id)")
        .execute(&pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_omissions_case_id ON omissions(case_id)")
        .execute(&pool)
        .await?;

    pool.close().await;
    Ok(())
}
