//! SQLite-backed [`DataLayer`] implementation.
//!
//! Schema is created by [`crate::migrate`]. List-valued fields
//! (document ids, entity ids, mentions) are stored as JSON text columns and
//! parsed leniently on read: a corrupt column yields an empty list, not a
//! failed export.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::str::FromStr;

use crate::config::Config;
use crate::models::{
    AnalysisBundle, CaseBundle, CaseFile, Contradiction, Entity, Finding, Omission,
    SourceDocument,
};

use super::DataLayer;

pub struct SqliteStore {
    pool: SqlitePool,
}

pub async fn connect(config: &Config) -> Result<SqlitePool> {
    let db_path = &config.db.path;

    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    Ok(pool)
}

fn ts_to_datetime(ts: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(ts, 0).unwrap_or_else(Utc::now)
}

fn json_list(raw: Option<String>) -> Vec<String> {
    raw.and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default()
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn open(config: &Config) -> Result<Self> {
        Ok(Self::new(connect(config).await?))
    }

    pub async fn close(self) {
        self.pool.close().await;
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Insert or replace a complete case bundle (used by `cbx import`).
    pub async fn insert_bundle(&self, bundle: &CaseBundle) -> Result<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO cases (id, name, reference, description, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&bundle.case.id)
        .bind(&bundle.case.name)
        .bind(&bundle.case.reference)
        .bind(&bundle.case.description)
        .bind(bundle.case.created_at.timestamp())
        .execute(&self.pool)
        .await?;

        for d in &bundle.documents {
            sqlx::query(
                "INSERT OR REPLACE INTO documents \
                 (id, case_id, name, doc_type, doc_date, page_count, created_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&d.id)
            .bind(&d.case_id)
            .bind(&d.name)
            .bind(&d.doc_type)
            .bind(&d.doc_date)
            .bind(d.page_count.map(|p| p as i64))
            .bind(d.created_at.map(|t| t.timestamp()))
            .execute(&self.pool)
            .await?;
        }

        for f in &bundle.findings {
            sqlx::query(
                "INSERT OR REPLACE INTO findings \
                 (id, case_id, title, description, severity, confidence, engine, \
                  document_ids_json, entity_ids_json, evidence_json, created_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&f.id)
            .bind(&f.case_id)
            .bind(&f.title)
            .bind(&f.description)
            .bind(&f.severity)
            .bind(f.confidence)
            .bind(&f.engine)
            .bind(serde_json::to_string(&f.document_ids)?)
            .bind(serde_json::to_string(&f.entity_ids)?)
            .bind(f.evidence.as_ref().map(serde_json::to_string).transpose()?)
            .bind(f.created_at.map(|t| t.timestamp()))
            .execute(&self.pool)
            .await?;
        }

        for c in &bundle.contradictions {
            sqlx::query(
                "INSERT OR REPLACE INTO contradictions \
                 (id, case_id, title, description, severity, contradiction_type, confidence, \
                  source_a_document_id, source_a_entity_id, source_a_text, \
                  source_b_document_id, source_b_entity_id, source_b_text) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&c.id)
            .bind(&c.case_id)
            .bind(&c.title)
            .bind(&c.description)
            .bind(&c.severity)
            .bind(&c.contradiction_type)
            .bind(c.confidence)
            .bind(&c.source_a_document_id)
            .bind(&c.source_a_entity_id)
            .bind(&c.source_a_text)
            .bind(&c.source_b_document_id)
            .bind(&c.source_b_entity_id)
            .bind(&c.source_b_text)
            .execute(&self.pool)
            .await?;
        }

        for e in &bundle.entities {
            sqlx::query(
                "INSERT OR REPLACE INTO entities \
                 (id, case_id, canonical_name, entity_type, role, institution, mentions_json) \
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&e.id)
            .bind(&e.case_id)
            .bind(&e.canonical_name)
            .bind(&e.entity_type)
            .bind(&e.role)
            .bind(&e.institution)
            .bind(serde_json::to_string(&e.document_mentions)?)
            .execute(&self.pool)
            .await?;
        }

        for o in &bundle.omissions {
            sqlx::query(
                "INSERT OR REPLACE INTO omissions \
                 (id, case_id, title, description, severity, document_ids_json) \
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(&o.id)
            .bind(&o.case_id)
            .bind(&o.title)
            .bind(&o.description)
            .bind(&o.severity)
            .bind(serde_json::to_string(&o.document_ids)?)
            .execute(&self.pool)
            .await?;
        }

        Ok(())
    }

    async fn omissions(&self, case_id: &str) -> Result<Vec<Omission>> {
        let rows = sqlx::query(
            "SELECT id, case_id, title, description, severity, document_ids_json \
             FROM omissions WHERE case_id = ? ORDER BY id",
        )
        .bind(case_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| Omission {
                id: row.get("id"),
                case_id: row.get("case_id"),
                title: row.get("title"),
                description: row.get("description"),
                severity: row.get("severity"),
                document_ids: json_list(row.get("document_ids_json")),
            })
            .collect())
    }
}

#[async_trait]
impl DataLayer for SqliteStore {
    async fn case(&self, case_id: &str) -> Result<Option<CaseFile>> {
        let row = sqlx::query(
            "SELECT id, name, reference, description, created_at FROM cases WHERE id = ?",
        )
        .bind(case_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| CaseFile {
            id: row.get("id"),
            name: row.get("name"),
            reference: row.get("reference"),
            description: row.get("description"),
            created_at: ts_to_datetime(row.get("created_at")),
        }))
    }

    async fn documents(&self, case_id: &str) -> Result<Vec<SourceDocument>> {
        let rows = sqlx::query(
            "SELECT id, case_id, name, doc_type, doc_date, page_count, created_at \
             FROM documents WHERE case_id = ? ORDER BY name",
        )
        .bind(case_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| SourceDocument {
                id: row.get("id"),
                case_id: row.get("case_id"),
                name: row.get("name"),
                doc_type: row.get("doc_type"),
                doc_date: row.get("doc_date"),
                page_count: row.get::<Option<i64>, _>("page_count").map(|p| p as u32),
                created_at: row
                    .get::<Option<i64>, _>("created_at")
                    .map(ts_to_datetime),
            })
            .collect())
    }

    async fn findings(&self, case_id: &str) -> Result<Vec<Finding>> {
        let rows = sqlx::query(
            "SELECT id, case_id, title, description, severity, confidence, engine, \
                    document_ids_json, entity_ids_json, evidence_json, created_at \
             FROM findings WHERE case_id = ? ORDER BY created_at, id",
        )
        .bind(case_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| Finding {
                id: row.get("id"),
                case_id: row.get("case_id"),
                title: row.get("title"),
                description: row.get("description"),
                severity: row.get("severity"),
                confidence: row.get("confidence"),
                engine: row.get("engine"),
                document_ids: json_list(row.get("document_ids_json")),
                entity_ids: json_list(row.get("entity_ids_json")),
                evidence: row
                    .get::<Option<String>, _>("evidence_json")
                    .and_then(|s| serde_json::from_str(&s).ok()),
                created_at: row
                    .get::<Option<i64>, _>("created_at")
                    .map(ts_to_datetime),
            })
            .collect())
    }

    async fn contradictions(&self, case_id: &str) -> Result<Vec<Contradiction>> {
        let rows = sqlx::query(
            "SELECT id, case_id, title, description, severity, contradiction_type, confidence, \
                    source_a_document_id, source_a_entity_id, source_a_text, \
                    source_b_document_id, source_b_entity_id, source_b_text \
             FROM contradictions WHERE case_id = ? ORDER BY id",
        )
        .bind(case_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| Contradiction {
                id: row.get("id"),
                case_id: row.get("case_id"),
                title: row.get("title"),
                description: row.get("description"),
                severity: row.get("severity"),
                contradiction_type: row.get("contradiction_type"),
                confidence: row.get("confidence"),
                source_a_document_id: row.get("source_a_document_id"),
                source_a_entity_id: row.get("source_a_entity_id"),
                source_a_text: row.get("source_a_text"),
                source_b_document_id: row.get("source_b_document_id"),
                source_b_entity_id: row.get("source_b_entity_id"),
                source_b_text: row.get("source_b_text"),
            })
            .collect())
    }

    async fn entities(&self, case_id: &str) -> Result<Vec<Entity>> {
        let rows = sqlx::query(
            "SELECT id, case_id, canonical_name, entity_type, role, institution, mentions_json \
             FROM entities WHERE case_id = ? ORDER BY canonical_name",
        )
        .bind(case_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| Entity {
                id: row.get("id"),
                case_id: row.get("case_id"),
                canonical_name: row.get("canonical_name"),
                entity_type: row.get("entity_type"),
                role: row.get("role"),
                institution: row.get("institution"),
                document_mentions: row
                    .get::<Option<String>, _>("mentions_json")
                    .and_then(|s| serde_json::from_str(&s).ok())
                    .unwrap_or_default(),
            })
            .collect())
    }

    async fn analysis_bundle(&self, case_id: &str) -> Result<AnalysisBundle> {
        Ok(AnalysisBundle {
            findings: self.findings(case_id).await?,
            contradictions: self.contradictions(case_id).await?,
            omissions: self.omissions(case_id).await?,
        })
    }
}
