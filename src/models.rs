//! Core data models for the export pipeline.
//!
//! These are the raw analytic artifacts as produced upstream (detection
//! engines, entity resolution, document ingestion). The pipeline treats them
//! as an immutable snapshot for the duration of one export.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A case under analysis. Root of every export request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseFile {
    pub id: String,
    pub name: String,
    /// Law-firm internal case reference, if assigned.
    pub reference: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A source document belonging to a case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDocument {
    pub id: String,
    pub case_id: String,
    pub name: String,
    /// Document category ("contract", "deposition", "email", ...).
    pub doc_type: Option<String>,
    /// Document date as supplied upstream. Parsed tolerantly where a real
    /// date is needed; rendered verbatim in citations otherwise.
    pub doc_date: Option<String>,
    pub page_count: Option<u32>,
    pub created_at: Option<DateTime<Utc>>,
}

/// A single automated-analysis conclusion about case documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub id: String,
    pub case_id: String,
    pub title: String,
    pub description: String,
    pub severity: Option<String>,
    /// Confidence reported by the producing engine, 0..1.
    pub confidence: Option<f64>,
    /// Name of the analysis engine that produced this finding. Opaque here.
    pub engine: Option<String>,
    #[serde(default)]
    pub document_ids: Vec<String>,
    #[serde(default)]
    pub entity_ids: Vec<String>,
    /// Loosely-typed evidence payload: a JSON object, or a JSON string
    /// containing an object. See [`crate::evidence`].
    pub evidence: Option<serde_json::Value>,
    pub created_at: Option<DateTime<Utc>>,
}

/// A paired claim from two sources flagged as conflicting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contradiction {
    pub id: String,
    pub case_id: String,
    pub title: String,
    pub description: Option<String>,
    pub severity: Option<String>,
    pub contradiction_type: Option<String>,
    pub confidence: Option<f64>,
    pub source_a_document_id: Option<String>,
    pub source_a_entity_id: Option<String>,
    pub source_a_text: String,
    pub source_b_document_id: Option<String>,
    pub source_b_entity_id: Option<String>,
    pub source_b_text: String,
}

/// A mention of an entity inside one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityMention {
    pub document_id: String,
    pub mention_count: u32,
}

/// A resolved entity (person, organization, ...) referenced by the case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub case_id: String,
    pub canonical_name: String,
    pub entity_type: Option<String>,
    pub role: Option<String>,
    pub institution: Option<String>,
    #[serde(default)]
    pub document_mentions: Vec<EntityMention>,
}

/// Something expected in the record but absent, flagged upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Omission {
    pub id: String,
    pub case_id: String,
    pub title: String,
    pub description: String,
    pub severity: Option<String>,
    #[serde(default)]
    pub document_ids: Vec<String>,
}

/// Pre-aggregated analysis results fetched alongside the per-table queries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisBundle {
    #[serde(default)]
    pub findings: Vec<Finding>,
    #[serde(default)]
    pub contradictions: Vec<Contradiction>,
    #[serde(default)]
    pub omissions: Vec<Omission>,
}

/// Ordinal severity rank. Declaration order is ascending so the derived
/// `Ord` gives `Info < Low < Medium < High < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// All severities in report display order (most severe first).
    pub const DISPLAY_ORDER: [Severity; 5] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
        Severity::Info,
    ];

    /// Parse an optional upstream severity string. Absent or unrecognized
    /// values rank as `info`.
    pub fn parse(raw: Option<&str>) -> Severity {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("critical") => Severity::Critical,
            Some("high") => Severity::High,
            Some("medium") => Severity::Medium,
            Some("low") => Severity::Low,
            _ => Severity::Info,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
            Severity::Info => "info",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl Finding {
    pub fn severity_rank(&self) -> Severity {
        Severity::parse(self.severity.as_deref())
    }
}

impl Contradiction {
    pub fn severity_rank(&self) -> Severity {
        Severity::parse(self.severity.as_deref())
    }
}

/// A complete case bundle as accepted by `cbx import`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseBundle {
    pub case: CaseFile,
    #[serde(default)]
    pub documents: Vec<SourceDocument>,
    #[serde(default)]
    pub findings: Vec<Finding>,
    #[serde(default)]
    pub contradictions: Vec<Contradiction>,
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub omissions: Vec<Omission>,
}
