//! Executive summary aggregation.
//!
//! Pure counting over the *filtered* result set: per-severity and per-engine
//! histograms plus headline counts. Engines outside the known set land in an
//! `other` bucket so the engine histogram always sums to the finding count.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::{CaseFile, Contradiction, Entity, Finding, Severity, SourceDocument};

/// Engines with a dedicated histogram bucket. Anything else counts under
/// [`OTHER_ENGINE_BUCKET`].
pub const KNOWN_ENGINES: [&str; 5] = [
    "timeline_analysis",
    "contradiction_detection",
    "entity_resolution",
    "omission_scan",
    "document_comparison",
];

pub const OTHER_ENGINE_BUCKET: &str = "other";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportSummary {
    pub case_reference: Option<String>,
    pub case_name: String,
    pub generated_at: DateTime<Utc>,
    pub document_count: usize,
    pub finding_count: usize,
    pub contradiction_count: usize,
    pub entity_count: usize,
    /// All five severity buckets always present, zero-filled.
    pub findings_by_severity: BTreeMap<String, usize>,
    /// Known engines plus the `other` bucket; sums to `finding_count`.
    pub findings_by_engine: BTreeMap<String, usize>,
}

/// Aggregate the filtered sets into the executive summary.
pub fn calculate(
    case: &CaseFile,
    documents: &[SourceDocument],
    findings: &[Finding],
    contradictions: &[Contradiction],
    entities: &[Entity],
) -> ExportSummary {
    let mut findings_by_severity: BTreeMap<String, usize> = Severity::DISPLAY_ORDER
        .iter()
        .map(|s| (s.label().to_string(), 0))
        .collect();
    for finding in findings {
        *findings_by_severity
            .entry(finding.severity_rank().label().to_string())
            .or_insert(0) += 1;
    }

    let mut findings_by_engine: BTreeMap<String, usize> = BTreeMap::new();
    for finding in findings {
        let engine = finding.engine.as_deref().unwrap_or(OTHER_ENGINE_BUCKET);
        let bucket = if KNOWN_ENGINES.contains(&engine) {
            engine
        } else {
            OTHER_ENGINE_BUCKET
        };
        *findings_by_engine.entry(bucket.to_string()).or_insert(0) += 1;
    }

    ExportSummary {
        case_reference: case.reference.clone(),
        case_name: case.name.clone(),
        generated_at: Utc::now(),
        document_count: documents.len(),
        finding_count: findings.len(),
        contradiction_count: contradictions.len(),
        entity_count: entities.len(),
        findings_by_severity,
        findings_by_engine,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case() -> CaseFile {
        CaseFile {
            id: "case-1".to_string(),
            name: "Doe v. Acme".to_string(),
            reference: Some("ACM-2024-117".to_string()),
            description: None,
            created_at: Utc::now(),
        }
    }

    fn finding(severity: Option<&str>, engine: Option<&str>) -> Finding {
        Finding {
            id: "f".to_string(),
            case_id: "case-1".to_string(),
            title: "t".to_string(),
            description: "d".to_string(),
            severity: severity.map(String::from),
            confidence: None,
            engine: engine.map(String::from),
            document_ids: vec![],
            entity_ids: vec![],
            evidence: None,
            created_at: None,
        }
    }

    #[test]
    fn severity_histogram_is_zero_filled_and_sums() {
        let findings = vec![
            finding(Some("critical"), Some("timeline_analysis")),
            finding(Some("high"), Some("timeline_analysis")),
            finding(None, Some("timeline_analysis")),
        ];
        let summary = calculate(&case(), &[], &findings, &[], &[]);

        assert_eq!(summary.findings_by_severity.len(), 5);
        assert_eq!(summary.findings_by_severity["critical"], 1);
        assert_eq!(summary.findings_by_severity["high"], 1);
        assert_eq!(summary.findings_by_severity["info"], 1);
        assert_eq!(summary.findings_by_severity["medium"], 0);
        let total: usize = summary.findings_by_severity.values().sum();
        assert_eq!(total, summary.finding_count);
    }

    #[test]
    fn unknown_engines_land_in_other_bucket() {
        let findings = vec![
            finding(None, Some("timeline_analysis")),
            finding(None, Some("bespoke_llm_pass")),
            finding(None, None),
        ];
        let summary = calculate(&case(), &[], &findings, &[], &[]);

        assert_eq!(summary.findings_by_engine["timeline_analysis"], 1);
        assert_eq!(summary.findings_by_engine[OTHER_ENGINE_BUCKET], 2);
        let total: usize = summary.findings_by_engine.values().sum();
        assert_eq!(total, summary.finding_count);
    }

    #[test]
    fn headline_counts_reflect_inputs() {
        let summary = calculate(&case(), &[], &[], &[], &[]);
        assert_eq!(summary.finding_count, 0);
        assert_eq!(summary.contradiction_count, 0);
        assert_eq!(summary.case_name, "Doe v. Acme");
    }
}
