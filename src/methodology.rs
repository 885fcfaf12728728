//! Methodology statement synthesis.
//!
//! Describes the data sources and analysis methods *actually present* in the
//! fetched population; nothing is asserted that the data does not show. The
//! only static parts are the limitations list and the confidence-band
//! explanation, kept for legal-defensibility completeness.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::{Finding, SourceDocument};

const METHODOLOGY_VERSION: &str = "1.2";

const CONFIDENCE_EXPLANATION: &str = "Confidence scores range from 0.0 to 1.0. Scores above 0.8 \
indicate strong corroboration across sources; 0.5 to 0.8 indicates partial corroboration; scores \
below 0.5 indicate single-source or weakly corroborated conclusions. Aggregate trail confidence \
weights the terminal conclusion double relative to intermediate reasoning steps.";

const LIMITATIONS: [&str; 4] = [
    "Automated analysis supplements, and does not replace, attorney review of the underlying record.",
    "Findings reflect only documents ingested at the time of export; later-produced material is not considered.",
    "Optical character recognition and transcription errors in source documents may affect extracted quotes.",
    "Confidence scores are calibrated per engine and are not comparable across unrelated engines.",
];

/// Count and date range for one document type actually present in the case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSourceGroup {
    pub doc_type: String,
    pub count: usize,
    pub earliest: Option<String>,
    pub latest: Option<String>,
}

/// One analysis engine actually observed in the finding population.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisMethod {
    pub engine: String,
    pub finding_count: usize,
}

/// Derived, non-persisted description of sources and methods.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodologyStatement {
    pub data_sources: Vec<DataSourceGroup>,
    pub analysis_methods: Vec<AnalysisMethod>,
    pub confidence_explanation: String,
    pub limitations: Vec<String>,
    pub version: String,
    pub last_updated: chrono::DateTime<Utc>,
}

/// Parse an upstream document date tolerantly. `%Y-%m-%d` first, then
/// RFC 3339; anything else is ignored for range purposes.
fn parse_doc_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            chrono::DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.date_naive())
        })
}

/// Synthesize the methodology statement over the *pre-filter* populations.
pub fn synthesize(documents: &[SourceDocument], findings: &[Finding]) -> MethodologyStatement {
    // Group documents by type; BTreeMap keeps output order deterministic.
    let mut by_type: BTreeMap<String, Vec<&SourceDocument>> = BTreeMap::new();
    for document in documents {
        let key = document
            .doc_type
            .clone()
            .unwrap_or_else(|| "uncategorized".to_string());
        by_type.entry(key).or_default().push(document);
    }

    let data_sources = by_type
        .into_iter()
        .map(|(doc_type, docs)| {
            let mut dates: Vec<NaiveDate> = docs
                .iter()
                .filter_map(|d| d.doc_date.as_deref().and_then(parse_doc_date))
                .collect();
            dates.sort();
            DataSourceGroup {
                doc_type,
                count: docs.len(),
                earliest: dates.first().map(|d| d.format("%Y-%m-%d").to_string()),
                latest: dates.last().map(|d| d.format("%Y-%m-%d").to_string()),
            }
        })
        .collect();

    let mut by_engine: BTreeMap<String, usize> = BTreeMap::new();
    for finding in findings {
        let key = finding
            .engine
            .clone()
            .unwrap_or_else(|| "unknown".to_string());
        *by_engine.entry(key).or_insert(0) += 1;
    }
    let analysis_methods = by_engine
        .into_iter()
        .map(|(engine, finding_count)| AnalysisMethod {
            engine,
            finding_count,
        })
        .collect();

    MethodologyStatement {
        data_sources,
        analysis_methods,
        confidence_explanation: CONFIDENCE_EXPLANATION.to_string(),
        limitations: LIMITATIONS.iter().map(|s| s.to_string()).collect(),
        version: METHODOLOGY_VERSION.to_string(),
        last_updated: Utc::now(),
    }
}
