//! Document assembly.
//!
//! Two assemblers ([`docx`] and [`pdf`]) consume an identical
//! [`ExportData`](crate::transform::ExportData) + [`ReportOptions`] pair and
//! must produce semantically equivalent reports differing only in container
//! format. This module holds the shared structural contract: section
//! visibility, item caps, display truncation, grouping, and the generated
//! filename. Empty collections always render an explicit fallback line;
//! assemblers never panic on an empty case.

pub mod docx;
pub mod pdf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::citation::truncate_chars;
use crate::models::Severity;
use crate::transform::{ExportData, ExportFinding};

/// Finding descriptions are display-truncated to this length.
pub const MAX_DESCRIPTION_CHARS: usize = 500;
/// Supporting quotes shown per finding.
pub const MAX_QUOTES_PER_FINDING: usize = 2;
/// Citations shown per finding.
pub const MAX_CITATIONS_PER_FINDING: usize = 3;
/// Contradiction overview table cap.
pub const MAX_CONTRADICTIONS_OVERVIEW: usize = 20;
/// Contradiction detailed-breakdown cap.
pub const MAX_CONTRADICTIONS_DETAIL: usize = 10;
/// Quote text length in the contradiction overview table.
pub const OVERVIEW_TEXT_CHARS: usize = 120;
/// Document references shown per entity.
pub const MAX_ENTITY_DOC_REFS: usize = 5;
/// Audit trails rendered.
pub const MAX_AUDIT_TRAILS: usize = 10;

/// Stable section identifiers used by the visibility toggles.
pub const SECTION_COVER: &str = "cover";
pub const SECTION_TOC: &str = "toc";
pub const SECTION_SUMMARY: &str = "summary";
pub const SECTION_METHODOLOGY: &str = "methodology";
pub const SECTION_FINDINGS: &str = "findings";
pub const SECTION_CONTRADICTIONS: &str = "contradictions";
pub const SECTION_ENTITIES: &str = "entities";
pub const SECTION_AUDIT_TRAIL: &str = "audit_trail";
pub const SECTION_CITATIONS: &str = "citations";

/// Output container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Pdf,
    Docx,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Docx => "docx",
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pdf" => Ok(ExportFormat::Pdf),
            "docx" => Ok(ExportFormat::Docx),
            other => anyhow::bail!("unknown export format: '{}' (expected pdf or docx)", other),
        }
    }
}

/// One section-visibility toggle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionToggle {
    pub id: String,
    pub included: bool,
}

/// Per-request report options. Filters plus presentation flags; see the
/// config-file defaults in [`crate::config::ReportDefaults`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportOptions {
    pub min_severity: Severity,
    #[serde(default)]
    pub engines: Vec<String>,
    pub max_findings: usize,
    pub include_audit_trails: bool,
    pub include_methodology: bool,
    pub include_table_of_contents: bool,
    pub include_page_numbers: bool,
    pub include_timestamp: bool,
    /// Visibility toggles; sections not listed default to included. Render
    /// order is fixed regardless of toggle order.
    #[serde(default)]
    pub sections: Vec<SectionToggle>,
    pub custom_title: Option<String>,
    pub custom_subtitle: Option<String>,
    pub author_name: Option<String>,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            min_severity: Severity::Info,
            engines: Vec::new(),
            max_findings: usize::MAX,
            include_audit_trails: true,
            include_methodology: true,
            include_table_of_contents: true,
            include_page_numbers: true,
            include_timestamp: true,
            sections: Vec::new(),
            custom_title: None,
            custom_subtitle: None,
            author_name: None,
        }
    }
}

impl ReportOptions {
    /// Section visibility: explicit toggle wins, otherwise included.
    pub fn section_enabled(&self, id: &str) -> bool {
        self.sections
            .iter()
            .find(|t| t.id == id)
            .map(|t| t.included)
            .unwrap_or(true)
    }

    pub fn filters(&self) -> crate::transform::FindingFilters {
        crate::transform::FindingFilters {
            min_severity: self.min_severity,
            engines: self.engines.clone(),
            max_findings: self.max_findings,
        }
    }
}

/// Report title: custom override, else the case name.
pub fn report_title(data: &ExportData, options: &ReportOptions) -> String {
    options
        .custom_title
        .clone()
        .unwrap_or_else(|| format!("Evidence Export — {}", data.case.name))
}

/// Report subtitle: custom override, else the case reference when present.
pub fn report_subtitle(data: &ExportData, options: &ReportOptions) -> Option<String> {
    options.custom_subtitle.clone().or_else(|| {
        data.case
            .reference
            .as_ref()
            .map(|r| format!("Case Reference {}", r))
    })
}

/// Generated artifact filename: `evidence-export-<caseId>-<ISO-date>.<ext>`.
pub fn export_filename(case_id: &str, format: ExportFormat) -> String {
    format!(
        "evidence-export-{}-{}.{}",
        case_id,
        chrono::Utc::now().format("%Y-%m-%d"),
        format.extension()
    )
}

/// Findings grouped by severity in the fixed display order. Empty buckets
/// are omitted.
pub fn group_by_severity(findings: &[ExportFinding]) -> Vec<(Severity, Vec<&ExportFinding>)> {
    Severity::DISPLAY_ORDER
        .iter()
        .filter_map(|&severity| {
            let group: Vec<&ExportFinding> =
                findings.iter().filter(|f| f.severity == severity).collect();
            if group.is_empty() {
                None
            } else {
                Some((severity, group))
            }
        })
        .collect()
}

/// Display form of an optional confidence: `87%` or `n/a`.
pub fn confidence_pct(confidence: Option<f64>) -> String {
    match confidence {
        Some(c) => format!("{:.0}%", c * 100.0),
        None => "n/a".to_string(),
    }
}

/// Display truncation for finding descriptions.
pub fn display_description(description: &str) -> String {
    truncate_chars(description, MAX_DESCRIPTION_CHARS).0
}

/// Display truncation for contradiction overview cells.
pub fn overview_text(text: &str) -> String {
    truncate_chars(text, OVERVIEW_TEXT_CHARS).0
}

/// Fallback line when a section has nothing to show.
pub fn none_available(what: &str) -> String {
    format!("No {} available for this case.", what)
}

/// Render the aggregate with the assembler matching its metadata format.
pub fn assemble(data: &ExportData, options: &ReportOptions) -> Result<Vec<u8>> {
    match data.metadata.format {
        ExportFormat::Pdf => pdf::assemble(data, options),
        ExportFormat::Docx => docx::assemble(data, options),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_toggles_default_to_included() {
        let mut options = ReportOptions::default();
        assert!(options.section_enabled(SECTION_COVER));

        options.sections.push(SectionToggle {
            id: SECTION_COVER.to_string(),
            included: false,
        });
        assert!(!options.section_enabled(SECTION_COVER));
        assert!(options.section_enabled(SECTION_FINDINGS));
    }

    #[test]
    fn filename_follows_pattern() {
        let name = export_filename("case-42", ExportFormat::Pdf);
        assert!(name.starts_with("evidence-export-case-42-"));
        assert!(name.ends_with(".pdf"));
    }

    #[test]
    fn confidence_display() {
        assert_eq!(confidence_pct(Some(0.874)), "87%");
        assert_eq!(confidence_pct(None), "n/a");
    }
}
