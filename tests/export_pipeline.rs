//! End-to-end pipeline scenarios over the in-memory data layer.

use std::io::Read;

use chrono::Utc;
use serde_json::json;

use casebinder::audit::StepType;
use casebinder::export::run_export;
use casebinder::models::{
    CaseBundle, CaseFile, Contradiction, Entity, EntityMention, Finding, SourceDocument,
};
use casebinder::render::{ExportFormat, ReportOptions};
use casebinder::store::memory::MemoryStore;

const SEVERITY_CYCLE: [&str; 5] = ["critical", "high", "medium", "low", "info"];

fn case_file(id: &str) -> CaseFile {
    CaseFile {
        id: id.to_string(),
        name: "Doe v. Acme Corp".to_string(),
        reference: Some("ACM-2024-117".to_string()),
        description: Some("Wrongful termination".to_string()),
        created_at: Utc::now(),
    }
}

fn document(id: &str, name: &str, doc_type: &str) -> SourceDocument {
    SourceDocument {
        id: id.to_string(),
        case_id: "case-1".to_string(),
        name: name.to_string(),
        doc_type: Some(doc_type.to_string()),
        doc_date: Some("2021-06-15".to_string()),
        page_count: Some(24),
        created_at: Some(Utc::now()),
    }
}

fn finding(idx: usize, severity: &str) -> Finding {
    Finding {
        id: format!("finding-{}", idx),
        case_id: "case-1".to_string(),
        title: format!("Finding {}", idx),
        description: "Automated analysis surfaced an inconsistency in the record.".to_string(),
        severity: Some(severity.to_string()),
        confidence: Some(0.8),
        engine: Some("timeline_analysis".to_string()),
        document_ids: vec!["doc-1".to_string()],
        entity_ids: vec!["entity-1".to_string()],
        evidence: Some(json!({
            "quotes": ["the shipment left the warehouse on the 4th"],
            "document_references": [{"document_id": "doc-1", "page_number": 7}]
        })),
        created_at: Some(Utc::now()),
    }
}

fn contradiction(idx: usize, severity: &str) -> Contradiction {
    Contradiction {
        id: format!("contra-{}", idx),
        case_id: "case-1".to_string(),
        title: format!("Contradiction {}", idx),
        description: Some("Two sources disagree.".to_string()),
        severity: Some(severity.to_string()),
        contradiction_type: Some("temporal".to_string()),
        confidence: None,
        source_a_document_id: Some("doc-1".to_string()),
        source_a_entity_id: Some("entity-1".to_string()),
        source_a_text: "I signed the agreement on March 3rd".to_string(),
        source_b_document_id: Some("doc-2".to_string()),
        source_b_entity_id: None,
        source_b_text: "The agreement was unsigned as of March 10th".to_string(),
    }
}

fn standard_bundle() -> CaseBundle {
    let findings = (0..25)
        .map(|i| finding(i, SEVERITY_CYCLE[i % 5]))
        .collect();
    let contradictions = ["critical", "critical", "high", "high", "medium"]
        .iter()
        .enumerate()
        .map(|(i, s)| contradiction(i, s))
        .collect();

    CaseBundle {
        case: case_file("case-1"),
        documents: vec![
            document("doc-1", "Employment Agreement", "contract"),
            document("doc-2", "Deposition of J. Doe", "deposition"),
        ],
        findings,
        contradictions,
        entities: vec![Entity {
            id: "entity-1".to_string(),
            case_id: "case-1".to_string(),
            canonical_name: "Jane Doe".to_string(),
            entity_type: Some("person".to_string()),
            role: Some("plaintiff".to_string()),
            institution: None,
            document_mentions: vec![EntityMention {
                document_id: "doc-1".to_string(),
                mention_count: 14,
            }],
        }],
        omissions: vec![],
    }
}

fn store_with(bundle: CaseBundle) -> MemoryStore {
    let store = MemoryStore::new();
    store.load_bundle(bundle);
    store
}

#[tokio::test]
async fn full_export_summary_counts() {
    let store = store_with(standard_bundle());
    let options = ReportOptions::default();

    let outcome = run_export(&store, "case-1", ExportFormat::Pdf, &options).await;
    assert!(outcome.success, "export failed: {:?}", outcome.error);

    let data = outcome.data.expect("data present on success");
    assert_eq!(data.summary.finding_count, 25);
    assert_eq!(data.summary.contradiction_count, 5);

    let severity_total: usize = data.summary.findings_by_severity.values().sum();
    assert_eq!(severity_total, 25);
    assert_eq!(data.summary.findings_by_severity["critical"], 5);
    assert_eq!(data.summary.findings_by_severity["high"], 5);
    assert_eq!(data.summary.findings_by_severity["medium"], 5);
}

#[tokio::test]
async fn pdf_blob_starts_with_pdf_header() {
    let store = store_with(standard_bundle());
    let outcome = run_export(&store, "case-1", ExportFormat::Pdf, &ReportOptions::default()).await;
    assert!(outcome.success);

    let blob = outcome.blob.unwrap();
    assert!(blob.starts_with(b"%PDF-"), "missing PDF header");
    assert!(outcome.filename.starts_with("evidence-export-case-1-"));
    assert!(outcome.filename.ends_with(".pdf"));
    assert!(outcome.checksum_sha256.is_some());
}

#[tokio::test]
async fn docx_blob_is_a_zip_with_document_part() {
    let store = store_with(standard_bundle());
    let outcome =
        run_export(&store, "case-1", ExportFormat::Docx, &ReportOptions::default()).await;
    assert!(outcome.success);

    let blob = outcome.blob.unwrap();
    assert_eq!(&blob[..4], &[0x50, 0x4b, 0x03, 0x04], "missing ZIP signature");

    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(blob.as_slice())).unwrap();
    let mut document_xml = String::new();
    archive
        .by_name("word/document.xml")
        .unwrap()
        .read_to_string(&mut document_xml)
        .unwrap();

    assert!(document_xml.contains("Executive Summary"));
    assert!(document_xml.contains("Contradictions"));
    assert!(document_xml.contains("Citations"));
    assert!(document_xml.contains("Jane Doe"));
}

#[tokio::test]
async fn empty_case_fails_with_no_evidence() {
    let mut bundle = standard_bundle();
    bundle.findings.clear();
    bundle.contradictions.clear();
    let store = store_with(bundle);

    let outcome = run_export(&store, "case-1", ExportFormat::Pdf, &ReportOptions::default()).await;
    assert!(!outcome.success);
    assert!(outcome.blob.is_none());
    assert_eq!(outcome.error_kind, Some("no_evidence_available"));
}

#[tokio::test]
async fn unknown_case_fails_with_case_not_found() {
    let store = MemoryStore::new();
    let outcome =
        run_export(&store, "case-missing", ExportFormat::Docx, &ReportOptions::default()).await;
    assert!(!outcome.success);
    assert!(outcome.blob.is_none());
    assert_eq!(outcome.error_kind, Some("case_not_found"));
}

#[tokio::test]
async fn finding_without_documents_still_gets_a_trail() {
    let mut bundle = standard_bundle();
    bundle.findings = vec![Finding {
        document_ids: vec![],
        evidence: None,
        ..finding(0, "high")
    }];
    bundle.contradictions.clear();
    let store = store_with(bundle);

    let outcome = run_export(&store, "case-1", ExportFormat::Pdf, &ReportOptions::default()).await;
    assert!(outcome.success);

    let data = outcome.data.unwrap();
    assert_eq!(data.audit_trails.len(), 1);
    let types: Vec<StepType> = data.audit_trails[0]
        .steps
        .iter()
        .map(|s| s.step_type)
        .collect();
    assert_eq!(
        types,
        vec![StepType::AnalysisPerformed, StepType::ConclusionReached]
    );
}

#[tokio::test]
async fn severity_and_cap_filters_shape_the_report() {
    let store = store_with(standard_bundle());
    let options = ReportOptions {
        min_severity: casebinder::models::Severity::High,
        max_findings: 7,
        ..Default::default()
    };

    let outcome = run_export(&store, "case-1", ExportFormat::Pdf, &options).await;
    let data = outcome.data.unwrap();

    // 10 findings survive the floor (5 critical + 5 high); the cap trims to 7.
    assert_eq!(data.findings.len(), 7);
    assert!(data
        .findings
        .iter()
        .all(|f| f.severity >= casebinder::models::Severity::High));
    assert_eq!(data.summary.finding_count, 7);

    // Entities still derive from the unfiltered sets.
    assert_eq!(data.entities.len(), 1);
    assert_eq!(data.entities[0].related_finding_ids.len(), 25);
}

#[tokio::test]
async fn citations_are_deduplicated_by_document() {
    let store = store_with(standard_bundle());
    let outcome = run_export(&store, "case-1", ExportFormat::Pdf, &ReportOptions::default()).await;
    let data = outcome.data.unwrap();

    // 25 findings all cite doc-1; the references list collapses to one entry.
    assert_eq!(data.citations.len(), 1);
    assert_eq!(data.citations[0].document_id, "doc-1");
}

#[tokio::test]
async fn repeated_generation_is_stable() {
    let store = store_with(standard_bundle());
    let options = ReportOptions::default();

    let first = run_export(&store, "case-1", ExportFormat::Docx, &options).await;
    let second = run_export(&store, "case-1", ExportFormat::Docx, &options).await;
    assert!(first.success && second.success);

    let a = first.blob.unwrap();
    let b = second.blob.unwrap();
    // Timestamps and step ids differ; sizes must stay within a small band.
    let delta = (a.len() as i64 - b.len() as i64).abs();
    assert!(delta < 2048, "blob sizes diverged by {} bytes", delta);

    let data_a = first.data.unwrap();
    let data_b = second.data.unwrap();
    assert_eq!(data_a.findings.len(), data_b.findings.len());
    assert_eq!(data_a.contradictions.len(), data_b.contradictions.len());
    assert_eq!(data_a.citations.len(), data_b.citations.len());
    assert_eq!(data_a.audit_trails.len(), data_b.audit_trails.len());
}

#[tokio::test]
async fn disabled_sections_drop_content() {
    let store = store_with(standard_bundle());
    let options = ReportOptions {
        include_audit_trails: false,
        include_methodology: false,
        ..Default::default()
    };

    let outcome = run_export(&store, "case-1", ExportFormat::Docx, &options).await;
    let blob = outcome.blob.unwrap();
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(blob.as_slice())).unwrap();
    let mut document_xml = String::new();
    archive
        .by_name("word/document.xml")
        .unwrap()
        .read_to_string(&mut document_xml)
        .unwrap();

    assert!(!document_xml.contains("Methodology"));
    assert!(!document_xml.contains("Audit Trail"));
    assert!(document_xml.contains("Findings"));
}
