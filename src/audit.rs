//! Audit trail construction.
//!
//! Every finding and contradiction in an export can carry a reasoning chain:
//! an ordered list of typed steps from source identification through evidence
//! extraction and analysis to a stated conclusion. Steps link backwards by id
//! only (a directed acyclic chain), and the trail carries an aggregate
//! confidence weighted toward the terminal conclusion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::citation::{format_quote, DocumentQuote};
use crate::evidence::EvidencePayload;
use crate::models::{Contradiction, Finding, Severity};
use crate::transform::LookupContext;

/// Source-identification and evidence-extraction steps state facts rather
/// than inferences, so their confidence is pinned.
const FACTUAL_STEP_CONFIDENCE: f64 = 1.0;
/// Contradiction detection and verification run without a per-item engine
/// confidence; this fixed value reflects the detector's calibration.
const CONTRADICTION_STEP_CONFIDENCE: f64 = 0.85;
/// The terminal conclusion counts double in the aggregate.
const CONCLUSION_WEIGHT: f64 = 2.0;

/// The type of a reasoning step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    SourceIdentification,
    EvidenceExtraction,
    AnalysisPerformed,
    ContradictionDetected,
    ConclusionReached,
    VerificationStep,
}

impl StepType {
    pub fn label(&self) -> &'static str {
        match self {
            StepType::SourceIdentification => "Source Identification",
            StepType::EvidenceExtraction => "Evidence Extraction",
            StepType::AnalysisPerformed => "Analysis Performed",
            StepType::ContradictionDetected => "Contradiction Detected",
            StepType::ConclusionReached => "Conclusion Reached",
            StepType::VerificationStep => "Verification",
        }
    }
}

/// One step in a reasoning chain. Ids are unique and immutable once
/// assigned; `previous_step_ids` may only reference steps created earlier in
/// the same chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditTrailStep {
    pub id: String,
    pub step_type: StepType,
    pub timestamp: DateTime<Utc>,
    pub description: String,
    pub document_ids: Vec<String>,
    pub entity_ids: Vec<String>,
    pub engine: Option<String>,
    pub confidence: Option<f64>,
    pub quotes: Vec<DocumentQuote>,
    pub previous_step_ids: Vec<String>,
}

/// A completed reasoning chain. Built once, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditTrail {
    /// Id of the finding or contradiction this trail explains.
    pub subject_id: String,
    pub steps: Vec<AuditTrailStep>,
    pub summary: String,
    pub overall_confidence: f64,
}

fn new_step(
    step_type: StepType,
    description: String,
    confidence: Option<f64>,
    previous_step_ids: Vec<String>,
) -> AuditTrailStep {
    AuditTrailStep {
        id: Uuid::new_v4().to_string(),
        step_type,
        timestamp: Utc::now(),
        description,
        document_ids: Vec::new(),
        entity_ids: Vec::new(),
        engine: None,
        confidence,
        quotes: Vec::new(),
        previous_step_ids,
    }
}

/// Aggregate step confidences into a single trail confidence.
///
/// Weighted mean over the steps with a non-null confidence: weight 2 for
/// `conclusion_reached`, weight 1 otherwise. An empty set yields 0. The bias
/// toward the terminal conclusion is deliberate; upstream evidence quality
/// still moves the result.
pub fn overall_confidence(steps: &[AuditTrailStep]) -> f64 {
    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;
    for step in steps {
        if let Some(confidence) = step.confidence {
            let weight = if step.step_type == StepType::ConclusionReached {
                CONCLUSION_WEIGHT
            } else {
                1.0
            };
            weighted_sum += confidence * weight;
            weight_total += weight;
        }
    }
    if weight_total == 0.0 {
        0.0
    } else {
        weighted_sum / weight_total
    }
}

/// Build the reasoning chain for a finding.
///
/// Chain shape: one `source_identification` per resolvable document, one
/// `evidence_extraction` per document that has quoted text, exactly one
/// `analysis_performed`, and a terminal `conclusion_reached`. A finding with
/// no documents still yields the analysis/conclusion pair; a finding whose
/// evidence parses to zero quotes gets no extraction steps at all.
pub fn build_finding_trail(finding: &Finding, context: &LookupContext) -> AuditTrail {
    let payload = EvidencePayload::parse(finding.evidence.as_ref());
    let mut steps: Vec<AuditTrailStep> = Vec::new();

    // One source step per document the finding cites, unresolved ids skipped.
    let mut source_step_ids: Vec<(String, String)> = Vec::new();
    for doc_id in &finding.document_ids {
        let Some(document) = context.document(doc_id) else {
            continue;
        };
        let mut step = new_step(
            StepType::SourceIdentification,
            format!(
                "Identified source document '{}'{}",
                document.name,
                document
                    .doc_type
                    .as_deref()
                    .map(|t| format!(" ({})", t))
                    .unwrap_or_default()
            ),
            Some(FACTUAL_STEP_CONFIDENCE),
            Vec::new(),
        );
        step.document_ids.push(doc_id.clone());
        source_step_ids.push((doc_id.clone(), step.id.clone()));
        steps.push(step);
    }

    // Extraction steps only exist when at least one quote parsed.
    let mut extraction_step_ids: Vec<String> = Vec::new();
    if !payload.quotes.is_empty() {
        for (doc_id, source_id) in &source_step_ids {
            let document = match context.document(doc_id) {
                Some(d) => d,
                None => continue,
            };
            let page = payload.page_for(doc_id);
            let citation = crate::citation::format_citation(document, page);
            let mut step = new_step(
                StepType::EvidenceExtraction,
                format!(
                    "Extracted {} quoted passage(s) from '{}'",
                    payload.quotes.len(),
                    document.name
                ),
                Some(FACTUAL_STEP_CONFIDENCE),
                vec![source_id.clone()],
            );
            step.document_ids.push(doc_id.clone());
            step.quotes = payload
                .quotes
                .iter()
                .map(|q| format_quote(q, citation.clone(), page))
                .collect();
            extraction_step_ids.push(step.id.clone());
            steps.push(step);
        }
    }

    // Exactly one analysis step. Links to extraction when present, else to
    // the source steps, else stands alone.
    let engine = finding.engine.clone().unwrap_or_else(|| "unknown".to_string());
    let analysis_previous = if !extraction_step_ids.is_empty() {
        extraction_step_ids.clone()
    } else {
        source_step_ids.iter().map(|(_, id)| id.clone()).collect()
    };
    let mut analysis = new_step(
        StepType::AnalysisPerformed,
        format!("Evidence processed by the '{}' analysis engine", engine),
        finding.confidence,
        analysis_previous,
    );
    analysis.engine = finding.engine.clone();
    analysis.entity_ids = finding.entity_ids.clone();
    let analysis_id = analysis.id.clone();
    steps.push(analysis);

    let mut conclusion = new_step(
        StepType::ConclusionReached,
        format!("{}: {}", finding.title, finding.description),
        finding.confidence,
        vec![analysis_id],
    );
    conclusion.engine = finding.engine.clone();
    steps.push(conclusion);

    let confidence = overall_confidence(&steps);
    let summary = format!(
        "Conclusion '{}' reached with {:.0}% confidence from {} source document(s) and {} quoted passage(s).",
        finding.title,
        confidence * 100.0,
        source_step_ids.len(),
        payload.quotes.len(),
    );

    AuditTrail {
        subject_id: finding.id.clone(),
        steps,
        summary,
        overall_confidence: confidence,
    }
}

/// Build the reasoning chain for a contradiction.
///
/// Chain shape: `source_identification` per resolvable side, then a
/// `contradiction_detected` step carrying both conflicting quotes, then a
/// `verification_step` whose description embeds severity and type tags in
/// bracketed uppercase form.
pub fn build_contradiction_trail(
    contradiction: &Contradiction,
    context: &LookupContext,
) -> AuditTrail {
    let mut steps: Vec<AuditTrailStep> = Vec::new();
    let mut source_ids: Vec<String> = Vec::new();

    for (label, doc_id) in [
        ("Source A", contradiction.source_a_document_id.as_deref()),
        ("Source B", contradiction.source_b_document_id.as_deref()),
    ] {
        let Some(doc_id) = doc_id else { continue };
        let Some(document) = context.document(doc_id) else {
            continue;
        };
        let mut step = new_step(
            StepType::SourceIdentification,
            format!("Identified {} document '{}'", label, document.name),
            Some(FACTUAL_STEP_CONFIDENCE),
            Vec::new(),
        );
        step.document_ids.push(doc_id.to_string());
        source_ids.push(step.id.clone());
        steps.push(step);
    }

    // Both quotes are built unconditionally; a missing document degrades to
    // a placeholder citation on its side.
    let quote_a = context.quote_or_placeholder(
        &contradiction.source_a_text,
        contradiction.source_a_document_id.as_deref(),
        "Source A",
    );
    let quote_b = context.quote_or_placeholder(
        &contradiction.source_b_text,
        contradiction.source_b_document_id.as_deref(),
        "Source B",
    );

    let mut detected = new_step(
        StepType::ContradictionDetected,
        format!(
            "Conflicting statements detected: \"{}\" versus \"{}\"",
            quote_a.text, quote_b.text
        ),
        Some(CONTRADICTION_STEP_CONFIDENCE),
        source_ids,
    );
    detected.quotes = vec![quote_a, quote_b];
    detected.document_ids = [
        contradiction.source_a_document_id.clone(),
        contradiction.source_b_document_id.clone(),
    ]
    .into_iter()
    .flatten()
    .collect();
    let detected_id = detected.id.clone();
    steps.push(detected);

    let severity = Severity::parse(contradiction.severity.as_deref());
    let type_tag = contradiction
        .contradiction_type
        .as_deref()
        .map(|t| format!(" [{}]", t.to_uppercase()))
        .unwrap_or_default();
    let verification = new_step(
        StepType::VerificationStep,
        format!(
            "[{}]{} Contradiction '{}' verified against both source records",
            severity.label().to_uppercase(),
            type_tag,
            contradiction.title
        ),
        Some(CONTRADICTION_STEP_CONFIDENCE),
        vec![detected_id],
    );
    steps.push(verification);

    let confidence = overall_confidence(&steps);
    let summary = format!(
        "Contradiction '{}' detected and verified with {:.0}% confidence.",
        contradiction.title,
        confidence * 100.0,
    );

    AuditTrail {
        subject_id: contradiction.id.clone(),
        steps,
        summary,
        overall_confidence: confidence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceDocument;
    use serde_json::json;

    fn document(id: &str, name: &str) -> SourceDocument {
        SourceDocument {
            id: id.to_string(),
            case_id: "case-1".to_string(),
            name: name.to_string(),
            doc_type: Some("deposition".to_string()),
            doc_date: Some("2021-03-04".to_string()),
            page_count: None,
            created_at: None,
        }
    }

    fn finding(document_ids: Vec<String>, evidence: Option<serde_json::Value>) -> Finding {
        Finding {
            id: "finding-1".to_string(),
            case_id: "case-1".to_string(),
            title: "Date discrepancy".to_string(),
            description: "Filing date precedes signature date".to_string(),
            severity: Some("high".to_string()),
            confidence: Some(0.9),
            engine: Some("timeline_analysis".to_string()),
            document_ids,
            entity_ids: vec![],
            evidence,
            created_at: None,
        }
    }

    fn context_with_docs(docs: Vec<SourceDocument>) -> LookupContext {
        LookupContext::new(&docs, &[])
    }

    #[test]
    fn weighted_mean_doubles_conclusion_contribution() {
        let steps = vec![
            new_step(StepType::AnalysisPerformed, "a".into(), Some(0.5), vec![]),
            new_step(StepType::ConclusionReached, "c".into(), Some(1.0), vec![]),
        ];
        let result = overall_confidence(&steps);
        assert!((result - 0.8333).abs() < 0.001, "got {}", result);
    }

    #[test]
    fn confidence_is_zero_for_empty_and_all_null() {
        assert_eq!(overall_confidence(&[]), 0.0);
        let steps = vec![new_step(StepType::AnalysisPerformed, "a".into(), None, vec![])];
        assert_eq!(overall_confidence(&steps), 0.0);
    }

    #[test]
    fn confidence_stays_in_unit_interval() {
        let steps = vec![
            new_step(StepType::SourceIdentification, "s".into(), Some(1.0), vec![]),
            new_step(StepType::AnalysisPerformed, "a".into(), Some(0.2), vec![]),
            new_step(StepType::ConclusionReached, "c".into(), Some(0.7), vec![]),
        ];
        let result = overall_confidence(&steps);
        assert!((0.0..=1.0).contains(&result));
    }

    #[test]
    fn finding_trail_links_steps_in_order() {
        let context = context_with_docs(vec![document("doc-1", "Deposition of J. Smith")]);
        let f = finding(
            vec!["doc-1".to_string()],
            Some(json!({"quotes": ["the gate was locked"]})),
        );
        let trail = build_finding_trail(&f, &context);

        let types: Vec<StepType> = trail.steps.iter().map(|s| s.step_type).collect();
        assert_eq!(
            types,
            vec![
                StepType::SourceIdentification,
                StepType::EvidenceExtraction,
                StepType::AnalysisPerformed,
                StepType::ConclusionReached,
            ]
        );

        // Every previous_step_id must point at an earlier step in the chain.
        let mut seen: Vec<&str> = Vec::new();
        for step in &trail.steps {
            for prev in &step.previous_step_ids {
                assert!(seen.contains(&prev.as_str()), "dangling link {}", prev);
            }
            seen.push(&step.id);
        }
    }

    #[test]
    fn finding_without_documents_still_concludes() {
        let context = context_with_docs(vec![]);
        let f = finding(vec![], None);
        let trail = build_finding_trail(&f, &context);

        let types: Vec<StepType> = trail.steps.iter().map(|s| s.step_type).collect();
        assert_eq!(
            types,
            vec![StepType::AnalysisPerformed, StepType::ConclusionReached]
        );
    }

    #[test]
    fn zero_quotes_skip_extraction() {
        let context = context_with_docs(vec![document("doc-1", "Contract")]);
        let f = finding(vec!["doc-1".to_string()], Some(json!({"quotes": []})));
        let trail = build_finding_trail(&f, &context);
        assert!(trail
            .steps
            .iter()
            .all(|s| s.step_type != StepType::EvidenceExtraction));
    }

    #[test]
    fn unknown_engine_renders_verbatim() {
        let context = context_with_docs(vec![]);
        let mut f = finding(vec![], None);
        f.engine = Some("quantum_vibes_v2".to_string());
        let trail = build_finding_trail(&f, &context);
        let analysis = &trail.steps[0];
        assert!(analysis.description.contains("quantum_vibes_v2"));
    }

    #[test]
    fn contradiction_trail_embeds_severity_tag() {
        let context = context_with_docs(vec![
            document("doc-a", "Email Thread"),
            document("doc-b", "Deposition"),
        ]);
        let c = Contradiction {
            id: "contra-1".to_string(),
            case_id: "case-1".to_string(),
            title: "Location conflict".to_string(),
            description: None,
            severity: Some("critical".to_string()),
            contradiction_type: Some("temporal".to_string()),
            confidence: None,
            source_a_document_id: Some("doc-a".to_string()),
            source_a_entity_id: None,
            source_a_text: "I was in Boston".to_string(),
            source_b_document_id: Some("doc-b".to_string()),
            source_b_entity_id: None,
            source_b_text: "He was in Chicago that night".to_string(),
        };
        let trail = build_contradiction_trail(&c, &context);

        let verification = trail.steps.last().unwrap();
        assert_eq!(verification.step_type, StepType::VerificationStep);
        assert!(verification.description.contains("[CRITICAL]"));
        assert!(verification.description.contains("[TEMPORAL]"));

        let detected = &trail.steps[trail.steps.len() - 2];
        assert_eq!(detected.step_type, StepType::ContradictionDetected);
        assert_eq!(detected.quotes.len(), 2);

        // 1.0 + 1.0 + 0.85 + 0.85, all weight 1.
        assert!((trail.overall_confidence - 0.925).abs() < 1e-9);
    }

    #[test]
    fn contradiction_with_missing_side_uses_placeholder() {
        let context = context_with_docs(vec![document("doc-a", "Email Thread")]);
        let c = Contradiction {
            id: "contra-2".to_string(),
            case_id: "case-1".to_string(),
            title: "One-sided".to_string(),
            description: None,
            severity: None,
            contradiction_type: None,
            confidence: None,
            source_a_document_id: Some("doc-a".to_string()),
            source_a_entity_id: None,
            source_a_text: "statement a".to_string(),
            source_b_document_id: Some("doc-missing".to_string()),
            source_b_entity_id: None,
            source_b_text: "statement b".to_string(),
        };
        let trail = build_contradiction_trail(&c, &context);
        let detected = trail
            .steps
            .iter()
            .find(|s| s.step_type == StepType::ContradictionDetected)
            .unwrap();
        assert_eq!(detected.quotes.len(), 2);
        assert!(detected.quotes[1].citation.placeholder);
    }
}
