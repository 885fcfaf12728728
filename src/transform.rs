//! Export transformation.
//!
//! Joins raw findings, contradictions, and entities against map-based
//! document/entity lookup contexts, resolves citations and quotes, builds
//! audit trails, and applies the configured filters, producing the one
//! immutable [`ExportData`] aggregate the document assemblers consume.
//!
//! Referential integrity rule: anything that cites a document id must either
//! resolve it through the [`LookupContext`] or degrade to a labeled
//! placeholder citation. Nothing here throws on missing references.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::audit::{build_contradiction_trail, build_finding_trail, AuditTrail};
use crate::citation::{
    format_citation, format_quote, placeholder_citation, Citation, CitationTracker, DocumentQuote,
};
use crate::evidence::EvidencePayload;
use crate::methodology::{self, MethodologyStatement};
use crate::models::{
    AnalysisBundle, CaseFile, Contradiction, Entity, Finding, Omission, Severity, SourceDocument,
};
use crate::render::ExportFormat;
use crate::summary::{self, ExportSummary};

/// Map-based document/entity lookups for one export invocation.
///
/// Always passed by reference into transformer and builder calls; never
/// ambient or global.
pub struct LookupContext {
    documents: HashMap<String, SourceDocument>,
    entities: HashMap<String, Entity>,
}

impl LookupContext {
    pub fn new(documents: &[SourceDocument], entities: &[Entity]) -> Self {
        Self {
            documents: documents.iter().map(|d| (d.id.clone(), d.clone())).collect(),
            entities: entities.iter().map(|e| (e.id.clone(), e.clone())).collect(),
        }
    }

    pub fn document(&self, id: &str) -> Option<&SourceDocument> {
        self.documents.get(id)
    }

    pub fn entity(&self, id: &str) -> Option<&Entity> {
        self.entities.get(id)
    }

    /// Build a quote whose citation resolves through the context, or a
    /// labeled placeholder when the document id is absent or unresolvable.
    pub fn quote_or_placeholder(
        &self,
        text: &str,
        document_id: Option<&str>,
        label: &str,
    ) -> DocumentQuote {
        let citation = match document_id {
            Some(id) => match self.document(id) {
                Some(document) => format_citation(document, None),
                None => placeholder_citation(id, label),
            },
            None => placeholder_citation("unknown", label),
        };
        format_quote(text, citation, None)
    }
}

/// Severity/engine/cap filters for the finding list.
#[derive(Debug, Clone)]
pub struct FindingFilters {
    /// Inclusive severity floor.
    pub min_severity: Severity,
    /// Engine allow-list; empty means all engines pass.
    pub engines: Vec<String>,
    /// Cap applied last, in input order.
    pub max_findings: usize,
}

impl Default for FindingFilters {
    fn default() -> Self {
        Self {
            min_severity: Severity::Info,
            engines: Vec::new(),
            max_findings: usize::MAX,
        }
    }
}

/// Apply the three filters in their fixed order. Each filter reduces, never
/// reorders, the prior result; the cap runs last so the earlier filters
/// determine which N survive.
pub fn apply_filters(findings: &[Finding], filters: &FindingFilters) -> Vec<Finding> {
    findings
        .iter()
        .filter(|f| f.severity_rank() >= filters.min_severity)
        .filter(|f| {
            filters.engines.is_empty()
                || f.engine
                    .as_deref()
                    .map(|e| filters.engines.iter().any(|allowed| allowed == e))
                    .unwrap_or(false)
        })
        .take(filters.max_findings)
        .cloned()
        .collect()
}

/// A finding joined with its resolved citations, quotes, related records,
/// and optional reasoning chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportFinding {
    pub finding: Finding,
    pub severity: Severity,
    pub citations: Vec<Citation>,
    pub quotes: Vec<DocumentQuote>,
    pub related_entities: Vec<RelatedEntity>,
    pub audit_trail: Option<AuditTrail>,
}

/// Minimal entity reference carried inside findings and contradictions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelatedEntity {
    pub id: String,
    pub canonical_name: String,
    pub role: Option<String>,
}

/// One side of an exported contradiction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContradictionSide {
    pub quote: DocumentQuote,
    pub citation: Citation,
    pub entity: Option<RelatedEntity>,
}

/// A contradiction joined with both resolved sides and a reasoning chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportContradiction {
    pub contradiction: Contradiction,
    pub severity: Severity,
    pub source_a: ContradictionSide,
    pub source_b: ContradictionSide,
    pub audit_trail: Option<AuditTrail>,
}

/// Document reference carried by an exported entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityDocumentRef {
    pub document_id: String,
    pub document_name: String,
    pub mention_count: u32,
}

/// An entity joined with its document references and the ids of the
/// findings/contradictions that mention it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportEntity {
    pub entity: Entity,
    pub documents: Vec<EntityDocumentRef>,
    pub related_finding_ids: Vec<String>,
    pub related_contradiction_ids: Vec<String>,
}

/// Export request metadata stamped into the aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportMetadata {
    pub export_id: String,
    pub format: ExportFormat,
    pub generator: String,
    pub version: String,
    pub generated_at: DateTime<Utc>,
}

/// The root aggregate: constructed once per export request from freshly
/// fetched data, handed by value to exactly one document assembler, then
/// discarded. Never partially updated or shared across requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportData {
    pub metadata: ExportMetadata,
    pub case: CaseFile,
    pub summary: ExportSummary,
    pub findings: Vec<ExportFinding>,
    pub contradictions: Vec<ExportContradiction>,
    pub entities: Vec<ExportEntity>,
    pub omissions: Vec<Omission>,
    pub documents: Vec<SourceDocument>,
    pub methodology: MethodologyStatement,
    pub audit_trails: Vec<AuditTrail>,
    /// Findings' citations deduplicated by document id, for the references
    /// section.
    pub citations: Vec<Citation>,
}

fn related_entity(entity: &Entity) -> RelatedEntity {
    RelatedEntity {
        id: entity.id.clone(),
        canonical_name: entity.canonical_name.clone(),
        role: entity.role.clone(),
    }
}

/// Transform one finding: resolve citations and related entities, parse the
/// evidence payload into quotes, and optionally build the audit trail.
/// Unresolved document/entity ids are skipped silently.
pub fn transform_finding(
    finding: &Finding,
    context: &LookupContext,
    tracker: &mut CitationTracker,
    include_audit_trail: bool,
) -> ExportFinding {
    let payload = EvidencePayload::parse(finding.evidence.as_ref());

    let mut citations = Vec::new();
    let mut quotes = Vec::new();
    for doc_id in &finding.document_ids {
        let Some(document) = context.document(doc_id) else {
            continue;
        };
        let page = payload.page_for(doc_id);
        let citation = format_citation(document, page);
        tracker.record(&citation);
        for quote_text in &payload.quotes {
            quotes.push(format_quote(quote_text, citation.clone(), page));
        }
        citations.push(citation);
    }

    // Quotes with no resolvable document still appear, under a placeholder.
    if citations.is_empty() && !payload.quotes.is_empty() {
        let citation = placeholder_citation(
            finding.document_ids.first().map(String::as_str).unwrap_or("unknown"),
            "Uncited evidence",
        );
        for quote_text in &payload.quotes {
            quotes.push(format_quote(quote_text, citation.clone(), None));
        }
    }

    let related_entities = finding
        .entity_ids
        .iter()
        .filter_map(|id| context.entity(id))
        .map(related_entity)
        .collect();

    let audit_trail = include_audit_trail.then(|| build_finding_trail(finding, context));

    ExportFinding {
        severity: finding.severity_rank(),
        finding: finding.clone(),
        citations,
        quotes,
        related_entities,
        audit_trail,
    }
}

fn transform_side(
    text: &str,
    document_id: Option<&str>,
    entity_id: Option<&str>,
    label: &str,
    context: &LookupContext,
) -> ContradictionSide {
    let quote = context.quote_or_placeholder(text, document_id, label);
    let entity = entity_id
        .and_then(|id| context.entity(id))
        .map(related_entity);
    ContradictionSide {
        citation: quote.citation.clone(),
        quote,
        entity,
    }
}

/// Transform one contradiction. Each side resolves independently; either may
/// fall back to its own placeholder, and both quotes are always built.
pub fn transform_contradiction(
    contradiction: &Contradiction,
    context: &LookupContext,
    include_audit_trail: bool,
) -> ExportContradiction {
    let source_a = transform_side(
        &contradiction.source_a_text,
        contradiction.source_a_document_id.as_deref(),
        contradiction.source_a_entity_id.as_deref(),
        "Source A",
        context,
    );
    let source_b = transform_side(
        &contradiction.source_b_text,
        contradiction.source_b_document_id.as_deref(),
        contradiction.source_b_entity_id.as_deref(),
        "Source B",
        context,
    );

    let audit_trail =
        include_audit_trail.then(|| build_contradiction_trail(contradiction, context));

    ExportContradiction {
        severity: contradiction.severity_rank(),
        contradiction: contradiction.clone(),
        source_a,
        source_b,
        audit_trail,
    }
}

/// Transform entities against the *unfiltered* finding/contradiction sets.
///
/// Filtering a finding out of the report body must not hide an entity, so
/// entity derivation ignores the filters. The related-id lists still name
/// only items that actually mention the entity.
pub fn transform_entities(
    entities: &[Entity],
    findings: &[Finding],
    contradictions: &[Contradiction],
    context: &LookupContext,
) -> Vec<ExportEntity> {
    entities
        .iter()
        .map(|entity| {
            let documents = entity
                .document_mentions
                .iter()
                .filter_map(|m| {
                    context.document(&m.document_id).map(|d| EntityDocumentRef {
                        document_id: d.id.clone(),
                        document_name: d.name.clone(),
                        mention_count: m.mention_count,
                    })
                })
                .collect();

            let related_finding_ids = findings
                .iter()
                .filter(|f| f.entity_ids.iter().any(|id| id == &entity.id))
                .map(|f| f.id.clone())
                .collect();

            let related_contradiction_ids = contradictions
                .iter()
                .filter(|c| {
                    c.source_a_entity_id.as_deref() == Some(entity.id.as_str())
                        || c.source_b_entity_id.as_deref() == Some(entity.id.as_str())
                })
                .map(|c| c.id.clone())
                .collect();

            ExportEntity {
                entity: entity.clone(),
                documents,
                related_finding_ids,
                related_contradiction_ids,
            }
        })
        .collect()
}

/// Inputs to one export transformation: the joined snapshot of all six
/// data-layer fetches.
pub struct CaseSnapshot {
    pub case: CaseFile,
    pub documents: Vec<SourceDocument>,
    pub findings: Vec<Finding>,
    pub contradictions: Vec<Contradiction>,
    pub entities: Vec<Entity>,
    pub bundle: AnalysisBundle,
}

/// Build the complete aggregate for one export request.
///
/// Orchestration order: filters over the raw findings, per-item transforms
/// through a fresh [`CitationTracker`], entity derivation over the
/// unfiltered sets, then methodology (pre-filter population) and summary
/// (filtered population) over the whole result.
pub fn build_export_data(
    snapshot: CaseSnapshot,
    filters: &FindingFilters,
    include_audit_trails: bool,
    format: ExportFormat,
) -> ExportData {
    let context = LookupContext::new(&snapshot.documents, &snapshot.entities);
    let mut tracker = CitationTracker::new();

    let filtered = apply_filters(&snapshot.findings, filters);

    let findings: Vec<ExportFinding> = filtered
        .iter()
        .map(|f| transform_finding(f, &context, &mut tracker, include_audit_trails))
        .collect();

    let contradictions: Vec<ExportContradiction> = snapshot
        .contradictions
        .iter()
        .map(|c| transform_contradiction(c, &context, include_audit_trails))
        .collect();

    let entities = transform_entities(
        &snapshot.entities,
        &snapshot.findings,
        &snapshot.contradictions,
        &context,
    );

    let methodology = methodology::synthesize(&snapshot.documents, &snapshot.findings);
    let summary = summary::calculate(
        &snapshot.case,
        &snapshot.documents,
        &filtered,
        &snapshot.contradictions,
        &snapshot.entities,
    );

    let audit_trails: Vec<AuditTrail> = findings
        .iter()
        .filter_map(|f| f.audit_trail.clone())
        .chain(contradictions.iter().filter_map(|c| c.audit_trail.clone()))
        .collect();

    let citations = tracker.deduplicated();

    ExportData {
        metadata: ExportMetadata {
            export_id: Uuid::new_v4().to_string(),
            format,
            generator: "casebinder".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            generated_at: Utc::now(),
        },
        case: snapshot.case,
        summary,
        findings,
        contradictions,
        entities,
        omissions: snapshot.bundle.omissions,
        documents: snapshot.documents,
        methodology,
        audit_trails,
        citations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document(id: &str, name: &str) -> SourceDocument {
        SourceDocument {
            id: id.to_string(),
            case_id: "case-1".to_string(),
            name: name.to_string(),
            doc_type: None,
            doc_date: None,
            page_count: None,
            created_at: None,
        }
    }

    fn finding(id: &str, severity: &str, engine: &str) -> Finding {
        Finding {
            id: id.to_string(),
            case_id: "case-1".to_string(),
            title: format!("Finding {}", id),
            description: "description".to_string(),
            severity: Some(severity.to_string()),
            confidence: Some(0.8),
            engine: Some(engine.to_string()),
            document_ids: vec![],
            entity_ids: vec![],
            evidence: None,
            created_at: None,
        }
    }

    #[test]
    fn severity_floor_is_inclusive_and_monotonic() {
        let findings = vec![
            finding("f1", "critical", "timeline_analysis"),
            finding("f2", "high", "timeline_analysis"),
            finding("f3", "medium", "timeline_analysis"),
            finding("f4", "low", "timeline_analysis"),
            finding("f5", "info", "timeline_analysis"),
        ];
        let filters = FindingFilters {
            min_severity: Severity::High,
            ..Default::default()
        };
        let kept = apply_filters(&findings, &filters);
        let ids: Vec<&str> = kept.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["f1", "f2"]);
    }

    #[test]
    fn null_severity_ranks_as_info() {
        let mut f = finding("f1", "low", "x");
        f.severity = None;
        let filters = FindingFilters {
            min_severity: Severity::Low,
            ..Default::default()
        };
        assert!(apply_filters(&[f], &filters).is_empty());
    }

    #[test]
    fn engine_allowlist_filters_after_severity() {
        let findings = vec![
            finding("f1", "critical", "timeline_analysis"),
            finding("f2", "critical", "entity_resolution"),
            finding("f3", "low", "timeline_analysis"),
        ];
        let filters = FindingFilters {
            min_severity: Severity::Medium,
            engines: vec!["timeline_analysis".to_string()],
            ..Default::default()
        };
        let kept = apply_filters(&findings, &filters);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, "f1");
    }

    #[test]
    fn cap_applies_last_and_returns_min() {
        let findings: Vec<Finding> = (0..10)
            .map(|i| finding(&format!("f{}", i), "high", "x"))
            .collect();
        let filters = FindingFilters {
            max_findings: 4,
            ..Default::default()
        };
        assert_eq!(apply_filters(&findings, &filters).len(), 4);

        let filters = FindingFilters {
            max_findings: 50,
            ..Default::default()
        };
        assert_eq!(apply_filters(&findings, &filters).len(), 10);
    }

    #[test]
    fn unresolved_document_ids_are_skipped_silently() {
        let context = LookupContext::new(&[document("doc-1", "Contract")], &[]);
        let mut tracker = CitationTracker::new();
        let mut f = finding("f1", "high", "x");
        f.document_ids = vec!["doc-1".to_string(), "doc-stale".to_string()];
        f.evidence = Some(json!({"quotes": ["a quote"]}));

        let exported = transform_finding(&f, &context, &mut tracker, false);
        assert_eq!(exported.citations.len(), 1);
        assert_eq!(exported.citations[0].document_id, "doc-1");
        assert!(!exported.quotes.is_empty());
    }

    #[test]
    fn contradiction_sides_resolve_independently() {
        let context = LookupContext::new(&[document("doc-a", "Email")], &[]);
        let c = Contradiction {
            id: "c1".to_string(),
            case_id: "case-1".to_string(),
            title: "Conflict".to_string(),
            description: None,
            severity: Some("high".to_string()),
            contradiction_type: None,
            confidence: None,
            source_a_document_id: Some("doc-a".to_string()),
            source_a_entity_id: None,
            source_a_text: "statement a".to_string(),
            source_b_document_id: None,
            source_b_entity_id: None,
            source_b_text: "statement b".to_string(),
        };
        let exported = transform_contradiction(&c, &context, false);
        assert!(!exported.source_a.citation.placeholder);
        assert!(exported.source_b.citation.placeholder);
        assert_eq!(exported.source_a.quote.text, "statement a");
        assert_eq!(exported.source_b.quote.text, "statement b");
    }

    #[test]
    fn entities_derive_from_unfiltered_sets() {
        let entity = Entity {
            id: "e1".to_string(),
            case_id: "case-1".to_string(),
            canonical_name: "Jane Smith".to_string(),
            entity_type: Some("person".to_string()),
            role: None,
            institution: None,
            document_mentions: vec![],
        };
        let mut low = finding("f-low", "info", "x");
        low.entity_ids = vec!["e1".to_string()];
        let context = LookupContext::new(&[], &[entity.clone()]);

        let exported = transform_entities(&[entity], &[low], &[], &context);
        assert_eq!(exported[0].related_finding_ids, vec!["f-low"]);
    }
}
