//! Citation formatting and quote records.
//!
//! Every quoted fact in an export resolves to a formal citation. Formatting
//! is deterministic: the same document and page always produce the same
//! string, so repeated references collapse cleanly during deduplication.

use serde::{Deserialize, Serialize};

use crate::models::SourceDocument;

/// Quote text longer than this is truncated with an ellipsis.
pub const MAX_QUOTE_CHARS: usize = 300;

/// A formatted reference to a source document, optionally pinned to a page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    /// Legal-citation style display string.
    pub formatted: String,
    pub document_id: String,
    pub document_name: String,
    pub page_number: Option<u32>,
    pub doc_type: Option<String>,
    pub doc_date: Option<String>,
    /// True when the cited document could not be resolved and this citation
    /// is a labeled stand-in.
    pub placeholder: bool,
}

/// A bounded quote from a source document, carrying its citation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentQuote {
    pub text: String,
    pub document_id: String,
    pub page_number: Option<u32>,
    pub citation: Citation,
    pub truncated: bool,
}

/// Build the canonical citation for a document and optional page.
///
/// Deterministic: embeds name, then type and date when available, then the
/// page pin. E.g. `Employment Agreement, Contract (2020-01-15), p. 4`.
pub fn format_citation(document: &SourceDocument, page_number: Option<u32>) -> Citation {
    let mut formatted = document.name.clone();
    if let Some(doc_type) = &document.doc_type {
        formatted.push_str(", ");
        formatted.push_str(doc_type);
    }
    if let Some(date) = &document.doc_date {
        formatted.push_str(&format!(" ({})", date));
    }
    if let Some(page) = page_number {
        formatted.push_str(&format!(", p. {}", page));
    }

    Citation {
        formatted,
        document_id: document.id.clone(),
        document_name: document.name.clone(),
        page_number,
        doc_type: document.doc_type.clone(),
        doc_date: document.doc_date.clone(),
        placeholder: false,
    }
}

/// Stand-in citation for a document id that cannot be resolved.
///
/// Stale references degrade to this instead of failing the export.
pub fn placeholder_citation(document_id: &str, label: &str) -> Citation {
    Citation {
        formatted: format!("[{}: document {} unavailable]", label, document_id),
        document_id: document_id.to_string(),
        document_name: label.to_string(),
        page_number: None,
        doc_type: None,
        doc_date: None,
        placeholder: true,
    }
}

/// Wrap raw quoted text in a [`DocumentQuote`], truncating past
/// [`MAX_QUOTE_CHARS`]. The citation is attached unmodified.
pub fn format_quote(text: &str, citation: Citation, page_number: Option<u32>) -> DocumentQuote {
    let (text, truncated) = truncate_chars(text, MAX_QUOTE_CHARS);
    DocumentQuote {
        text,
        document_id: citation.document_id.clone(),
        page_number,
        citation,
        truncated,
    }
}

/// Char-boundary-safe truncation with an ellipsis marker.
pub fn truncate_chars(text: &str, max_chars: usize) -> (String, bool) {
    if text.chars().count() <= max_chars {
        return (text.to_string(), false);
    }
    let cut: String = text.chars().take(max_chars).collect();
    (format!("{}...", cut.trim_end()), true)
}

/// Accumulates every citation issued during one export run so the references
/// section can be deduplicated by document id. One tracker per invocation;
/// there is no state outside it.
#[derive(Debug, Default)]
pub struct CitationTracker {
    citations: Vec<Citation>,
}

impl CitationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, citation: &Citation) {
        self.citations.push(citation.clone());
    }

    /// All recorded citations, deduplicated by document id, first occurrence
    /// wins. Distinct documents are never dropped.
    pub fn deduplicated(&self) -> Vec<Citation> {
        let mut seen = std::collections::HashSet::new();
        self.citations
            .iter()
            .filter(|c| seen.insert(c.document_id.clone()))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.citations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.citations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, name: &str) -> SourceDocument {
        SourceDocument {
            id: id.to_string(),
            case_id: "case-1".to_string(),
            name: name.to_string(),
            doc_type: Some("Contract".to_string()),
            doc_date: Some("2020-01-15".to_string()),
            page_count: Some(12),
            created_at: None,
        }
    }

    #[test]
    fn citation_is_deterministic() {
        let d = doc("doc-1", "Employment Agreement");
        let a = format_citation(&d, Some(4));
        let b = format_citation(&d, Some(4));
        assert_eq!(a.formatted, b.formatted);
        assert_eq!(a.formatted, "Employment Agreement, Contract (2020-01-15), p. 4");
    }

    #[test]
    fn citation_omits_missing_fields() {
        let mut d = doc("doc-1", "Handwritten Note");
        d.doc_type = None;
        d.doc_date = None;
        let c = format_citation(&d, None);
        assert_eq!(c.formatted, "Handwritten Note");
    }

    #[test]
    fn placeholder_is_labeled_and_flagged() {
        let c = placeholder_citation("doc-gone", "Source A");
        assert!(c.placeholder);
        assert!(c.formatted.contains("doc-gone"));
        assert!(c.formatted.contains("Source A"));
    }

    #[test]
    fn long_quotes_are_truncated_with_flag() {
        let d = doc("doc-1", "Deposition");
        let citation = format_citation(&d, Some(2));
        let long = "x".repeat(500);
        let q = format_quote(&long, citation.clone(), Some(2));
        assert!(q.truncated);
        assert!(q.text.ends_with("..."));
        assert!(q.text.chars().count() <= MAX_QUOTE_CHARS + 3);

        let short = format_quote("brief statement", citation, Some(2));
        assert!(!short.truncated);
        assert_eq!(short.text, "brief statement");
    }

    #[test]
    fn tracker_dedups_by_document_id() {
        let d1 = doc("doc-1", "Agreement");
        let d2 = doc("doc-2", "Deposition");
        let mut tracker = CitationTracker::new();
        tracker.record(&format_citation(&d1, Some(1)));
        tracker.record(&format_citation(&d1, Some(7)));
        tracker.record(&format_citation(&d2, None));

        let deduped = tracker.deduplicated();
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].document_id, "doc-1");
        assert_eq!(deduped[1].document_id, "doc-2");
    }
}
