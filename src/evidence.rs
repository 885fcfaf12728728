//! Lenient parsing of the upstream evidence payload.
//!
//! Findings carry an `evidence` field that is loosely typed at the source: it
//! may be a JSON object, a JSON string containing an object, or garbage.
//! Malformed payloads yield an empty parse rather than an error; a bad
//! payload on one finding must never abort a whole export.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Typed view of a finding's evidence payload. Unknown fields are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvidencePayload {
    #[serde(default)]
    pub quotes: Vec<String>,
    #[serde(default)]
    pub document_references: Vec<DocumentReference>,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

/// A page-level pointer inside the evidence payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentReference {
    pub document_id: String,
    #[serde(default)]
    pub page_number: Option<u32>,
}

impl EvidencePayload {
    /// Parse the raw `evidence` value from a finding.
    ///
    /// Accepts an object, a JSON string wrapping an object, or a bare string
    /// quote. Malformed JSON strings yield the empty payload.
    pub fn parse(raw: Option<&serde_json::Value>) -> EvidencePayload {
        match raw {
            None | Some(serde_json::Value::Null) => EvidencePayload::default(),
            Some(serde_json::Value::String(s)) => {
                let trimmed = s.trim();
                if trimmed.starts_with('{') || trimmed.starts_with('[') {
                    match serde_json::from_str::<serde_json::Value>(trimmed) {
                        Ok(inner) => Self::from_value(&inner),
                        Err(_) => EvidencePayload::default(),
                    }
                } else if trimmed.is_empty() {
                    EvidencePayload::default()
                } else {
                    // A plain prose string is treated as a single quote.
                    EvidencePayload {
                        quotes: vec![s.clone()],
                        ..Default::default()
                    }
                }
            }
            Some(value) => Self::from_value(value),
        }
    }

    fn from_value(value: &serde_json::Value) -> EvidencePayload {
        serde_json::from_value(value.clone()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty() && self.document_references.is_empty() && self.metadata.is_empty()
    }

    /// Page pin for a document, if the payload references it.
    pub fn page_for(&self, document_id: &str) -> Option<u32> {
        self.document_references
            .iter()
            .find(|r| r.document_id == document_id)
            .and_then(|r| r.page_number)
    }
}
