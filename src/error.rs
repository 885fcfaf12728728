//! Export failure taxonomy.
//!
//! Only whole-case failures are represented here. Per-item problems (a bad
//! evidence payload, a citation to a document that no longer exists) degrade
//! to placeholders inside the pipeline and never abort an export.

use thiserror::Error;

/// A fatal export failure. Converted to an [`crate::export::ExportOutcome`]
/// with `success: false` at the entry point; nothing is retried internally.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The requested case id does not exist. No partial output.
    #[error("case not found: {case_id}")]
    CaseNotFound { case_id: String },

    /// The case has zero findings and zero contradictions (checked after
    /// fetch, before any filtering).
    #[error("no evidence available for case {case_id}: no findings or contradictions")]
    NoEvidence { case_id: String },

    /// A data-layer fetch failed. Wraps the underlying message.
    #[error("data layer failure: {0}")]
    DataLayer(#[source] anyhow::Error),

    /// The format-specific assembler failed.
    #[error("render failure ({format}): {message}")]
    Render { format: String, message: String },
}

impl ExportError {
    /// Stable machine-readable kind tag for callers that match on failures.
    pub fn kind(&self) -> &'static str {
        match self {
            ExportError::CaseNotFound { .. } => "case_not_found",
            ExportError::NoEvidence { .. } => "no_evidence_available",
            ExportError::DataLayer(_) => "data_layer_failure",
            ExportError::Render { .. } => "render_failure",
        }
    }
}
