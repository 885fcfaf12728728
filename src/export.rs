//! Export orchestration.
//!
//! One export request: issue the six data-layer fetches concurrently, join
//! them into an immutable snapshot, run the transformation, then hand the
//! aggregate to exactly one assembler. Rendering never starts before the
//! full aggregate exists, and nothing is retried internally: a request
//! runs to completion or fails atomically into an [`ExportOutcome`].

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::ExportError;
use crate::render::{self, ExportFormat, ReportOptions};
use crate::store::DataLayer;
use crate::transform::{build_export_data, CaseSnapshot, ExportData};

/// Result contract for every generation entry point. `blob` is `None`
/// whenever `success` is false; `data` may still be populated on render
/// failures so callers can inspect what would have been exported.
#[derive(Debug, Serialize)]
pub struct ExportOutcome {
    pub success: bool,
    #[serde(skip)]
    pub blob: Option<Vec<u8>>,
    pub filename: String,
    pub error: Option<String>,
    pub error_kind: Option<&'static str>,
    pub data: Option<ExportData>,
    /// SHA-256 of the blob, for chain-of-custody records.
    pub checksum_sha256: Option<String>,
}

impl ExportOutcome {
    fn success(filename: String, blob: Vec<u8>, data: ExportData) -> Self {
        let checksum = format!("{:x}", Sha256::digest(&blob));
        Self {
            success: true,
            blob: Some(blob),
            filename,
            error: None,
            error_kind: None,
            data: Some(data),
            checksum_sha256: Some(checksum),
        }
    }

    fn failure(filename: String, error: ExportError, data: Option<ExportData>) -> Self {
        Self {
            success: false,
            blob: None,
            filename,
            error_kind: Some(error.kind()),
            error: Some(error.to_string()),
            data,
            checksum_sha256: None,
        }
    }
}

/// Fetch all six queries concurrently and join into one snapshot.
///
/// Any fetch failure surfaces as [`ExportError::DataLayer`]; an unresolved
/// case id is [`ExportError::CaseNotFound`].
async fn fetch_snapshot(store: &dyn DataLayer, case_id: &str) -> Result<CaseSnapshot, ExportError> {
    let (case, documents, findings, contradictions, entities, bundle) = tokio::try_join!(
        store.case(case_id),
        store.documents(case_id),
        store.findings(case_id),
        store.contradictions(case_id),
        store.entities(case_id),
        store.analysis_bundle(case_id),
    )
    .map_err(ExportError::DataLayer)?;

    let case = case.ok_or_else(|| ExportError::CaseNotFound {
        case_id: case_id.to_string(),
    })?;

    Ok(CaseSnapshot {
        case,
        documents,
        findings,
        contradictions,
        entities,
        bundle,
    })
}

/// Run one export request end to end.
pub async fn run_export(
    store: &dyn DataLayer,
    case_id: &str,
    format: ExportFormat,
    options: &ReportOptions,
) -> ExportOutcome {
    let filename = render::export_filename(case_id, format);

    let snapshot = match fetch_snapshot(store, case_id).await {
        Ok(snapshot) => snapshot,
        Err(error) => return ExportOutcome::failure(filename, error, None),
    };

    // Zero evidence is checked after fetch, before filtering: a case whose
    // findings were all filtered out still exports (with fallbacks).
    if snapshot.findings.is_empty() && snapshot.contradictions.is_empty() {
        return ExportOutcome::failure(
            filename,
            ExportError::NoEvidence {
                case_id: case_id.to_string(),
            },
            None,
        );
    }

    let data = build_export_data(
        snapshot,
        &options.filters(),
        options.include_audit_trails,
        format,
    );

    match render::assemble(&data, options) {
        Ok(blob) => ExportOutcome::success(filename, blob, data),
        Err(error) => ExportOutcome::failure(
            filename,
            ExportError::Render {
                format: format.to_string(),
                message: error.to_string(),
            },
            Some(data),
        ),
    }
}

/// Build the aggregate without rendering (used by `cbx inspect`).
pub async fn inspect_case(
    store: &dyn DataLayer,
    case_id: &str,
    options: &ReportOptions,
) -> Result<ExportData, ExportError> {
    let snapshot = fetch_snapshot(store, case_id).await?;
    if snapshot.findings.is_empty() && snapshot.contradictions.is_empty() {
        return Err(ExportError::NoEvidence {
            case_id: case_id.to_string(),
        });
    }
    Ok(build_export_data(
        snapshot,
        &options.filters(),
        options.include_audit_trails,
        // Inspection has no container format; PDF metadata is arbitrary but
        // harmless since nothing is rendered.
        ExportFormat::Pdf,
    ))
}
