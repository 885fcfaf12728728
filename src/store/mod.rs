//! Data-layer abstraction.
//!
//! The export pipeline consumes case data through the [`DataLayer`] trait:
//! six side-effect-free queries, fetched concurrently and joined before any
//! transformation begins. Implementations: [`sqlite::SqliteStore`] for the
//! CLI and [`memory::MemoryStore`] for tests and embedding.

pub mod memory;
pub mod sqlite;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{
    AnalysisBundle, CaseFile, Contradiction, Entity, Finding, SourceDocument,
};

/// Read-only access to a case's analytic artifacts.
///
/// All methods are queries; none mutate. The pipeline treats the combined
/// results as an immutable snapshot for the duration of one export.
#[async_trait]
pub trait DataLayer: Send + Sync {
    /// Fetch a case by id. `Ok(None)` when the id does not resolve.
    async fn case(&self, case_id: &str) -> Result<Option<CaseFile>>;

    /// All source documents belonging to the case.
    async fn documents(&self, case_id: &str) -> Result<Vec<SourceDocument>>;

    /// All findings recorded against the case.
    async fn findings(&self, case_id: &str) -> Result<Vec<Finding>>;

    /// All contradictions recorded against the case.
    async fn contradictions(&self, case_id: &str) -> Result<Vec<Contradiction>>;

    /// All entities resolved for the case.
    async fn entities(&self, case_id: &str) -> Result<Vec<Entity>>;

    /// The pre-aggregated analysis bundle (findings/contradictions/omissions).
    async fn analysis_bundle(&self, case_id: &str) -> Result<AnalysisBundle>;
}
