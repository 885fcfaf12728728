//! In-memory [`DataLayer`] implementation for tests and embedding.
//!
//! Holds complete case bundles behind a `std::sync::RwLock`. Lookups clone;
//! the pipeline wants an immutable snapshot anyway.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{
    AnalysisBundle, CaseBundle, CaseFile, Contradiction, Entity, Finding, SourceDocument,
};

use super::DataLayer;

/// In-memory store keyed by case id.
#[derive(Default)]
pub struct MemoryStore {
    cases: RwLock<HashMap<String, CaseBundle>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a full case bundle.
    pub fn load_bundle(&self, bundle: CaseBundle) {
        let mut cases = self.cases.write().expect("memory store lock poisoned");
        cases.insert(bundle.case.id.clone(), bundle);
    }

    fn with_bundle<T>(&self, case_id: &str, f: impl FnOnce(&CaseBundle) -> T) -> Option<T> {
        let cases = self.cases.read().expect("memory store lock poisoned");
        cases.get(case_id).map(f)
    }
}

#[async_trait]
impl DataLayer for MemoryStore {
    async fn case(&self, case_id: &str) -> Result<Option<CaseFile>> {
        Ok(self.with_bundle(case_id, |b| b.case.clone()))
    }

    async fn documents(&self, case_id: &str) -> Result<Vec<SourceDocument>> {
        Ok(self
            .with_bundle(case_id, |b| b.documents.clone())
            .unwrap_or_default())
    }

    async fn findings(&self, case_id: &str) -> Result<Vec<Finding>> {
        Ok(self
            .with_bundle(case_id, |b| b.findings.clone())
            .unwrap_or_default())
    }

    async fn contradictions(&self, case_id: &str) -> Result<Vec<Contradiction>> {
        Ok(self
            .with_bundle(case_id, |b| b.contradictions.clone())
            .unwrap_or_default())
    }

    async fn entities(&self, case_id: &str) -> Result<Vec<Entity>> {
        Ok(self
            .with_bundle(case_id, |b| b.entities.clone())
            .unwrap_or_default())
    }

    async fn analysis_bundle(&self, case_id: &str) -> Result<AnalysisBundle> {
        Ok(self
            .with_bundle(case_id, |b| AnalysisBundle {
                findings: b.findings.clone(),
                contradictions: b.contradictions.clone(),
                omissions: b.omissions.clone(),
            })
            .unwrap_or_default())
    }
}
