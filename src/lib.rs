//! # Casebinder
//!
//! A citation-backed legal evidence export pipeline.
//!
//! Casebinder turns a case's raw analytic artifacts (findings,
//! contradictions, entities, source documents) into an auditable export
//! package rendered as PDF or DOCX. Every quoted fact resolves to a formal
//! citation, and every finding can carry a step-by-step reasoning chain
//! from source document to conclusion with an aggregate confidence score.
//!
//! ## Pipeline
//!
//! ```text
//! ┌───────────┐   ┌─────────────────┐   ┌───────────────┐
//! │ DataLayer │──▶│   Transformer    │──▶│  Assemblers   │
//! │ 6 queries │   │ cite+audit+filter│   │  PDF / DOCX   │
//! └───────────┘   └─────────────────┘   └───────────────┘
//!       concurrent fetch → one immutable ExportData → one blob
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Raw analytic artifact types |
//! | [`store`] | `DataLayer` trait + SQLite/in-memory implementations |
//! | [`citation`] | Citation formatting, quotes, deduplication tracking |
//! | [`evidence`] | Lenient evidence-payload parsing |
//! | [`audit`] | Reasoning-chain construction and confidence aggregation |
//! | [`transform`] | Filters, lookup contexts, the `ExportData` aggregate |
//! | [`methodology`] | Derived data-source/method statement |
//! | [`summary`] | Severity/engine histograms |
//! | [`render`] | Report options and the PDF/DOCX assemblers |
//! | [`export`] | Orchestration and the result contract |
//! | [`migrate`] | Schema migrations |

pub mod audit;
pub mod citation;
pub mod config;
pub mod error;
pub mod evidence;
pub mod export;
pub mod methodology;
pub mod migrate;
pub mod models;
pub mod render;
pub mod store;
pub mod summary;
pub mod transform;
