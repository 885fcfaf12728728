//! # Casebinder CLI (`cbx`)
//!
//! The `cbx` binary drives the evidence export pipeline. It provides
//! commands for database initialization, case-bundle import, report
//! generation, and aggregate inspection.
//!
//! ## Usage
//!
//! ```bash
//! cbx --config ./config/cbx.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `cbx init` | Create the SQLite database and run schema migrations |
//! | `cbx import <file>` | Load a case bundle (JSON) into the store |
//! | `cbx export <case-id>` | Generate a PDF or DOCX evidence report |
//! | `cbx inspect <case-id>` | Print the export aggregate as JSON |
//!
//! ## Examples
//!
//! ```bash
//! # Initialize the database
//! cbx init --config ./config/cbx.toml
//!
//! # Import an upstream case bundle
//! cbx import ./cases/doe-v-acme.json
//!
//! # Export critical and high findings only, as PDF
//! cbx export case-42 --format pdf --min-severity high
//!
//! # Export everything as DOCX without audit trails
//! cbx export case-42 --format docx --no-audit-trails
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use casebinder::config::{load_config, Config};
use casebinder::export::run_export;
use casebinder::migrate;
use casebinder::models::{CaseBundle, Severity};
use casebinder::render::{ExportFormat, ReportOptions, SectionToggle};
use casebinder::store::sqlite::SqliteStore;

/// Casebinder CLI, a citation-backed legal evidence export pipeline.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file holding the database path and report defaults.
#[derive(Parser)]
#[command(
    name = "cbx",
    about = "Casebinder — citation-backed legal evidence export",
    version,
    long_about = "Casebinder turns a case's findings, contradictions, entities, and source \
    documents into an auditable, citation-backed report with step-by-step reasoning chains, \
    rendered as PDF or DOCX."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/cbx.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and all required tables. Idempotent;
    /// running it multiple times is safe.
    Init,

    /// Import a case bundle from a JSON file.
    ///
    /// The bundle holds one case plus its documents, findings,
    /// contradictions, entities, and omissions. Existing rows with the same
    /// ids are replaced.
    Import {
        /// Path to the case bundle JSON file.
        file: PathBuf,
    },

    /// Generate an evidence report for a case.
    Export {
        /// Case id to export.
        case_id: String,

        /// Output format: pdf or docx.
        #[arg(long, default_value = "pdf")]
        format: ExportFormat,

        /// Directory to write the artifact into (defaults from config).
        #[arg(long)]
        output: Option<PathBuf>,

        /// Minimum severity to include: critical, high, medium, low, info.
        #[arg(long)]
        min_severity: Option<String>,

        /// Restrict to findings from these engines (repeatable).
        #[arg(long = "engine")]
        engines: Vec<String>,

        /// Cap the number of findings in the report.
        #[arg(long)]
        max_findings: Option<usize>,

        /// Omit per-finding reasoning chains.
        #[arg(long)]
        no_audit_trails: bool,

        /// Omit the methodology section.
        #[arg(long)]
        no_methodology: bool,

        /// Omit the table of contents.
        #[arg(long)]
        no_toc: bool,

        /// Omit page numbers.
        #[arg(long)]
        no_page_numbers: bool,

        /// Omit the generation timestamp trailer.
        #[arg(long)]
        no_timestamp: bool,

        /// Hide a section by id (repeatable): cover, toc, summary,
        /// methodology, findings, contradictions, entities, audit_trail,
        /// citations.
        #[arg(long = "skip-section")]
        skip_sections: Vec<String>,

        /// Override the report title.
        #[arg(long)]
        title: Option<String>,

        /// Override the report subtitle.
        #[arg(long)]
        subtitle: Option<String>,

        /// Author name shown on the cover.
        #[arg(long)]
        author: Option<String>,
    },

    /// Print the export aggregate for a case as JSON, without rendering.
    Inspect {
        /// Case id to inspect.
        case_id: String,
    },
}

fn report_options(config: &Config) -> ReportOptions {
    let defaults = &config.report;
    ReportOptions {
        min_severity: defaults.min_severity_rank(),
        engines: defaults.engines.clone(),
        max_findings: defaults.max_findings,
        include_audit_trails: defaults.include_audit_trails,
        include_methodology: defaults.include_methodology,
        include_table_of_contents: defaults.include_table_of_contents,
        include_page_numbers: defaults.include_page_numbers,
        include_timestamp: defaults.include_timestamp,
        sections: Vec::new(),
        custom_title: None,
        custom_subtitle: None,
        author_name: defaults.author_name.clone(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&config).await?;
            println!("Database initialized at {}", config.db.path.display());
        }

        Commands::Import { file } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read bundle file: {}", file.display()))?;
            let bundle: CaseBundle =
                serde_json::from_str(&content).with_context(|| "Failed to parse case bundle")?;

            migrate::run_migrations(&config).await?;
            let store = SqliteStore::open(&config).await?;
            store.insert_bundle(&bundle).await?;
            println!(
                "Imported case '{}' ({}): {} documents, {} findings, {} contradictions, {} entities",
                bundle.case.name,
                bundle.case.id,
                bundle.documents.len(),
                bundle.findings.len(),
                bundle.contradictions.len(),
                bundle.entities.len()
            );
            store.close().await;
        }

        Commands::Export {
            case_id,
            format,
            output,
            min_severity,
            engines,
            max_findings,
            no_audit_trails,
            no_methodology,
            no_toc,
            no_page_numbers,
            no_timestamp,
            skip_sections,
            title,
            subtitle,
            author,
        } => {
            let mut options = report_options(&config);
            if let Some(raw) = min_severity {
                options.min_severity = Severity::parse(Some(&raw));
            }
            if !engines.is_empty() {
                options.engines = engines;
            }
            if let Some(cap) = max_findings {
                options.max_findings = cap;
            }
            if no_audit_trails {
                options.include_audit_trails = false;
            }
            if no_methodology {
                options.include_methodology = false;
            }
            if no_toc {
                options.include_table_of_contents = false;
            }
            if no_page_numbers {
                options.include_page_numbers = false;
            }
            if no_timestamp {
                options.include_timestamp = false;
            }
            options.sections = skip_sections
                .into_iter()
                .map(|id| SectionToggle {
                    id,
                    included: false,
                })
                .collect();
            if title.is_some() {
                options.custom_title = title;
            }
            if subtitle.is_some() {
                options.custom_subtitle = subtitle;
            }
            if author.is_some() {
                options.author_name = author;
            }

            let store = SqliteStore::open(&config).await?;
            let outcome = run_export(&store, &case_id, format, &options).await;
            store.close().await;

            if !outcome.success {
                eprintln!(
                    "Export failed ({}): {}",
                    outcome.error_kind.unwrap_or("unknown"),
                    outcome.error.as_deref().unwrap_or("unknown error")
                );
                std::process::exit(1);
            }

            let out_dir = output.unwrap_or_else(|| config.report.output_dir.clone());
            std::fs::create_dir_all(&out_dir)?;
            let path = out_dir.join(&outcome.filename);
            let blob = outcome.blob.expect("successful outcome carries a blob");
            std::fs::write(&path, &blob)?;
            println!(
                "Exported {} ({} bytes, sha256 {})",
                path.display(),
                blob.len(),
                outcome.checksum_sha256.as_deref().unwrap_or("-")
            );
        }

        Commands::Inspect { case_id } => {
            let options = report_options(&config);
            let store = SqliteStore::open(&config).await?;
            let result = casebinder::export::inspect_case(&store, &case_id, &options).await;
            store.close().await;

            match result {
                Ok(data) => println!("{}", serde_json::to_string_pretty(&data)?),
                Err(error) => {
                    eprintln!("Inspect failed ({}): {}", error.kind(), error);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}
