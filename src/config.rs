use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::models::Severity;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub report: ReportDefaults,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

/// Config-file defaults for report generation. Per-request options
/// (CLI flags) override these; see [`crate::render::ReportOptions`].
#[derive(Debug, Deserialize, Clone)]
pub struct ReportDefaults {
    #[serde(default = "default_min_severity")]
    pub min_severity: String,
    #[serde(default)]
    pub engines: Vec<String>,
    #[serde(default = "default_max_findings")]
    pub max_findings: usize,
    #[serde(default = "default_true")]
    pub include_audit_trails: bool,
    #[serde(default = "default_true")]
    pub include_methodology: bool,
    #[serde(default = "default_true")]
    pub include_table_of_contents: bool,
    #[serde(default = "default_true")]
    pub include_page_numbers: bool,
    #[serde(default = "default_true")]
    pub include_timestamp: bool,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_min_severity() -> String {
    "info".to_string()
}
fn default_max_findings() -> usize {
    200
}
fn default_true() -> bool {
    true
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("./exports")
}

impl Default for ReportDefaults {
    fn default() -> Self {
        Self {
            min_severity: default_min_severity(),
            engines: Vec::new(),
            max_findings: default_max_findings(),
            include_audit_trails: true,
            include_methodology: true,
            include_table_of_contents: true,
            include_page_numbers: true,
            include_timestamp: true,
            author_name: None,
            output_dir: default_output_dir(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate report defaults
    if config.report.max_findings == 0 {
        anyhow::bail!("report.max_findings must be > 0");
    }

    match config.report.min_severity.as_str() {
        "critical" | "high" | "medium" | "low" | "info" => {}
        other => anyhow::bail!(
            "Unknown report.min_severity: '{}'. Must be critical, high, medium, low, or info.",
            other
        ),
    }

    Ok(config)
}

impl ReportDefaults {
    pub fn min_severity_rank(&self) -> Severity {
        Severity::parse(Some(&self.min_severity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_config() {
        let toml = r#"
[db]
path = "./data/cases.sqlite"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.report.min_severity, "info");
        assert_eq!(config.report.max_findings, 200);
        assert!(config.report.include_audit_trails);
    }

    #[test]
    fn rejects_unknown_min_severity() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cbx.toml");
        std::fs::write(
            &path,
            "[db]\npath = \"x.sqlite\"\n[report]\nmin_severity = \"severe\"\n",
        )
        .unwrap();
        assert!(load_config(&path).is_err());
    }
}
