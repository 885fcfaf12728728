//! DOCX assembler.
//!
//! Writes a minimal WordprocessingML package: `[Content_Types].xml`, package
//! relationships, `word/document.xml`, a small style sheet, core properties,
//! and an optional page-number footer. The container is a ZIP archive, so
//! the output blob begins with the `PK\x03\x04` signature.

use anyhow::Result;
use quick_xml::escape::escape;
use std::io::Write;

use crate::render::{self, ReportOptions};
use crate::transform::ExportData;

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const R_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// Accumulates WordprocessingML body paragraphs.
struct DocxBody {
    xml: String,
}

impl DocxBody {
    fn new() -> Self {
        Self { xml: String::new() }
    }

    fn heading(&mut self, level: u8, text: &str) {
        self.xml.push_str(&format!(
            "<w:p><w:pPr><w:pStyle w:val=\"Heading{}\"/></w:pPr><w:r><w:t xml:space=\"preserve\">{}</w:t></w:r></w:p>",
            level,
            escape(text)
        ));
    }

    fn paragraph(&mut self, text: &str) {
        self.run_paragraph(text, false, false, false);
    }

    fn bold(&mut self, text: &str) {
        self.run_paragraph(text, true, false, false);
    }

    /// Italic, indented paragraph used for quote blocks.
    fn quote(&mut self, text: &str) {
        self.run_paragraph(text, false, true, true);
    }

    fn run_paragraph(&mut self, text: &str, bold: bool, italic: bool, indent: bool) {
        let mut ppr = String::new();
        if indent {
            ppr.push_str("<w:pPr><w:ind w:left=\"720\"/></w:pPr>");
        }
        let mut rpr = String::new();
        if bold || italic {
            rpr.push_str("<w:rPr>");
            if bold {
                rpr.push_str("<w:b/>");
            }
            if italic {
                rpr.push_str("<w:i/>");
            }
            rpr.push_str("</w:rPr>");
        }
        self.xml.push_str(&format!(
            "<w:p>{}<w:r>{}<w:t xml:space=\"preserve\">{}</w:t></w:r></w:p>",
            ppr,
            rpr,
            escape(text)
        ));
    }

    fn empty_line(&mut self) {
        self.xml.push_str("<w:p/>");
    }

    fn page_break(&mut self) {
        self.xml
            .push_str("<w:p><w:r><w:br w:type=\"page\"/></w:r></w:p>");
    }

    /// Fixed-grid table; the first row renders bold (header).
    fn table(&mut self, rows: &[Vec<String>]) {
        if rows.is_empty() {
            return;
        }
        self.xml.push_str(
            "<w:tbl><w:tblPr><w:tblBorders>\
             <w:top w:val=\"single\" w:sz=\"4\"/><w:bottom w:val=\"single\" w:sz=\"4\"/>\
             <w:left w:val=\"single\" w:sz=\"4\"/><w:right w:val=\"single\" w:sz=\"4\"/>\
             <w:insideH w:val=\"single\" w:sz=\"4\"/><w:insideV w:val=\"single\" w:sz=\"4\"/>\
             </w:tblBorders></w:tblPr>",
        );
        for (row_idx, row) in rows.iter().enumerate() {
            self.xml.push_str("<w:tr>");
            for cell in row {
                let rpr = if row_idx == 0 {
                    "<w:rPr><w:b/></w:rPr>"
                } else {
                    ""
                };
                self.xml.push_str(&format!(
                    "<w:tc><w:p><w:r>{}<w:t xml:space=\"preserve\">{}</w:t></w:r></w:p></w:tc>",
                    rpr,
                    escape(cell)
                ));
            }
            self.xml.push_str("</w:tr>");
        }
        self.xml.push_str("</w:tbl>");
    }
}

fn document_xml(body: &DocxBody, include_footer: bool) -> String {
    let sect_pr = if include_footer {
        "<w:sectPr><w:footerReference w:type=\"default\" r:id=\"rId2\"/>\
         <w:pgSz w:w=\"12240\" w:h=\"15840\"/></w:sectPr>"
            .to_string()
    } else {
        "<w:sectPr><w:pgSz w:w=\"12240\" w:h=\"15840\"/></w:sectPr>".to_string()
    };
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
         <w:document xmlns:w=\"{}\" xmlns:r=\"{}\"><w:body>{}{}</w:body></w:document>",
        W_NS, R_NS, body.xml, sect_pr
    )
}

fn styles_xml() -> String {
    let mut styles = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
         <w:styles xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">",
    );
    for (id, size) in [("Heading1", 32), ("Heading2", 26), ("Heading3", 22)] {
        styles.push_str(&format!(
            "<w:style w:type=\"paragraph\" w:styleId=\"{id}\">\
             <w:name w:val=\"{id}\"/>\
             <w:rPr><w:b/><w:sz w:val=\"{size}\"/></w:rPr></w:style>"
        ));
    }
    styles.push_str("</w:styles>");
    styles
}

fn footer_xml() -> String {
    "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
     <w:ftr xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
     <w:p><w:pPr><w:jc w:val=\"center\"/></w:pPr>\
     <w:r><w:fldChar w:fldCharType=\"begin\"/></w:r>\
     <w:r><w:instrText xml:space=\"preserve\"> PAGE </w:instrText></w:r>\
     <w:r><w:fldChar w:fldCharType=\"end\"/></w:r>\
     </w:p></w:ftr>"
        .to_string()
}

fn content_types_xml(include_footer: bool) -> String {
    let footer = if include_footer {
        "<Override PartName=\"/word/footer1.xml\" \
         ContentType=\"application/vnd.openxmlformats-officedocument.wordprocessingml.footer+xml\"/>"
    } else {
        ""
    };
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
         <Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\
         <Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>\
         <Default Extension=\"xml\" ContentType=\"application/xml\"/>\
         <Override PartName=\"/word/document.xml\" \
          ContentType=\"application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml\"/>\
         <Override PartName=\"/word/styles.xml\" \
          ContentType=\"application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml\"/>\
         <Override PartName=\"/docProps/core.xml\" \
          ContentType=\"application/vnd.openxmlformats-package.core-properties+xml\"/>{}</Types>",
        footer
    )
}

fn package_rels_xml() -> String {
    "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
     <Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
     <Relationship Id=\"rId1\" \
      Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument\" \
      Target=\"word/document.xml\"/>\
     <Relationship Id=\"rId2\" \
      Type=\"http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties\" \
      Target=\"docProps/core.xml\"/>\
     </Relationships>"
        .to_string()
}

fn document_rels_xml(include_footer: bool) -> String {
    let footer = if include_footer {
        "<Relationship Id=\"rId2\" \
         Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/footer\" \
         Target=\"footer1.xml\"/>"
    } else {
        ""
    };
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
         <Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
         <Relationship Id=\"rId1\" \
          Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles\" \
          Target=\"styles.xml\"/>{}</Relationships>",
        footer
    )
}

fn core_props_xml(data: &ExportData, options: &ReportOptions) -> String {
    let author = options.author_name.as_deref().unwrap_or("casebinder");
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
         <cp:coreProperties \
          xmlns:cp=\"http://schemas.openxmlformats.org/package/2006/metadata/core-properties\" \
          xmlns:dc=\"http://purl.org/dc/elements/1.1/\" \
          xmlns:dcterms=\"http://purl.org/dc/terms/\" \
          xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\">\
         <dc:title>{}</dc:title>\
         <dc:creator>{}</dc:creator>\
         <dcterms:created xsi:type=\"dcterms:W3CDTF\">{}</dcterms:created>\
         </cp:coreProperties>",
        escape(&render::report_title(data, options)),
        escape(author),
        data.metadata.generated_at.format("%Y-%m-%dT%H:%M:%SZ")
    )
}

/// Assemble the full report body in the fixed structural order.
fn build_body(data: &ExportData, options: &ReportOptions) -> DocxBody {
    let mut body = DocxBody::new();

    if options.section_enabled(render::SECTION_COVER) {
        body.heading(1, &render::report_title(data, options));
        if let Some(subtitle) = render::report_subtitle(data, options) {
            body.paragraph(&subtitle);
        }
        if let Some(author) = &options.author_name {
            body.paragraph(&format!("Prepared by {}", author));
        }
        body.paragraph(&format!(
            "{} documents, {} findings, {} contradictions, {} entities",
            data.summary.document_count,
            data.summary.finding_count,
            data.summary.contradiction_count,
            data.summary.entity_count
        ));
        body.page_break();
    }

    if options.include_table_of_contents && options.section_enabled(render::SECTION_TOC) {
        body.heading(2, "Contents");
        for (idx, title) in section_titles(options).iter().enumerate() {
            body.paragraph(&format!("{}. {}", idx + 1, title));
        }
        body.empty_line();
    }

    if options.section_enabled(render::SECTION_SUMMARY) {
        body.heading(2, "Executive Summary");
        body.paragraph(&format!(
            "This export contains {} finding(s) and {} contradiction(s) drawn from {} source document(s).",
            data.summary.finding_count,
            data.summary.contradiction_count,
            data.summary.document_count
        ));
        for severity in crate::models::Severity::DISPLAY_ORDER {
            let count = data
                .summary
                .findings_by_severity
                .get(severity.label())
                .copied()
                .unwrap_or(0);
            body.paragraph(&format!("{}: {}", severity.label(), count));
        }
        body.empty_line();
    }

    if options.include_methodology && options.section_enabled(render::SECTION_METHODOLOGY) {
        body.heading(2, "Methodology");
        if data.methodology.data_sources.is_empty() {
            body.paragraph(&render::none_available("data sources"));
        }
        for source in &data.methodology.data_sources {
            let range = match (&source.earliest, &source.latest) {
                (Some(earliest), Some(latest)) => format!(" ({} to {})", earliest, latest),
                _ => String::new(),
            };
            body.paragraph(&format!(
                "{}: {} document(s){}",
                source.doc_type, source.count, range
            ));
        }
        if !data.methodology.analysis_methods.is_empty() {
            body.bold("Analysis methods applied:");
            for method in &data.methodology.analysis_methods {
                body.paragraph(&format!(
                    "{} ({} finding(s))",
                    method.engine, method.finding_count
                ));
            }
        }
        body.bold("Confidence interpretation:");
        body.paragraph(&data.methodology.confidence_explanation);
        body.bold("Limitations:");
        for limitation in &data.methodology.limitations {
            body.paragraph(limitation);
        }
        body.empty_line();
    }

    if options.section_enabled(render::SECTION_FINDINGS) {
        body.heading(2, "Findings");
        let groups = render::group_by_severity(&data.findings);
        if groups.is_empty() {
            body.paragraph(&render::none_available("findings"));
        }
        for (severity, findings) in groups {
            body.heading(3, &format!("{} Severity", capitalize(severity.label())));
            for f in findings {
                body.bold(&format!("[{}] {}", severity.label().to_uppercase(), f.finding.title));
                body.paragraph(&render::display_description(&f.finding.description));
                body.paragraph(&format!(
                    "Engine: {} — Confidence: {}",
                    f.finding.engine.as_deref().unwrap_or("unknown"),
                    render::confidence_pct(f.finding.confidence)
                ));
                for quote in f.quotes.iter().take(render::MAX_QUOTES_PER_FINDING) {
                    body.quote(&format!("\u{201c}{}\u{201d}", quote.text));
                }
                for citation in f.citations.iter().take(render::MAX_CITATIONS_PER_FINDING) {
                    body.paragraph(&format!("Cited: {}", citation.formatted));
                }
                body.empty_line();
            }
        }
    }

    if options.section_enabled(render::SECTION_CONTRADICTIONS) {
        body.heading(2, "Contradictions");
        if data.contradictions.is_empty() {
            body.paragraph(&render::none_available("contradictions"));
        } else {
            let mut rows = vec![vec![
                "Title".to_string(),
                "Source A".to_string(),
                "Source B".to_string(),
                "Severity".to_string(),
            ]];
            for c in data
                .contradictions
                .iter()
                .take(render::MAX_CONTRADICTIONS_OVERVIEW)
            {
                rows.push(vec![
                    c.contradiction.title.clone(),
                    format!(
                        "{}: {}",
                        c.source_a.citation.document_name,
                        render::overview_text(&c.source_a.quote.text)
                    ),
                    format!(
                        "{}: {}",
                        c.source_b.citation.document_name,
                        render::overview_text(&c.source_b.quote.text)
                    ),
                    c.severity.label().to_string(),
                ]);
            }
            body.table(&rows);
            body.empty_line();

            body.heading(3, "Detailed Breakdown");
            for c in data
                .contradictions
                .iter()
                .take(render::MAX_CONTRADICTIONS_DETAIL)
            {
                body.bold(&format!(
                    "[{}] {}",
                    c.severity.label().to_uppercase(),
                    c.contradiction.title
                ));
                if let Some(description) = &c.contradiction.description {
                    body.paragraph(&render::display_description(description));
                }
                body.paragraph(&format!("Source A — {}", c.source_a.citation.formatted));
                body.quote(&format!("\u{201c}{}\u{201d}", c.source_a.quote.text));
                body.paragraph(&format!("Source B — {}", c.source_b.citation.formatted));
                body.quote(&format!("\u{201c}{}\u{201d}", c.source_b.quote.text));
                body.empty_line();
            }
        }
    }

    if options.section_enabled(render::SECTION_ENTITIES) {
        body.heading(2, "Entities");
        if data.entities.is_empty() {
            body.paragraph(&render::none_available("entities"));
        }
        for e in &data.entities {
            let mut line = e.entity.canonical_name.clone();
            if let Some(entity_type) = &e.entity.entity_type {
                line.push_str(&format!(" ({})", entity_type));
            }
            body.bold(&line);
            if let Some(role) = &e.entity.role {
                body.paragraph(&format!("Role: {}", role));
            }
            if let Some(institution) = &e.entity.institution {
                body.paragraph(&format!("Institution: {}", institution));
            }
            for doc in e.documents.iter().take(render::MAX_ENTITY_DOC_REFS) {
                body.paragraph(&format!(
                    "Mentioned in {} ({} mention(s))",
                    doc.document_name, doc.mention_count
                ));
            }
            body.paragraph(&format!(
                "Related findings: {} — Related contradictions: {}",
                e.related_finding_ids.len(),
                e.related_contradiction_ids.len()
            ));
            body.empty_line();
        }
    }

    if options.include_audit_trails && options.section_enabled(render::SECTION_AUDIT_TRAIL) {
        body.heading(2, "Audit Trail");
        if data.audit_trails.is_empty() {
            body.paragraph(&render::none_available("audit trails"));
        }
        for trail in data.audit_trails.iter().take(render::MAX_AUDIT_TRAILS) {
            body.bold(&trail.summary);
            for (idx, step) in trail.steps.iter().enumerate() {
                body.paragraph(&format!(
                    "{}. {} — {} (confidence: {})",
                    idx + 1,
                    step.step_type.label(),
                    step.description,
                    render::confidence_pct(step.confidence)
                ));
            }
            body.empty_line();
        }
    }

    if options.section_enabled(render::SECTION_CITATIONS) {
        body.heading(2, "Citations");
        if data.citations.is_empty() {
            body.paragraph(&render::none_available("citations"));
        }
        for citation in &data.citations {
            body.paragraph(&citation.formatted);
        }
    }

    if options.include_timestamp {
        body.empty_line();
        body.paragraph(&format!(
            "Generated at {}",
            data.metadata.generated_at.format("%Y-%m-%dT%H:%M:%SZ")
        ));
    }

    body
}

fn section_titles(options: &ReportOptions) -> Vec<&'static str> {
    let mut titles = Vec::new();
    if options.section_enabled(render::SECTION_SUMMARY) {
        titles.push("Executive Summary");
    }
    if options.include_methodology && options.section_enabled(render::SECTION_METHODOLOGY) {
        titles.push("Methodology");
    }
    if options.section_enabled(render::SECTION_FINDINGS) {
        titles.push("Findings");
    }
    if options.section_enabled(render::SECTION_CONTRADICTIONS) {
        titles.push("Contradictions");
    }
    if options.section_enabled(render::SECTION_ENTITIES) {
        titles.push("Entities");
    }
    if options.include_audit_trails && options.section_enabled(render::SECTION_AUDIT_TRAIL) {
        titles.push("Audit Trail");
    }
    if options.section_enabled(render::SECTION_CITATIONS) {
        titles.push("Citations");
    }
    titles
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Render the aggregate as a DOCX blob.
pub fn assemble(data: &ExportData, options: &ReportOptions) -> Result<Vec<u8>> {
    let include_footer = options.include_page_numbers;
    let body = build_body(data, options);

    let mut zip = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let file_options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);

    let parts: Vec<(&str, String)> = {
        let mut parts = vec![
            ("[Content_Types].xml", content_types_xml(include_footer)),
            ("_rels/.rels", package_rels_xml()),
            ("word/document.xml", document_xml(&body, include_footer)),
            ("word/_rels/document.xml.rels", document_rels_xml(include_footer)),
            ("word/styles.xml", styles_xml()),
            ("docProps/core.xml", core_props_xml(data, options)),
        ];
        if include_footer {
            parts.push(("word/footer1.xml", footer_xml()));
        }
        parts
    };

    for (name, content) in parts {
        zip.start_file(name, file_options)?;
        zip.write_all(content.as_bytes())?;
    }

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_escapes_xml_specials() {
        let mut body = DocxBody::new();
        body.paragraph("a < b & \"c\"");
        assert!(body.xml.contains("a &lt; b &amp; &quot;c\"") || body.xml.contains("a &lt; b &amp;"));
        assert!(!body.xml.contains("a < b"));
    }

    #[test]
    fn table_renders_header_bold() {
        let mut body = DocxBody::new();
        body.table(&[
            vec!["H1".to_string(), "H2".to_string()],
            vec!["a".to_string(), "b".to_string()],
        ]);
        assert!(body.xml.contains("<w:tbl>"));
        assert!(body.xml.contains("<w:rPr><w:b/></w:rPr>"));
    }
}
