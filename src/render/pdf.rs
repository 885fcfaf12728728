//! PDF assembler.
//!
//! Builds the report with `lopdf` page by page: Helvetica text lines laid
//! out top-down with simple word wrapping, a new page whenever the cursor
//! reaches the bottom margin. The output blob begins with the `%PDF-`
//! header bytes.

use anyhow::Result;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use crate::render::{self, ReportOptions};
use crate::transform::ExportData;

const PAGE_WIDTH: i64 = 612;
const PAGE_HEIGHT: i64 = 792;
const MARGIN: i64 = 54;

/// Approximate average glyph width as a fraction of the font size, used for
/// character-count word wrapping. Helvetica averages just over half.
const GLYPH_WIDTH_RATIO: f64 = 0.55;

struct PdfBuilder {
    pages: Vec<Vec<Operation>>,
    y: i64,
}

impl PdfBuilder {
    fn new() -> Self {
        Self {
            pages: vec![Vec::new()],
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    fn new_page(&mut self) {
        self.pages.push(Vec::new());
        self.y = PAGE_HEIGHT - MARGIN;
    }

    fn spacer(&mut self, points: i64) {
        self.y -= points;
        if self.y < MARGIN {
            self.new_page();
        }
    }

    fn heading(&mut self, text: &str) {
        self.spacer(8);
        self.line_with(text, 16, true, 0);
        self.spacer(4);
    }

    fn subheading(&mut self, text: &str) {
        self.spacer(4);
        self.line_with(text, 13, true, 0);
    }

    fn line(&mut self, text: &str) {
        self.line_with(text, 10, false, 0);
    }

    fn bold(&mut self, text: &str) {
        self.line_with(text, 10, true, 0);
    }

    fn quote(&mut self, text: &str) {
        self.line_with(text, 10, false, 24);
    }

    fn line_with(&mut self, text: &str, size: i64, bold: bool, indent: i64) {
        let usable = PAGE_WIDTH - 2 * MARGIN - indent;
        let max_chars = ((usable as f64) / (size as f64 * GLYPH_WIDTH_RATIO)).max(8.0) as usize;
        let leading = size + 4;
        let font = if bold { "F2" } else { "F1" };

        for wrapped in wrap_text(&sanitize(text), max_chars) {
            if self.y < MARGIN + leading {
                self.new_page();
            }
            let ops = self.pages.last_mut().expect("builder always has a page");
            ops.push(Operation::new("BT", vec![]));
            ops.push(Operation::new("Tf", vec![font.into(), size.into()]));
            ops.push(Operation::new(
                "Td",
                vec![(MARGIN + indent).into(), self.y.into()],
            ));
            ops.push(Operation::new("Tj", vec![Object::string_literal(wrapped)]));
            ops.push(Operation::new("ET", vec![]));
            self.y -= leading;
        }
    }
}

/// Map text onto the Latin-1 range Helvetica can show; typographic
/// punctuation is straightened rather than dropped.
fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{201c}' | '\u{201d}' => '"',
            '\u{2013}' | '\u{2014}' => '-',
            '\u{2026}' => '.',
            c if (c as u32) < 256 => c,
            _ => '?',
        })
        .collect()
}

/// Greedy word wrap on whitespace. Overlong single words are split hard.
fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > max_chars {
            lines.push(std::mem::take(&mut current));
        }
        if word.chars().count() > max_chars {
            // Hard-split a word that cannot fit on any line.
            let mut rest: String = word.to_string();
            while rest.chars().count() > max_chars {
                let head: String = rest.chars().take(max_chars).collect();
                let tail: String = rest.chars().skip(max_chars).collect();
                lines.push(head);
                rest = tail;
            }
            current = rest;
            continue;
        }
        if current.is_empty() {
            current = word.to_string();
        } else {
            current.push(' ');
            current.push_str(word);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

fn build_body(data: &ExportData, options: &ReportOptions) -> PdfBuilder {
    let mut pdf = PdfBuilder::new();

    if options.section_enabled(render::SECTION_COVER) {
        pdf.spacer(120);
        pdf.line_with(&render::report_title(data, options), 22, true, 0);
        if let Some(subtitle) = render::report_subtitle(data, options) {
            pdf.line_with(&subtitle, 14, false, 0);
        }
        if let Some(author) = &options.author_name {
            pdf.line(&format!("Prepared by {}", author));
        }
        pdf.spacer(12);
        pdf.line(&format!(
            "{} documents, {} findings, {} contradictions, {} entities",
            data.summary.document_count,
            data.summary.finding_count,
            data.summary.contradiction_count,
            data.summary.entity_count
        ));
        pdf.new_page();
    }

    if options.include_table_of_contents && options.section_enabled(render::SECTION_TOC) {
        pdf.heading("Contents");
        for (idx, title) in section_titles(options).iter().enumerate() {
            pdf.line(&format!("{}. {}", idx + 1, title));
        }
        pdf.spacer(10);
    }

    if options.section_enabled(render::SECTION_SUMMARY) {
        pdf.heading("Executive Summary");
        pdf.line(&format!(
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
            pdf.line(&format!("{}: {}", severity.label(), count));
        }
        pdf.spacer(10);
    }

    if options.include_methodology && options.section_enabled(render::SECTION_METHODOLOGY) {
        pdf.heading("Methodology");
        if data.methodology.data_sources.is_empty() {
            pdf.line(&render::none_available("data sources"));
        }
        for source in &data.methodology.data_sources {
            let range = match (&source.earliest, &source.latest) {
                (Some(earliest), Some(latest)) => format!(" ({} to {})", earliest, latest),
                _ => String::new(),
            };
            pdf.line(&format!(
                "{}: {} document(s){}",
                source.doc_type, source.count, range
            ));
        }
        if !data.methodology.analysis_methods.is_empty() {
            pdf.bold("Analysis methods applied:");
            for method in &data.methodology.analysis_methods {
                pdf.line(&format!(
                    "{} ({} finding(s))",
                    method.engine, method.finding_count
                ));
            }
        }
        pdf.bold("Confidence interpretation:");
        pdf.line(&data.methodology.confidence_explanation);
        pdf.bold("Limitations:");
        for limitation in &data.methodology.limitations {
            pdf.line(limitation);
        }
        pdf.spacer(10);
    }

    if options.section_enabled(render::SECTION_FINDINGS) {
        pdf.heading("Findings");
        let groups = render::group_by_severity(&data.findings);
        if groups.is_empty() {
            pdf.line(&render::none_available("findings"));
        }
        for (severity, findings) in groups {
            pdf.subheading(&format!("{} severity", severity.label()));
            for f in findings {
                pdf.bold(&format!(
                    "[{}] {}",
                    severity.label().to_uppercase(),
                    f.finding.title
                ));
                pdf.line(&render::display_description(&f.finding.description));
                pdf.line(&format!(
                    "Engine: {} - Confidence: {}",
                    f.finding.engine.as_deref().unwrap_or("unknown"),
                    render::confidence_pct(f.finding.confidence)
                ));
                for quote in f.quotes.iter().take(render::MAX_QUOTES_PER_FINDING) {
                    pdf.quote(&format!("\"{}\"", quote.text));
                }
                for citation in f.citations.iter().take(render::MAX_CITATIONS_PER_FINDING) {
                    pdf.line(&format!("Cited: {}", citation.formatted));
                }
                pdf.spacer(6);
            }
        }
    }

    if options.section_enabled(render::SECTION_CONTRADICTIONS) {
        pdf.heading("Contradictions");
        if data.contradictions.is_empty() {
            pdf.line(&render::none_available("contradictions"));
        } else {
            for c in data
                .contradictions
                .iter()
                .take(render::MAX_CONTRADICTIONS_OVERVIEW)
            {
                pdf.line(&format!(
                    "[{}] {} | A {}: {} | B {}: {}",
                    c.severity.label(),
                    c.contradiction.title,
                    c.source_a.citation.document_name,
                    render::overview_text(&c.source_a.quote.text),
                    c.source_b.citation.document_name,
                    render::overview_text(&c.source_b.quote.text),
                ));
            }
            pdf.spacer(6);

            pdf.subheading("Detailed breakdown");
            for c in data
                .contradictions
                .iter()
                .take(render::MAX_CONTRADICTIONS_DETAIL)
            {
                pdf.bold(&format!(
                    "[{}] {}",
                    c.severity.label().to_uppercase(),
                    c.contradiction.title
                ));
                if let Some(description) = &c.contradiction.description {
                    pdf.line(&render::display_description(description));
                }
                pdf.line(&format!("Source A - {}", c.source_a.citation.formatted));
                pdf.quote(&format!("\"{}\"", c.source_a.quote.text));
                pdf.line(&format!("Source B - {}", c.source_b.citation.formatted));
                pdf.quote(&format!("\"{}\"", c.source_b.quote.text));
                pdf.spacer(6);
            }
        }
    }

    if options.section_enabled(render::SECTION_ENTITIES) {
        pdf.heading("Entities");
        if data.entities.is_empty() {
            pdf.line(&render::none_available("entities"));
        }
        for e in &data.entities {
            let mut line = e.entity.canonical_name.clone();
            if let Some(entity_type) = &e.entity.entity_type {
                line.push_str(&format!(" ({})", entity_type));
            }
            pdf.bold(&line);
            if let Some(role) = &e.entity.role {
                pdf.line(&format!("Role: {}", role));
            }
            if let Some(institution) = &e.entity.institution {
                pdf.line(&format!("Institution: {}", institution));
            }
            for doc in e.documents.iter().take(render::MAX_ENTITY_DOC_REFS) {
                pdf.line(&format!(
                    "Mentioned in {} ({} mention(s))",
                    doc.document_name, doc.mention_count
                ));
            }
            pdf.line(&format!(
                "Related findings: {} - Related contradictions: {}",
                e.related_finding_ids.len(),
                e.related_contradiction_ids.len()
            ));
            pdf.spacer(6);
        }
    }

    if options.include_audit_trails && options.section_enabled(render::SECTION_AUDIT_TRAIL) {
        pdf.heading("Audit Trail");
        if data.audit_trails.is_empty() {
            pdf.line(&render::none_available("audit trails"));
        }
        for trail in data.audit_trails.iter().take(render::MAX_AUDIT_TRAILS) {
            pdf.bold(&trail.summary);
            for (idx, step) in trail.steps.iter().enumerate() {
                pdf.line(&format!(
                    "{}. {} - {} (confidence: {})",
                    idx + 1,
                    step.step_type.label(),
                    step.description,
                    render::confidence_pct(step.confidence)
                ));
            }
            pdf.spacer(6);
        }
    }

    if options.section_enabled(render::SECTION_CITATIONS) {
        pdf.heading("Citations");
        if data.citations.is_empty() {
            pdf.line(&render::none_available("citations"));
        }
        for citation in &data.citations {
            pdf.line(&citation.formatted);
        }
    }

    if options.include_timestamp {
        pdf.spacer(10);
        pdf.line(&format!(
            "Generated at {}",
            data.metadata.generated_at.format("%Y-%m-%dT%H:%M:%SZ")
        ));
    }

    pdf
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

/// Render the aggregate as a PDF blob.
pub fn assemble(data: &ExportData, options: &ReportOptions) -> Result<Vec<u8>> {
    let builder = build_body(data, options);

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_regular = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let font_bold = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_regular,
            "F2" => font_bold,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    let page_count = builder.pages.len();
    for operations in builder.pages {
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => page_count as i64,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut blob = Vec::new();
    doc.save_to(&mut blob)?;
    Ok(blob)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_splits_on_word_boundaries() {
        let lines = wrap_text("alpha beta gamma delta", 11);
        assert_eq!(lines, vec!["alpha beta", "gamma delta"]);
    }

    #[test]
    fn wrap_hard_splits_overlong_words() {
        let lines = wrap_text("abcdefghijklmnop", 5);
        assert!(lines.iter().all(|l| l.chars().count() <= 5));
        assert_eq!(lines.concat(), "abcdefghijklmnop");
    }

    #[test]
    fn sanitize_straightens_typographic_punctuation() {
        assert_eq!(sanitize("\u{201c}hi\u{201d} \u{2014} bye\u{2026}"), "\"hi\" - bye.");
    }
}
