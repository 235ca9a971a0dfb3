use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::data::RecordSet;
use crate::error::Result;
use crate::ir::{Outcome, OutcomeKind, RenderResult, SkipReason};
use crate::registry::{PAGE_SUBTITLE, PAGE_TITLE};

/// Title block shown above all sections
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageHeader {
    pub title: String,
    pub subtitle: String,
}

impl PageHeader {
    pub fn dashboard() -> Self {
        Self {
            title: PAGE_TITLE.to_string(),
            subtitle: PAGE_SUBTITLE.to_string(),
        }
    }
}

/// Receives render results in registry order
pub trait PresentationSink {
    fn begin(&mut self, header: &PageHeader) -> Result<()>;
    fn accept(&mut self, result: &RenderResult) -> Result<()>;
    fn finish(&mut self) -> Result<()>;
}

/// Drain `results` into `sink` one at a time. Returns the number of results.
pub fn present<I, S>(results: I, header: &PageHeader, sink: &mut S) -> Result<usize>
where
    I: IntoIterator<Item = RenderResult>,
    S: PresentationSink + ?Sized,
{
    sink.begin(header)?;
    let mut count = 0;
    for result in results {
        sink.accept(&result)?;
        count += 1;
    }
    sink.finish()?;
    Ok(count)
}

// =============================================================================
// Manifest
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManifestEntry {
    pub index: usize,
    pub heading: String,
    pub outcome: OutcomeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<SkipReason>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Manifest {
    pub title: String,
    pub subtitle: String,
    pub sections: Vec<ManifestEntry>,
}

// =============================================================================
// HTML sink
// =============================================================================

const PAGE_HEAD: &str = r#"<!doctype html>
<html>
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>__TITLE__</title>
<style>
  body { font-family: system-ui, -apple-system, Segoe UI, Roboto, Arial, sans-serif; margin: 0 auto; max-width: 960px; padding: 16px; }
  header { border-bottom: 1px solid #ddd; margin-bottom: 16px; }
  .subtitle { color: #555; }
  section { margin-bottom: 32px; }
  table { border-collapse: collapse; width: 100%; margin-top: 8px; overflow-x: auto; display: block; }
  th, td { border-bottom: 1px solid #eee; padding: 6px 8px; text-align: left; font-size: 14px; white-space: nowrap; }
  th { background: #fafafa; border-bottom: 1px solid #ddd; }
  img { max-width: 100%; }
</style>
</head>
<body>
<header>
  <h1>__TITLE__</h1>
  <p class="subtitle">__SUBTITLE__</p>
</header>
"#;

const PAGE_TAIL: &str = "</body>\n</html>\n";

/// Writes one image per chart, then `index.html` and `manifest.json`
pub struct HtmlSink {
    out_dir: PathBuf,
    header: PageHeader,
    body: String,
    skipped: Vec<String>,
    entries: Vec<ManifestEntry>,
}

impl HtmlSink {
    /// Create the sink, making `out_dir` if needed
    pub fn new(out_dir: impl Into<PathBuf>) -> Result<Self> {
        let out_dir = out_dir.into();
        fs::create_dir_all(&out_dir)?;
        Ok(Self {
            out_dir,
            header: PageHeader::dashboard(),
            body: String::new(),
            skipped: Vec::new(),
            entries: Vec::new(),
        })
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    pub fn manifest(&self) -> Manifest {
        Manifest {
            title: self.header.title.clone(),
            subtitle: self.header.subtitle.clone(),
            sections: self.entries.clone(),
        }
    }

    fn push_heading(&mut self, heading: &str) {
        self.body.push_str("<section>\n  <h2>");
        self.body.push_str(&escape_html(heading));
        self.body.push_str("</h2>\n");
    }
}

impl PresentationSink for HtmlSink {
    fn begin(&mut self, header: &PageHeader) -> Result<()> {
        self.header = header.clone();
        self.body.clear();
        self.skipped.clear();
        self.entries.clear();
        Ok(())
    }

    fn accept(&mut self, result: &RenderResult) -> Result<()> {
        let mut entry = ManifestEntry {
            index: result.index,
            heading: result.heading.clone(),
            outcome: result.outcome.kind(),
            title: None,
            kind: None,
            file: None,
            rows: None,
            skip: None,
        };

        match &result.outcome {
            Outcome::Table(table) => {
                self.push_heading(&result.heading);
                self.body.push_str(&html_table(table));
                self.body.push_str("</section>\n");
                entry.rows = Some(table.len());
            }
            Outcome::Chart(chart) => {
                let file = format!(
                    "{:02}-{}.{}",
                    result.index,
                    slugify(&result.heading),
                    chart.image.format.extension()
                );
                let path = self.out_dir.join(&file);
                fs::write(&path, &chart.image.bytes)?;
                info!(path = %path.display(), bytes = chart.image.bytes.len(), "wrote chart");

                self.push_heading(&result.heading);
                self.body.push_str("  <figure><img src=\"");
                self.body.push_str(&escape_html(&file));
                self.body.push_str("\" alt=\"");
                self.body.push_str(&escape_html(&chart.title));
                self.body.push_str("\"></figure>\n</section>\n");

                entry.title = Some(chart.title.clone());
                entry.kind = Some(chart.kind);
                entry.file = Some(file);
            }
            Outcome::Skip(reason) => {
                // Heading stays on the page, body is left empty
                debug!(heading = %result.heading, %reason, "section has no content");
                self.push_heading(&result.heading);
                self.body.push_str("</section>\n");
                self.skipped.push(format!("{} ({})", result.heading, reason));
                entry.skip = Some(reason.clone());
            }
        }

        self.entries.push(entry);
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let mut page = PAGE_HEAD
            .replace("__TITLE__", &escape_html(&self.header.title))
            .replace("__SUBTITLE__", &escape_html(&self.header.subtitle));
        if !self.skipped.is_empty() {
            page.push_str("<!-- skipped sections:\n");
            for line in &self.skipped {
                // "--" would end the comment early
                page.push_str(&format!("  {}\n", line.replace("--", "- -")));
            }
            page.push_str("-->\n");
        }
        page.push_str(&self.body);
        page.push_str(PAGE_TAIL);

        let index = self.out_dir.join("index.html");
        fs::write(&index, page)?;
        info!(path = %index.display(), "wrote dashboard page");

        let manifest = self.out_dir.join("manifest.json");
        fs::write(&manifest, serde_json::to_string_pretty(&self.manifest())?)?;
        info!(path = %manifest.display(), sections = self.entries.len(), "wrote manifest");
        Ok(())
    }
}

fn html_table(table: &RecordSet) -> String {
    let mut out = String::from("  <table>\n    <thead><tr>");
    for header in &table.headers {
        out.push_str("<th>");
        out.push_str(&escape_html(header));
        out.push_str("</th>");
    }
    out.push_str("</tr></thead>\n    <tbody>\n");
    for row in &table.rows {
        out.push_str("      <tr>");
        for cell in row {
            out.push_str("<td>");
            out.push_str(&escape_html(&cell.to_string()));
            out.push_str("</td>");
        }
        out.push_str("</tr>\n");
    }
    out.push_str("    </tbody>\n  </table>\n");
    out
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Lowercase ASCII slug: runs of anything else become a single '-'
pub fn slugify(s: &str) -> String {
    let mut slug = String::new();
    for c in s.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        slug.push_str("chart");
    }
    slug
}

// =============================================================================
// In-memory sink
// =============================================================================

/// Collects everything it is given
#[derive(Debug, Default)]
pub struct MemorySink {
    pub header: Option<PageHeader>,
    pub results: Vec<RenderResult>,
    pub finished: bool,
}

impl PresentationSink for MemorySink {
    fn begin(&mut self, header: &PageHeader) -> Result<()> {
        self.header = Some(header.clone());
        Ok(())
    }

    fn accept(&mut self, result: &RenderResult) -> Result<()> {
        self.results.push(result.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Value;
    use crate::ir::{Figure, Image, RenderedChart};
    use crate::OutputFormat;
    use pretty_assertions::assert_eq;

    fn chart_result(index: usize, heading: &str) -> RenderResult {
        RenderResult {
            index,
            heading: heading.to_string(),
            outcome: Outcome::Chart(RenderedChart {
                title: "Reason for Migration".to_string(),
                kind: "count_bar",
                figure: Figure::Bars {
                    x_label: "Migration_Reason".to_string(),
                    bars: vec![("Breeding".to_string(), 2.0)],
                    palette: crate::ir::PaletteName::Husl,
                    label_rotation: 0,
                },
                image: Image {
                    format: OutputFormat::Png,
                    bytes: vec![137, 80, 78, 71],
                },
            }),
        }
    }

    fn table_result() -> RenderResult {
        RenderResult {
            index: 0,
            heading: "Dataset Overview".to_string(),
            outcome: Outcome::Table(RecordSet::new(
                vec!["Species".to_string(), "Flock_Size".to_string()],
                vec![vec![Value::Text("<Stork>".to_string()), Value::Missing]],
            )),
        }
    }

    fn skip_result() -> RenderResult {
        RenderResult {
            index: 2,
            heading: "Bird Habitat Types".to_string(),
            outcome: Outcome::Skip(SkipReason::MissingColumns(vec!["Habitat".to_string()])),
        }
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Migration Success by Region"), "migration-success-by-region");
        assert_eq!(slugify("  Pairplot!! "), "pairplot");
        assert_eq!(slugify("***"), "chart");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<a href='x'>&</a>"), "&lt;a href=&#39;x&#39;&gt;&amp;&lt;/a&gt;");
    }

    #[test]
    fn test_memory_sink_collects_in_order() {
        let mut sink = MemorySink::default();
        let results = vec![table_result(), chart_result(1, "Migration Reason Count"), skip_result()];
        let count = present(results.clone(), &PageHeader::dashboard(), &mut sink).unwrap();
        assert_eq!(count, 3);
        assert!(sink.finished);
        assert_eq!(sink.header, Some(PageHeader::dashboard()));
        assert_eq!(sink.results, results);
    }

    #[test]
    fn test_html_sink_writes_page_images_and_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = HtmlSink::new(dir.path().join("out")).unwrap();
        let results = vec![table_result(), chart_result(1, "Migration Reason Count"), skip_result()];
        present(results, &PageHeader::dashboard(), &mut sink).unwrap();

        let out = dir.path().join("out");
        let image = fs::read(out.join("01-migration-reason-count.png")).unwrap();
        assert_eq!(image, vec![137, 80, 78, 71]);

        let page = fs::read_to_string(out.join("index.html")).unwrap();
        assert!(page.contains("<h1>Bird Migration Visualization Dashboard</h1>"));
        assert!(page.contains("&lt;Stork&gt;"));
        assert!(page.contains("<td>NaN</td>"));
        assert!(page.contains("src=\"01-migration-reason-count.png\""));
        assert!(page.contains("<section>\n  <h2>Bird Habitat Types</h2>\n</section>"));
        assert!(page.contains("Bird Habitat Types (missing columns: Habitat)"));

        let manifest: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(out.join("manifest.json")).unwrap()).unwrap();
        let sections = manifest["sections"].as_array().unwrap();
        assert_eq!(sections.len(), 3);
        assert_eq!(sections[0]["outcome"], "table");
        assert_eq!(sections[0]["rows"], 1);
        assert_eq!(sections[1]["file"], "01-migration-reason-count.png");
        assert_eq!(sections[2]["skip"]["reason"], "missing_columns");
        assert_eq!(sections[2]["skip"]["detail"][0], "Habitat");
    }

    #[test]
    fn test_html_sink_sections_follow_result_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = HtmlSink::new(dir.path()).unwrap();
        present(
            vec![table_result(), chart_result(1, "Migration Reason Count")],
            &PageHeader::dashboard(),
            &mut sink,
        )
        .unwrap();
        let page = fs::read_to_string(dir.path().join("index.html")).unwrap();
        let overview = page.find("Dataset Overview").unwrap();
        let reason = page.find("Migration Reason Count").unwrap();
        assert!(overview < reason);
        assert!(!page.contains("skipped sections"));
    }
}
