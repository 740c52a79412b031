//! Minimal HTML report document: a header, titled sections holding markup
//! or plotly charts, and a footer with the generation time.
use std::fs;
use std::path::Path;

use chrono::Local;
use maud::{html, Markup, PreEscaped, DOCTYPE};
use plotly::Plot;

const PLOTLY_JS: &str = "https://cdn.plot.ly/plotly-2.27.0.min.js";

pub struct ReportSection {
    title: String,
    content: Vec<Markup>,
}

impl ReportSection {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            content: Vec::new(),
        }
    }

    pub fn add_content(&mut self, content: Markup) {
        self.content.push(content);
    }

    /// Embed a chart; the page loads plotly.js once for all of them.
    pub fn add_plot(&mut self, plot: Plot) {
        self.content.push(PreEscaped(plot.to_inline_html(None)));
    }

    fn render(&self) -> Markup {
        html! {
            section {
                h2 { (self.title) }
                @for block in &self.content {
                    div class="block" { (block) }
                }
            }
        }
    }
}

pub struct Report {
    title: String,
    version: String,
    subtitle: String,
    sections: Vec<ReportSection>,
}

impl Report {
    pub fn new(title: &str, version: &str, subtitle: &str) -> Self {
        Self {
            title: title.to_string(),
            version: version.to_string(),
            subtitle: subtitle.to_string(),
            sections: Vec::new(),
        }
    }

    pub fn add_section(&mut self, section: ReportSection) {
        self.sections.push(section);
    }

    pub fn render(&self) -> String {
        let generated = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let page = html! {
            (DOCTYPE)
            html lang="en" {
                head {
                    meta charset="utf-8";
                    title { (self.title) }
                    script src=(PLOTLY_JS) {}
                    style {
                        "body { font-family: sans-serif; margin: 2em; }
                        table.metrics { border-collapse: collapse; }
                        table.metrics th, table.metrics td { border: 1px solid #ccc; padding: 4px 10px; text-align: right; }
                        .block { margin-bottom: 1.5em; }"
                    }
                }
                body {
                    header {
                        h1 { (self.title) }
                        p { (self.subtitle) " (v" (self.version) ")" }
                    }
                    @for section in &self.sections {
                        (section.render())
                    }
                    footer {
                        p { "Generated " (generated) }
                    }
                }
            }
        };
        page.into_string()
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        fs::write(path, self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_sections_in_order() {
        let mut report = Report::new("Fairness", "0.1.0", "Test page");
        let mut first = ReportSection::new("First");
        first.add_content(html! { p { "alpha" } });
        report.add_section(first);
        report.add_section(ReportSection::new("Second"));

        let page = report.render();
        assert!(page.starts_with("<!DOCTYPE html>"));
        let first_at = page.find("First").unwrap();
        let second_at = page.find("Second").unwrap();
        assert!(first_at < second_at);
        assert!(page.contains("<p>alpha</p>"));
    }
}
