//! `skfair report`: per-group fairness report over label columns of a file.
use std::path::PathBuf;

use anyhow::{Context, Result};

use skfair_classifiers::io::read_label_columns;
use skfair_classifiers::report::{fairness_report, OutputFormat, RenderedReport, ReportConfig};

use crate::util::{validate_tsv_or_csv_file, write_text_output};

#[derive(Debug, Clone)]
pub struct ReportArgs {
    pub data: String,
    pub y_true_column: String,
    pub y_pred_column: String,
    pub group_column: String,
    pub format: OutputFormat,
    /// `(negative, positive)`; inferred from the data when unset.
    pub labels: Option<(String, String)>,
    pub output: Option<PathBuf>,
}

pub fn render_report(args: &ReportArgs) -> Result<String> {
    validate_tsv_or_csv_file(&args.data)?;
    let mut columns = read_label_columns(
        &args.data,
        &[
            args.y_true_column.as_str(),
            args.y_pred_column.as_str(),
            args.group_column.as_str(),
        ],
        None,
    )?;
    let groups = columns.pop().unwrap_or_default();
    let y_pred = columns.pop().unwrap_or_default();
    let y_true = columns.pop().unwrap_or_default();

    let mut config = ReportConfig::default();
    if let Some((negative, positive)) = &args.labels {
        config = config.with_labels(negative.clone(), positive.clone());
    }
    let report = fairness_report(&y_true, &y_pred, &groups, None, &config)
        .with_context(|| format!("Failed to build the fairness report for {}", args.data))?;

    Ok(match report.render(args.format)? {
        RenderedReport::Text(text) | RenderedReport::Json(text) | RenderedReport::Html(text) => {
            text
        }
        RenderedReport::Table(table) => serde_json::to_string_pretty(&table)?,
        RenderedReport::Dict(dict) => serde_json::to_string_pretty(&dict)?,
    })
}

pub fn run_report(args: &ReportArgs) -> Result<()> {
    let rendered = render_report(args)?;
    write_text_output(args.output.as_deref(), &rendered)
}
