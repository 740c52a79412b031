//! Per-group classification report.
//!
//! Samples are partitioned by group, each group's 2x2 confusion matrix is
//! reduced to a row of metrics, and the rows are rendered as text, a table,
//! a nested map, JSON or a standalone HTML page.
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::data::{Label, LabelEncoder};
use crate::error::{FairnessError, Result};
use crate::metrics::{confusion_matrix, true_false_positive_negative, Counts, EPSILON};
use crate::report::html::{Report, ReportSection};
use crate::report::plots::plot_group_metrics;

/// A metric computed from a group's confusion counts.
pub type MetricFn = fn(&Counts) -> f64;

fn precision(c: &Counts) -> f64 {
    c.tp as f64 / (c.tp as f64 + c.fp as f64 + EPSILON)
}

fn recall(c: &Counts) -> f64 {
    c.tp as f64 / (c.tp as f64 + c.fn_ as f64 + EPSILON)
}

fn false_positive_rate(c: &Counts) -> f64 {
    c.fp as f64 / (c.fp as f64 + c.tn as f64 + EPSILON)
}

fn false_discovery_rate(c: &Counts) -> f64 {
    c.fp as f64 / (c.tp as f64 + c.fp as f64 + EPSILON)
}

fn accuracy(c: &Counts) -> f64 {
    (c.tp + c.tn) as f64 / (c.total() as f64 + EPSILON)
}

fn f1(c: &Counts) -> f64 {
    let (p, r) = (precision(c), recall(c));
    2.0 * p * r / (p + r + EPSILON)
}

/// Metrics reported when the caller does not choose any.
pub const DEFAULT_METRICS: &[(&str, MetricFn)] = &[
    ("TPR", recall),
    ("FPR", false_positive_rate),
    ("PPVR", precision),
    ("FDR", false_discovery_rate),
    ("ACC", accuracy),
    ("F1", f1),
];

const SUPPORT: &str = "Support";

/// Which metrics to compute and how to read the labels.
#[derive(Debug, Clone)]
pub struct ReportConfig<L> {
    pub metrics: Vec<(String, MetricFn)>,
    /// `(negative, positive)`. When `None`, the data must hold exactly two
    /// labels and the sorted order decides.
    pub labels: Option<(L, L)>,
    /// Decimals in the text rendering.
    pub digits: usize,
}

impl<L> Default for ReportConfig<L> {
    fn default() -> Self {
        Self {
            metrics: DEFAULT_METRICS
                .iter()
                .map(|(name, f)| (name.to_string(), *f))
                .collect(),
            labels: None,
            digits: 3,
        }
    }
}

impl<L> ReportConfig<L> {
    pub fn with_labels(mut self, negative: L, positive: L) -> Self {
        self.labels = Some((negative, positive));
        self
    }

    pub fn with_digits(mut self, digits: usize) -> Self {
        self.digits = digits;
        self
    }

    pub fn with_metric(mut self, name: impl Into<String>, metric: MetricFn) -> Self {
        self.metrics.push((name.into(), metric));
        self
    }
}

/// Metrics of one group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupRow {
    pub group: String,
    /// Same order as `FairnessReport::metric_names`.
    pub values: Vec<f64>,
    pub support: usize,
}

/// The report as a plain table; `Support` is the last column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportTable {
    pub columns: Vec<String>,
    pub index: Vec<String>,
    pub values: Array2<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FairnessReport {
    pub metric_names: Vec<String>,
    pub rows: Vec<GroupRow>,
    #[serde(skip)]
    digits: usize,
}

/// Output format keys accepted by [`FairnessReport::render`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Table,
    Dict,
    Json,
    Html,
}

impl FromStr for OutputFormat {
    type Err = FairnessError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "table" | "dataframe" => Ok(OutputFormat::Table),
            "dict" => Ok(OutputFormat::Dict),
            "json" => Ok(OutputFormat::Json),
            "html" => Ok(OutputFormat::Html),
            _ => Err(FairnessError::configuration(format!(
                "Unknown report output: {}. Valid options are: text, table, dict, json, html",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderedReport {
    Text(String),
    Table(ReportTable),
    Dict(BTreeMap<String, BTreeMap<String, f64>>),
    Json(String),
    Html(String),
}

/// Build the per-group report.
///
/// Group keys are `group_names[i]` when names are given, else `groups[i]`
/// formatted; rows keep the order in which groups first appear.
pub fn fairness_report<L, G>(
    y_true: &[L],
    y_pred: &[L],
    groups: &[G],
    group_names: Option<&[String]>,
    config: &ReportConfig<L>,
) -> Result<FairnessReport>
where
    L: Label,
    G: fmt::Display,
{
    if y_true.len() != y_pred.len() || y_true.len() != groups.len() {
        return Err(FairnessError::validation(format!(
            "y_true, y_pred and groups must have the same length, got {}, {} and {}",
            y_true.len(),
            y_pred.len(),
            groups.len()
        )));
    }
    if let Some(names) = group_names {
        if names.len() != groups.len() {
            return Err(FairnessError::validation(format!(
                "group_names has {} entries for {} samples",
                names.len(),
                groups.len()
            )));
        }
    }

    let labels: [L; 2] = match &config.labels {
        Some((negative, positive)) => [negative.clone(), positive.clone()],
        None => {
            let all: Vec<L> = y_true.iter().chain(y_pred).cloned().collect();
            let classes = LabelEncoder::fit(&all).into_classes();
            match <[L; 2]>::try_from(classes) {
                Ok(labels) => labels,
                Err(classes) => {
                    return Err(FairnessError::validation(format!(
                        "the report needs exactly 2 labels, found {:?}; set ReportConfig::labels",
                        classes
                    )))
                }
            }
        }
    };

    let mut order: Vec<String> = Vec::new();
    let mut members: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (idx, group) in groups.iter().enumerate() {
        let key = match group_names {
            Some(names) => names[idx].clone(),
            None => group.to_string(),
        };
        members
            .entry(key.clone())
            .or_insert_with(|| {
                order.push(key);
                Vec::new()
            })
            .push(idx);
    }

    let mut rows = Vec::with_capacity(order.len());
    for group in order {
        let idx = &members[&group];
        let group_true: Vec<L> = idx.iter().map(|&i| y_true[i].clone()).collect();
        let group_pred: Vec<L> = idx.iter().map(|&i| y_pred[i].clone()).collect();
        let counts = true_false_positive_negative(&confusion_matrix(
            &group_true,
            &group_pred,
            Some(&labels[..]),
        )?)?;
        rows.push(GroupRow {
            values: config.metrics.iter().map(|(_, f)| f(&counts)).collect(),
            support: idx.len(),
            group,
        });
    }

    Ok(FairnessReport {
        metric_names: config.metrics.iter().map(|(name, _)| name.clone()).collect(),
        rows,
        digits: config.digits,
    })
}

impl FairnessReport {
    /// Fixed-width text: group names right-aligned, then one 10-wide column
    /// per metric and `Support`.
    pub fn to_text(&self) -> String {
        let width = self
            .rows
            .iter()
            .map(|row| row.group.len())
            .max()
            .unwrap_or(0);
        let mut out = format!("{:>width$} ", "", width = width);
        for name in self.metric_names.iter().map(String::as_str).chain([SUPPORT]) {
            out.push_str(&format!(" {:>10}", name));
        }
        out.push_str("\n\n");
        for row in &self.rows {
            out.push_str(&format!("{:>width$} ", row.group, width = width));
            for value in &row.values {
                out.push_str(&format!(" {:>10.digits$}", value, digits = self.digits));
            }
            out.push_str(&format!(" {:>10}\n", row.support));
        }
        out.push('\n');
        out
    }

    pub fn to_table(&self) -> ReportTable {
        let n_cols = self.metric_names.len() + 1;
        let mut values = Array2::zeros((self.rows.len(), n_cols));
        for (mut out, row) in values.rows_mut().into_iter().zip(&self.rows) {
            for (cell, value) in out.iter_mut().zip(&row.values) {
                *cell = *value;
            }
            out[n_cols - 1] = row.support as f64;
        }
        ReportTable {
            columns: self
                .metric_names
                .iter()
                .cloned()
                .chain([SUPPORT.to_string()])
                .collect(),
            index: self.rows.iter().map(|row| row.group.clone()).collect(),
            values,
        }
    }

    /// group -> metric -> value, `Support` included.
    pub fn to_dict(&self) -> BTreeMap<String, BTreeMap<String, f64>> {
        self.rows
            .iter()
            .map(|row| {
                let mut metrics: BTreeMap<String, f64> = self
                    .metric_names
                    .iter()
                    .cloned()
                    .zip(row.values.iter().copied())
                    .collect();
                metrics.insert(SUPPORT.to_string(), row.support as f64);
                (row.group.clone(), metrics)
            })
            .collect()
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| FairnessError::validation(format!("could not serialize report: {}", e)))
    }

    /// Standalone page with the table and a grouped bar chart of the metrics.
    pub fn to_html(&self, title: &str) -> String {
        let mut report = Report::new(title, env!("CARGO_PKG_VERSION"), "Fairness Report");

        let mut table_section = ReportSection::new("Per-group metrics");
        table_section.add_content(maud::html! {
            table class="metrics" {
                thead {
                    tr {
                        th { "Group" }
                        @for name in &self.metric_names { th { (name) } }
                        th { (SUPPORT) }
                    }
                }
                tbody {
                    @for row in &self.rows {
                        tr {
                            td { (row.group) }
                            @for value in &row.values {
                                td { (format!("{:.*}", self.digits, value)) }
                            }
                            td { (row.support) }
                        }
                    }
                }
            }
        });
        report.add_section(table_section);

        let mut plot_section = ReportSection::new("Metrics by group");
        plot_section.add_plot(plot_group_metrics(self, title));
        report.add_section(plot_section);

        report.render()
    }

    pub fn render(&self, format: OutputFormat) -> Result<RenderedReport> {
        Ok(match format {
            OutputFormat::Text => RenderedReport::Text(self.to_text()),
            OutputFormat::Table => RenderedReport::Table(self.to_table()),
            OutputFormat::Dict => RenderedReport::Dict(self.to_dict()),
            OutputFormat::Json => RenderedReport::Json(self.to_json()?),
            OutputFormat::Html => RenderedReport::Html(self.to_html("Fairness report")),
        })
    }
}

impl fmt::Display for FairnessReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}
