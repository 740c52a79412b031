pub mod fairness_report;
pub mod html;
pub mod plots;

pub use fairness_report::{
    fairness_report, FairnessReport, GroupRow, MetricFn, OutputFormat, RenderedReport,
    ReportConfig, ReportTable, DEFAULT_METRICS,
};
pub use html::{Report, ReportSection};
