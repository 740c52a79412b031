use plotly::layout::{Axis, BarMode, Layout};
use plotly::{Bar, Plot};

use crate::report::fairness_report::FairnessReport;

/// Grouped bar chart: one trace per metric, one bar group per sensitive group.
pub fn plot_group_metrics(report: &FairnessReport, title: &str) -> Plot {
    let groups: Vec<String> = report.rows.iter().map(|row| row.group.clone()).collect();

    let mut plot = Plot::new();
    for (m, name) in report.metric_names.iter().enumerate() {
        let values: Vec<f64> = report.rows.iter().map(|row| row.values[m]).collect();
        plot.add_trace(Bar::new(groups.clone(), values).name(name.as_str()));
    }
    plot.set_layout(
        Layout::new()
            .title(title)
            .bar_mode(BarMode::Group)
            .x_axis(Axis::new().title("Group"))
            .y_axis(Axis::new().title("Value")),
    );
    plot
}
