use approx::assert_abs_diff_eq;
use skfair_classifiers::report::{
    fairness_report, FairnessReport, OutputFormat, RenderedReport, ReportConfig,
};

fn colour_report() -> FairnessReport {
    let names: Vec<String> = ["b", "r", "b", "r", "b"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    fairness_report(
        &[0, 0, 1, 1, 1],
        &[0, 0, 0, 1, 1],
        &[0, 1, 0, 1, 0],
        Some(names.as_slice()),
        &ReportConfig::default(),
    )
    .unwrap()
}

#[test]
fn groups_and_supports() {
    let report = colour_report();
    let table = report.to_table();
    assert_eq!(table.index, vec!["b", "r"]);
    assert_eq!(table.values[[0, 6]], 3.0);
    assert_eq!(table.values[[1, 6]], 2.0);

    let dict = report.to_dict();
    assert_abs_diff_eq!(dict["b"]["TPR"], 0.5, epsilon = 1e-9);
    // r: y_true [0, 1], y_pred [0, 1]
    assert_abs_diff_eq!(dict["r"]["ACC"], 1.0, epsilon = 1e-9);
    assert_abs_diff_eq!(dict["r"]["FDR"], 0.0, epsilon = 1e-9);
}

#[test]
fn groups_without_names_use_their_values() {
    let report = fairness_report(
        &["n", "y", "y"],
        &["n", "y", "n"],
        &["x", "x", "w"],
        None,
        &ReportConfig::default().with_digits(2),
    )
    .unwrap();
    let text = report.to_string();
    assert!(text.lines().nth(2).unwrap().starts_with("x "));
    assert!(text.contains("      1.00"));
}

#[test]
fn every_output_format_renders() {
    let report = colour_report();
    for key in ["text", "table", "dataframe", "dict", "json", "html"] {
        let format: OutputFormat = key.parse().unwrap();
        let rendered = report.render(format).unwrap();
        match rendered {
            RenderedReport::Text(text) => assert!(text.contains("Support")),
            RenderedReport::Table(table) => assert_eq!(table.columns.len(), 7),
            RenderedReport::Dict(dict) => assert_eq!(dict.len(), 2),
            RenderedReport::Json(json) => {
                let value: serde_json::Value = serde_json::from_str(&json).unwrap();
                assert_eq!(value["rows"][1]["group"], "r");
            }
            RenderedReport::Html(html) => {
                assert!(html.starts_with("<!DOCTYPE html>"));
                assert!(html.contains("plotly"));
                assert!(html.contains("Per-group metrics"));
            }
        }
    }
}

#[test]
fn mismatched_inputs_are_rejected() {
    let config = ReportConfig::default();
    assert!(fairness_report(&[0, 1], &[0, 1], &[0], None, &config).is_err());
    let names = vec!["a".to_string()];
    assert!(fairness_report(&[0, 1], &[0, 1], &[0, 0], Some(names.as_slice()), &config).is_err());
}

#[test]
fn custom_metric_is_appended() {
    let config = ReportConfig::default().with_metric("TP", |c| c.tp as f64);
    let report = fairness_report(&[0, 1, 1], &[0, 1, 1], &[0, 0, 0], None, &config).unwrap();
    assert_eq!(report.metric_names.last().unwrap(), "TP");
    assert_eq!(report.to_dict()["0"]["TP"], 2.0);
}
