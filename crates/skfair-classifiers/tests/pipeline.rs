mod common;

use std::fmt::Write as _;

use skfair_classifiers::io::{read_csv_dataset, DatasetReaderConfig};
use skfair_classifiers::metrics::p_percent_score;
use skfair_classifiers::model_selection::{cross_val_score, KFold};
use skfair_classifiers::preprocessing::Scaler;
use skfair_classifiers::{
    ClassifierParams, FairClassifier, FairnessConstraint, SensitiveColumns,
};

use common::biased_binary;

fn write_dataset(dir: &std::path::Path) -> std::path::PathBuf {
    let (x, y) = biased_binary(150, 31);
    let mut text = String::from("id\tx1\tx2\tz\tlabel\n");
    for (i, row) in x.values().rows().into_iter().enumerate() {
        let label = if y[i] == 1 { "yes" } else { "no" };
        writeln!(text, "{}\t{}\t{}\t{}\t{}", i, row[0], row[1], row[2], label).unwrap();
    }
    let path = dir.join("train.tsv");
    std::fs::write(&path, text).unwrap();
    path
}

#[test]
fn read_scale_and_cross_validate() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_dataset(dir.path());

    let mut config = DatasetReaderConfig::new("label");
    config.ignore_columns = vec!["id".to_string()];
    let data = read_csv_dataset(&path, &config).unwrap();
    assert_eq!(data.x.column_names().unwrap(), ["x1", "x2", "z"]);
    assert_eq!(data.y.len(), 150);

    let sensitive = SensitiveColumns::names(["z"]);
    let (_, x) = Scaler::fit_transform(&data.x, &sensitive).unwrap();

    let scorer = p_percent_score("z", "yes".to_string());
    let kfold = KFold::new(3).shuffled(42);
    let build = |threshold: Option<f64>| {
        let params = ClassifierParams::new(sensitive.clone());
        move || {
            FairClassifier::<String>::new(
                params.clone(),
                FairnessConstraint::demographic_parity(threshold),
            )
        }
    };

    let free = cross_val_score(build(None), &x, &data.y, &scorer, &kfold).unwrap();
    let fair = cross_val_score(build(Some(0.0)), &x, &data.y, &scorer, &kfold).unwrap();
    assert_eq!(free.len(), 3);
    assert!(fair.iter().chain(&free).all(|s| (0.0..=1.0).contains(s)));

    let mean = |scores: &[f64]| scores.iter().sum::<f64>() / scores.len() as f64;
    assert!(mean(&fair) > mean(&free));
}
