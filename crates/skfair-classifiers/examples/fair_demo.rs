use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use skfair_classifiers::metrics::p_percent_score;
use skfair_classifiers::report::{fairness_report, ReportConfig};
use skfair_classifiers::{
    demographic_parity_classifier, Classifier, ClassifierParams, DesignMatrix, MultiClass,
    SensitiveColumns,
};

fn main() {
    env_logger::init();

    // Synthetic loan data: income leaks the sensitive attribute `group`
    let mut rng = StdRng::seed_from_u64(2017);
    let n = 400;
    let mut values = Vec::with_capacity(n * 3);
    let mut y = Vec::with_capacity(n);
    for _ in 0..n {
        let group = if rng.gen::<f64>() < 0.5 { 1.0 } else { 0.0 };
        let income = rng.gen_range(-1.0..1.0) + 0.8 * group;
        let debt = rng.gen_range(-1.0..1.0);
        let approved = income - 0.5 * debt + rng.gen_range(-0.5..0.5) > 0.3;
        values.extend([income, debt, group]);
        y.push(if approved { "approved" } else { "denied" }.to_string());
    }
    let x = DesignMatrix::with_column_names(
        ndarray::Array2::from_shape_vec((n, 3), values).expect("failed to create feature matrix"),
        vec!["income".into(), "debt".into(), "group".into()],
    )
    .expect("column names do not match");

    let params = ClassifierParams::new(SensitiveColumns::names(["group"]));
    let scorer = p_percent_score("group", "approved".to_string());
    let groups: Vec<f64> = x.values().column(2).to_vec();

    for threshold in [None, Some(0.1), Some(0.0)] {
        let mut clf = demographic_parity_classifier(
            params.clone(),
            threshold,
            MultiClass::Binary,
            1,
        );
        clf.fit(&x, &y).expect("fit failed");
        let preds = clf.predict(&x).expect("predict failed");
        let accuracy = preds.iter().zip(&y).filter(|(p, t)| p == t).count() as f64 / n as f64;
        let fitted: &dyn Classifier<String> = &clf;
        let p_percent = scorer(fitted, &x, None).expect("scoring failed");
        println!(
            "covariance_threshold={:?}: accuracy={:.3} p%={:.3}",
            threshold, accuracy, p_percent
        );

        if threshold == Some(0.0) {
            let report = fairness_report(
                &y,
                &preds,
                &groups,
                None,
                &ReportConfig::default().with_labels("denied".to_string(), "approved".to_string()),
            )
            .expect("report failed");
            println!("{}", report);
            let path = std::env::temp_dir().join("skfair_demo_report.html");
            std::fs::write(&path, report.to_html("Demographic parity demo"))
                .expect("failed to write report");
            println!("HTML report written to {}", path.display());
        }
    }
}
