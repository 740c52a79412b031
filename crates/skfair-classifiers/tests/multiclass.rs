mod common;

use ndarray::Axis;
use skfair_classifiers::models::multiclass::{OneVsOneClassifier, OneVsRestClassifier};
use skfair_classifiers::{
    demographic_parity_classifier, equal_opportunity_classifier, Classifier, ClassifierParams,
    FairModel, FairnessConstraint, FairnessError, MultiClass, SensitiveColumns,
};

use common::{biased_binary, three_classes};

fn params() -> ClassifierParams {
    ClassifierParams::new(SensitiveColumns::names(["z"]))
}

fn accuracy(y_true: &[String], y_pred: &[String]) -> f64 {
    let hits = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();
    hits as f64 / y_true.len() as f64
}

#[test]
fn one_vs_rest_over_three_classes() {
    let (x, y) = three_classes(40, 21);
    let mut model = OneVsRestClassifier::new(
        params(),
        FairnessConstraint::demographic_parity(Some(0.1)),
        1,
    );
    model.fit(&x, &y).unwrap();
    assert_eq!(model.estimators().len(), 3);
    assert_eq!(model.classes(), ["a", "b", "c"]);

    let predictions = model.predict(&x).unwrap();
    assert!(accuracy(&y, &predictions) > 0.7);

    let proba = model.predict_proba(&x).unwrap();
    assert_eq!(proba.dim(), (120, 3));
    for row in proba.axis_iter(Axis(0)) {
        approx::assert_relative_eq!(row.sum(), 1.0, epsilon = 1e-9);
    }
}

#[test]
fn one_vs_rest_with_two_classes_fits_one_problem() {
    let (x, y) = biased_binary(80, 8);
    let mut model = OneVsRestClassifier::new(
        params(),
        FairnessConstraint::demographic_parity(None),
        1,
    );
    model.fit(&x, &y).unwrap();
    assert_eq!(model.estimators().len(), 1);
    assert_eq!(model.predict_proba(&x).unwrap().ncols(), 2);
}

#[test]
fn one_vs_rest_equal_opportunity_targets_each_sub_problem() {
    let (x, y) = three_classes(40, 23);
    let mut model = OneVsRestClassifier::new(
        params(),
        FairnessConstraint::equal_opportunity(Some(0.1), "b".to_string()),
        1,
    );
    model.fit(&x, &y).unwrap();

    let policies: Vec<FairnessConstraint<bool>> = model
        .estimators()
        .iter()
        .map(|estimator| estimator.policy().clone())
        .collect();
    assert_eq!(
        policies,
        vec![
            FairnessConstraint::equal_opportunity(Some(0.1), false),
            FairnessConstraint::equal_opportunity(Some(0.1), true),
            FairnessConstraint::equal_opportunity(Some(0.1), false),
        ]
    );
}

#[test]
fn one_vs_one_over_three_classes() {
    let (x, y) = three_classes(40, 22);
    let mut model = OneVsOneClassifier::new(
        params(),
        FairnessConstraint::equal_opportunity(Some(0.1), "a".to_string()),
        1,
    );
    model.fit(&x, &y).unwrap();
    assert_eq!(model.estimators().len(), 3);

    let predictions = model.predict(&x).unwrap();
    assert!(accuracy(&y, &predictions) > 0.7);
    assert!(matches!(
        model.predict_proba(&x),
        Err(FairnessError::NotImplemented(_))
    ));
}

#[test]
fn worker_pool_matches_sequential_fit() {
    let (x, y) = three_classes(30, 23);
    let mut sequential = OneVsRestClassifier::new(
        params(),
        FairnessConstraint::demographic_parity(Some(0.05)),
        1,
    );
    let mut pooled = OneVsRestClassifier::new(
        params(),
        FairnessConstraint::demographic_parity(Some(0.05)),
        2,
    );
    sequential.fit(&x, &y).unwrap();
    pooled.fit(&x, &y).unwrap();
    for (a, b) in sequential.estimators().iter().zip(pooled.estimators()) {
        assert_eq!(a.coef().unwrap(), b.coef().unwrap());
        assert_eq!(a.intercept().unwrap(), b.intercept().unwrap());
    }
}

#[test]
fn factory_models_predict_and_survive_serialization() {
    let (x, y) = three_classes(30, 24);
    for multi_class in [MultiClass::OneVsRest, MultiClass::OneVsOne] {
        let mut model: FairModel<String> =
            demographic_parity_classifier(params(), Some(0.1), multi_class, 0);
        model.fit(&x, &y).unwrap();
        let before = model.predict(&x).unwrap();

        let json = serde_json::to_string(&model).unwrap();
        let restored: FairModel<String> = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.multi_class(), multi_class);
        assert_eq!(restored.predict(&x).unwrap(), before);
    }
}

#[test]
fn binary_factory_refuses_three_classes() {
    let (x, y) = three_classes(10, 25);
    let mut model: FairModel<String> = equal_opportunity_classifier(
        params(),
        Some(0.1),
        "a".to_string(),
        MultiClass::Binary,
        1,
    );
    assert!(matches!(
        model.fit(&x, &y),
        Err(FairnessError::Validation(_))
    ));
}
