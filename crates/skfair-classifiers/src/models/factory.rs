use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::config::{ClassifierParams, ModelConfig, MultiClass};
use crate::data::{DesignMatrix, Label};
use crate::error::Result;
use crate::models::classifier_trait::Classifier;
use crate::models::constraints::FairnessConstraint;
use crate::models::fair_classifier::FairClassifier;
use crate::models::multiclass::{OneVsOneClassifier, OneVsRestClassifier};

/// A fair model as composed by [`build_model`]. Serializable, so a fitted
/// model can be written out and read back for prediction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FairModel<L> {
    Binary(FairClassifier<L>),
    OneVsRest(OneVsRestClassifier<L>),
    OneVsOne(OneVsOneClassifier<L>),
}

impl<L: Label> FairModel<L> {
    fn inner(&self) -> &dyn Classifier<L> {
        match self {
            FairModel::Binary(model) => model,
            FairModel::OneVsRest(model) => model,
            FairModel::OneVsOne(model) => model,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Classifier<L> {
        match self {
            FairModel::Binary(model) => model,
            FairModel::OneVsRest(model) => model,
            FairModel::OneVsOne(model) => model,
        }
    }

    pub fn multi_class(&self) -> MultiClass {
        match self {
            FairModel::Binary(_) => MultiClass::Binary,
            FairModel::OneVsRest(_) => MultiClass::OneVsRest,
            FairModel::OneVsOne(_) => MultiClass::OneVsOne,
        }
    }
}

impl<L: Label> Classifier<L> for FairModel<L> {
    fn fit(&mut self, x: &DesignMatrix, y: &[L]) -> Result<()> {
        self.inner_mut().fit(x, y)
    }

    fn predict(&self, x: &DesignMatrix) -> Result<Vec<L>> {
        self.inner().predict(x)
    }

    fn predict_proba(&self, x: &DesignMatrix) -> Result<Array2<f64>> {
        self.inner().predict_proba(x)
    }

    fn classes(&self) -> &[L] {
        self.inner().classes()
    }

    fn name(&self) -> &str {
        self.inner().name()
    }
}

/// Build an unfitted model from a `ModelConfig`.
/// The composition is chosen by `multi_class` alone; nothing is substituted
/// behind the caller's back.
pub fn build_model<L: Label>(config: ModelConfig<L>) -> FairModel<L> {
    let ModelConfig {
        params,
        fairness,
        multi_class,
        n_jobs,
    } = config;
    match multi_class {
        MultiClass::Binary => FairModel::Binary(FairClassifier::new(params, fairness)),
        MultiClass::OneVsRest => {
            FairModel::OneVsRest(OneVsRestClassifier::new(params, fairness, n_jobs))
        }
        MultiClass::OneVsOne => {
            FairModel::OneVsOne(OneVsOneClassifier::new(params, fairness, n_jobs))
        }
    }
}

/// Logistic regression bounded by demographic parity.
pub fn demographic_parity_classifier<L: Label>(
    params: ClassifierParams,
    covariance_threshold: Option<f64>,
    multi_class: MultiClass,
    n_jobs: usize,
) -> FairModel<L> {
    build_model(
        ModelConfig::new(params, FairnessConstraint::demographic_parity(covariance_threshold))
            .with_multi_class(multi_class)
            .with_n_jobs(n_jobs),
    )
}

/// Logistic regression bounded by equal opportunity for `positive_target`.
pub fn equal_opportunity_classifier<L: Label>(
    params: ClassifierParams,
    covariance_threshold: Option<f64>,
    positive_target: L,
    multi_class: MultiClass,
    n_jobs: usize,
) -> FairModel<L> {
    build_model(
        ModelConfig::new(
            params,
            FairnessConstraint::equal_opportunity(covariance_threshold, positive_target),
        )
        .with_multi_class(multi_class)
        .with_n_jobs(n_jobs),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_follows_multi_class() {
        let cfg: ModelConfig<i32> = ModelConfig::default().with_multi_class(MultiClass::OneVsOne);
        let model = build_model(cfg);
        assert_eq!(model.multi_class(), MultiClass::OneVsOne);
        assert_eq!(model.name(), "one_vs_one");
        assert!(model.classes().is_empty());

        let model: FairModel<i32> = demographic_parity_classifier(
            ClassifierParams::default(),
            Some(0.1),
            MultiClass::Binary,
            1,
        );
        assert_eq!(model.name(), "demographic_parity_classifier");
    }

    #[test]
    fn unfitted_model_round_trips_through_json() {
        let model = equal_opportunity_classifier(
            ClassifierParams::default(),
            Some(0.05),
            "yes".to_string(),
            MultiClass::OneVsRest,
            2,
        );
        let json = serde_json::to_string(&model).unwrap();
        assert!(json.contains(r#""kind":"one_vs_rest""#));
        let back: FairModel<String> = serde_json::from_str(&json).unwrap();
        assert_eq!(back.multi_class(), MultiClass::OneVsRest);
    }
}
