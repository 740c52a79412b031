use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::data::SensitiveColumns;
use crate::error::{FairnessError, Result};
use crate::models::constraints::FairnessConstraint;

/// Norm used to regularize the non-bias coefficients.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Penalty {
    /// `(1 / C) * ||theta||_1`, bias excluded.
    #[default]
    L1,
    None,
}

impl FromStr for Penalty {
    type Err = FairnessError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "l1" => Ok(Penalty::L1),
            "none" => Ok(Penalty::None),
            _ => Err(FairnessError::configuration(format!(
                "penalty should be either 'l1' or 'none', got {}",
                s
            ))),
        }
    }
}

impl fmt::Display for Penalty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Penalty::L1 => write!(f, "l1"),
            Penalty::None => write!(f, "none"),
        }
    }
}

/// How a binary fair classifier is composed for the target at hand.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MultiClass {
    /// A single binary problem; the target must hold exactly two labels.
    #[serde(rename = "binary")]
    Binary,
    #[default]
    #[serde(rename = "ovr")]
    OneVsRest,
    #[serde(rename = "ovo")]
    OneVsOne,
}

impl FromStr for MultiClass {
    type Err = FairnessError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "binary" => Ok(MultiClass::Binary),
            "ovr" => Ok(MultiClass::OneVsRest),
            "ovo" => Ok(MultiClass::OneVsOne),
            _ => Err(FairnessError::configuration(format!(
                "Unknown multi_class mode: {}. Valid options are: binary, ovr, ovo",
                s
            ))),
        }
    }
}

/// Hyper-parameters shared by every fair linear classifier.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ClassifierParams {
    /// Columns holding the sensitive attributes.
    pub sensitive_cols: SensitiveColumns,
    /// Inverse of regularization strength; smaller values regularize more.
    #[serde(alias = "C")]
    pub c: f64,
    pub penalty: Penalty,
    pub fit_intercept: bool,
    /// Iteration budget of the constrained solve.
    pub max_iter: usize,
    pub tol: f64,
    /// Keep the sensitive columns in the trainable feature set.
    pub train_sensitive_cols: bool,
}

impl Default for ClassifierParams {
    fn default() -> Self {
        Self {
            sensitive_cols: SensitiveColumns::default(),
            c: 1.0,
            penalty: Penalty::L1,
            fit_intercept: true,
            max_iter: 100,
            tol: 1e-7,
            train_sensitive_cols: false,
        }
    }
}

impl ClassifierParams {
    pub fn new(sensitive_cols: SensitiveColumns) -> Self {
        Self {
            sensitive_cols,
            ..Default::default()
        }
    }

    pub fn with_c(mut self, c: f64) -> Self {
        self.c = c;
        self
    }

    pub fn with_penalty(mut self, penalty: Penalty) -> Self {
        self.penalty = penalty;
        self
    }

    pub fn with_fit_intercept(mut self, fit_intercept: bool) -> Self {
        self.fit_intercept = fit_intercept;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_train_sensitive_cols(mut self, train_sensitive_cols: bool) -> Self {
        self.train_sensitive_cols = train_sensitive_cols;
        self
    }

    /// Reject hyper-parameters the solver cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.penalty == Penalty::L1 && !(self.c.is_finite() && self.c > 0.0) {
            return Err(FairnessError::configuration(format!(
                "C must be a positive finite number, got {}",
                self.c
            )));
        }
        if self.max_iter == 0 {
            return Err(FairnessError::configuration(
                "max_iter must be at least 1",
            ));
        }
        if !(self.tol.is_finite() && self.tol > 0.0) {
            return Err(FairnessError::configuration(format!(
                "tol must be a positive finite number, got {}",
                self.tol
            )));
        }
        Ok(())
    }
}

/// Central configuration for building a fair model through the factory.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ModelConfig<L> {
    #[serde(flatten)]
    pub params: ClassifierParams,
    pub fairness: FairnessConstraint<L>,
    pub multi_class: MultiClass,
    /// Parallel sub-problem fits: 1 runs sequentially, 0 uses every core.
    pub n_jobs: usize,
}

impl<L> Default for ModelConfig<L> {
    fn default() -> Self {
        Self {
            params: ClassifierParams::default(),
            fairness: FairnessConstraint::default(),
            multi_class: MultiClass::default(),
            n_jobs: 1,
        }
    }
}

impl<L> ModelConfig<L> {
    pub fn new(params: ClassifierParams, fairness: FairnessConstraint<L>) -> Self {
        Self {
            params,
            fairness,
            multi_class: MultiClass::default(),
            n_jobs: 1,
        }
    }

    pub fn with_multi_class(mut self, multi_class: MultiClass) -> Self {
        self.multi_class = multi_class;
        self
    }

    pub fn with_n_jobs(mut self, n_jobs: usize) -> Self {
        self.n_jobs = n_jobs;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn penalty_parses_known_keys() {
        assert_eq!("l1".parse::<Penalty>().unwrap(), Penalty::L1);
        assert_eq!("None".parse::<Penalty>().unwrap(), Penalty::None);
    }

    #[test]
    fn penalty_rejects_l2() {
        let err = "l2".parse::<Penalty>().unwrap_err();
        assert!(matches!(err, FairnessError::Configuration(_)));
        assert!(err.to_string().contains("'l1' or 'none'"));
    }

    #[test]
    fn multi_class_rejects_unknown_key() {
        assert_eq!("ovo".parse::<MultiClass>().unwrap(), MultiClass::OneVsOne);
        assert!(matches!(
            "ova".parse::<MultiClass>(),
            Err(FairnessError::Configuration(_))
        ));
    }

    #[test]
    fn validate_rejects_non_positive_c() {
        let params = ClassifierParams::default().with_c(0.0);
        assert!(params.validate().is_err());
        // C is irrelevant without a penalty
        let params = params.with_penalty(Penalty::None);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn model_config_reads_upper_case_c_alias() {
        let json = r#"{
            "C": 0.5,
            "penalty": "none",
            "sensitive_cols": ["race"],
            "fairness": {"policy": "demographic_parity", "covariance_threshold": 0.1},
            "multi_class": "ovo"
        }"#;
        let cfg: ModelConfig<String> = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.params.c, 0.5);
        assert_eq!(cfg.params.penalty, Penalty::None);
        assert_eq!(cfg.multi_class, MultiClass::OneVsOne);
        assert_eq!(cfg.n_jobs, 1);
        assert!(cfg.params.fit_intercept);
    }
}
