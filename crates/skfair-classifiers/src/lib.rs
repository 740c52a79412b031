//! skfair-classifiers: fairness-aware linear classification.
//!
//! This crate provides logistic-regression style classifiers whose fit is
//! constrained on the covariance between sensitive attributes and the
//! decision function (demographic parity, equal opportunity), one-vs-rest
//! and one-vs-one composition for multiclass targets, fairness metrics and
//! scorers, and a per-group fairness report.
//!
//! The numerical core is a small purpose-built solver for the single problem
//! family the classifiers need; data loading, model selection and
//! preprocessing helpers sit around it for the CLI and examples.
pub mod config;
pub mod data;
pub mod error;
pub mod io;
pub mod metrics;
pub mod model_selection;
pub mod models;
pub mod preprocessing;
pub mod report;
pub mod solver;

pub use config::{ClassifierParams, ModelConfig, MultiClass, Penalty};
pub use data::{ColumnRef, DesignMatrix, Label, SensitiveColumns};
pub use error::{FairnessError, Result};
pub use models::classifier_trait::Classifier;
pub use models::constraints::{
    BasePolicy, ConstraintPolicy, DemographicParity, EqualOpportunity, FairnessConstraint,
};
pub use models::factory::{
    build_model, demographic_parity_classifier, equal_opportunity_classifier, FairModel,
};
pub use models::fair_classifier::{FairClassifier, LinearFit};
