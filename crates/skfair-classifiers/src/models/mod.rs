pub mod classifier_trait;
pub mod constraints;
pub mod factory;
pub mod fair_classifier;
pub mod multiclass;
