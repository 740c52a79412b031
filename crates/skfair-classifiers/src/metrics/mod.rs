//! Classification-quality and fairness metrics.
//!
//! Everything here derives from confusion-matrix counts; the scorers wrap
//! the fairness ratios so model-selection code can call them on any fitted
//! [`Classifier`](crate::Classifier).
mod confusion;
mod scorers;

pub use confusion::{
    confusion_matrix, false_discovery_score, false_positive_score, true_false_positive_negative,
    Counts, EPSILON,
};
pub use scorers::{equal_opportunity_score, p_percent_score, Scorer};
