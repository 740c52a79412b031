//! Constrained maximum-likelihood solver for fair linear classifiers.
//!
//! A [`Problem`] is declared the same way a modelling layer would declare a
//! convex program: one variable vector `theta`, a log-likelihood objective
//! over the linear scores `X theta`, an optional L1 term, and any number of
//! two-sided bounds `|w' (X theta)| <= c` on the scores. [`Problem::solve`]
//! runs an augmented Lagrangian outer loop around an accelerated proximal
//! gradient inner loop and reports a [`Solution`] with status, iteration
//! counts and values.
//!
//! This is not a general-purpose optimizer: it supports exactly this problem
//! family.
mod augmented_lagrangian;
mod objective;

use std::fmt;

use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::error::{FairnessError, Result};

pub use objective::{log_sum_exp_zero, LogLikelihood};

/// Outcome of a solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverStatus {
    /// Converged within tolerance.
    Optimal,
    /// Iteration budget exhausted; the last iterate is returned.
    OptimalInaccurate,
    /// The constraint set is empty.
    Infeasible,
    /// The iterates diverged.
    Unbounded,
}

impl SolverStatus {
    pub fn is_failure(&self) -> bool {
        matches!(self, SolverStatus::Infeasible | SolverStatus::Unbounded)
    }
}

impl fmt::Display for SolverStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SolverStatus::Optimal => "optimal",
            SolverStatus::OptimalInaccurate => "optimal_inaccurate",
            SolverStatus::Infeasible => "infeasible",
            SolverStatus::Unbounded => "unbounded",
        };
        write!(f, "{}", name)
    }
}

/// A bound on the decision scores: `|weights . y_hat| <= bound`, where
/// `y_hat = X theta` holds one score per training sample.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreConstraint {
    pub weights: Array1<f64>,
    pub bound: f64,
}

impl ScoreConstraint {
    pub fn new(weights: Array1<f64>, bound: f64) -> Self {
        Self { weights, bound }
    }

    /// Evaluate `weights . scores`.
    pub fn evaluate(&self, scores: ArrayView1<'_, f64>) -> f64 {
        self.weights.dot(&scores)
    }
}

/// The same bound pulled back onto `theta`: `|coefficients . theta| <= bound`.
#[derive(Debug, Clone, PartialEq)]
struct ParameterBound {
    coefficients: Array1<f64>,
    bound: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct L1Penalty {
    strength: f64,
    /// Leading coefficients left out of the penalty (the bias column).
    unpenalized: usize,
}

/// Budget and tolerance of a solve.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverSettings {
    /// Outer (multiplier update) iterations.
    pub max_iter: usize,
    /// Proximal gradient steps per outer iteration.
    pub max_inner_iter: usize,
    /// Stationarity and feasibility tolerance.
    pub tol: f64,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            max_iter: 100,
            max_inner_iter: 20_000,
            tol: 1e-7,
        }
    }
}

/// Result of [`Problem::solve`].
#[derive(Debug, Clone)]
pub struct Solution {
    pub status: SolverStatus,
    /// `None` when the problem is infeasible.
    pub theta: Option<Array1<f64>>,
    /// Penalized log-likelihood at `theta`.
    pub objective_value: f64,
    /// Outer iterations used.
    pub iterations: usize,
    /// Proximal gradient steps used across all outer iterations.
    pub inner_iterations: usize,
}

impl Solution {
    /// The solution values, or a solver-status error for infeasible and
    /// unbounded problems.
    pub fn into_values(self) -> Result<Array1<f64>> {
        match (self.status.is_failure(), self.theta) {
            (false, Some(theta)) => Ok(theta),
            _ => Err(FairnessError::SolverStatus {
                status: self.status,
            }),
        }
    }
}

/// Maximize a (penalized) log-likelihood subject to score bounds.
#[derive(Debug, Clone)]
pub struct Problem<'a> {
    objective: LogLikelihood<'a>,
    penalty: Option<L1Penalty>,
    constraints: Vec<ParameterBound>,
}

impl<'a> Problem<'a> {
    pub fn maximize(objective: LogLikelihood<'a>) -> Self {
        Self {
            objective,
            penalty: None,
            constraints: Vec::new(),
        }
    }

    /// Subtract `strength * ||theta[unpenalized..]||_1` from the objective.
    pub fn with_l1_penalty(mut self, strength: f64, unpenalized: usize) -> Self {
        self.penalty = Some(L1Penalty {
            strength,
            unpenalized,
        });
        self
    }

    pub fn n_variables(&self) -> usize {
        self.objective.design().ncols()
    }

    pub fn n_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Add a bound on the decision scores of the objective's design matrix.
    pub fn subject_to(&mut self, constraint: &ScoreConstraint) -> Result<()> {
        let design: ArrayView2<'_, f64> = self.objective.design();
        if constraint.weights.len() != design.nrows() {
            return Err(FairnessError::validation(format!(
                "constraint has {} sample weights but the problem has {} samples",
                constraint.weights.len(),
                design.nrows()
            )));
        }
        self.constraints.push(ParameterBound {
            coefficients: design.t().dot(&constraint.weights),
            bound: constraint.bound,
        });
        Ok(())
    }

    /// Penalized log-likelihood at `theta`.
    pub fn objective_value(&self, theta: ArrayView1<'_, f64>) -> f64 {
        let penalty = self
            .penalty
            .map(|p| p.strength * theta.iter().skip(p.unpenalized).map(|v| v.abs()).sum::<f64>())
            .unwrap_or(0.0);
        self.objective.value(theta) - penalty
    }

    pub fn solve(&self, settings: &SolverSettings) -> Solution {
        augmented_lagrangian::solve(self, settings)
    }
}
