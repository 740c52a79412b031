//! Augmented Lagrangian outer loop with a FISTA inner loop.
//!
//! Each two-sided bound `|a . theta| <= c` is normalized by `||a||` and split
//! into two one-sided rows `+a . theta <= c`, `-a . theta <= c`. The inner
//! loop minimizes
//!
//! `mean_nll(theta) + sum_k ((mu_k + rho h_k)_+^2 - mu_k^2) / (2 rho) + lambda ||theta_P||_1`
//!
//! with `h = A theta - c`, then multipliers are updated as `mu <- (mu + rho h)_+`.
use log::{debug, trace, warn};
use ndarray::{Array1, Array2, ArrayView1, Zip};

use super::{Problem, Solution, SolverSettings, SolverStatus};

const INITIAL_RHO: f64 = 10.0;
const MAX_RHO: f64 = 1e6;
const RHO_GROWTH: f64 = 10.0;
/// Required reduction of the constraint violation per outer iteration.
const VIOLATION_DECAY: f64 = 0.25;
const ZERO_ROW_NORM: f64 = 1e-12;
const UNBOUNDED_THETA: f64 = 1e8;
const MAX_LIPSCHITZ: f64 = 1e14;

fn max_abs(values: ArrayView1<'_, f64>) -> f64 {
    values.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()))
}

fn soft_threshold(v: f64, threshold: f64) -> f64 {
    if v > threshold {
        v - threshold
    } else if v < -threshold {
        v + threshold
    } else {
        0.0
    }
}

struct InnerResult {
    theta: Array1<f64>,
    iterations: usize,
    converged: bool,
}

struct Lagrangian<'p, 'a> {
    problem: &'p Problem<'a>,
    rows: Array2<f64>,
    bounds: Array1<f64>,
    mu: Array1<f64>,
    rho: f64,
    /// Per-sample L1 strength and the number of leading unpenalized entries.
    l1: Option<(f64, usize)>,
}

impl<'p, 'a> Lagrangian<'p, 'a> {
    fn new(problem: &'p Problem<'a>) -> Self {
        let p = problem.n_variables();
        // 0 <= c always holds once c >= 0 has been checked
        let kept: Vec<(Array1<f64>, f64)> = problem
            .constraints
            .iter()
            .filter_map(|constraint| {
                let norm = constraint.coefficients.dot(&constraint.coefficients).sqrt();
                (norm > ZERO_ROW_NORM)
                    .then(|| (&constraint.coefficients / norm, constraint.bound / norm))
            })
            .collect();
        let m = 2 * kept.len();
        let mut rows = Array2::zeros((m, p));
        let mut bounds = Array1::zeros(m);
        for (k, (row, bound)) in kept.iter().enumerate() {
            rows.row_mut(2 * k).assign(row);
            rows.row_mut(2 * k + 1).assign(&row.mapv(|v| -v));
            bounds[2 * k] = *bound;
            bounds[2 * k + 1] = *bound;
        }
        let n = problem.objective.n_samples() as f64;
        Self {
            problem,
            rows,
            bounds,
            mu: Array1::zeros(m),
            rho: INITIAL_RHO,
            l1: problem
                .penalty
                .map(|penalty| (penalty.strength / n, penalty.unpenalized)),
        }
    }

    fn n_rows(&self) -> usize {
        self.bounds.len()
    }

    fn residuals(&self, theta: ArrayView1<'_, f64>) -> Array1<f64> {
        self.rows.dot(&theta) - &self.bounds
    }

    fn smooth_value(&self, theta: ArrayView1<'_, f64>) -> f64 {
        let mut value = self.problem.objective.mean_loss(theta);
        if self.n_rows() > 0 {
            let h = self.residuals(theta);
            Zip::from(&h).and(&self.mu).for_each(|&h, &mu| {
                let shifted = (mu + self.rho * h).max(0.0);
                value += (shifted * shifted - mu * mu) / (2.0 * self.rho);
            });
        }
        value
    }

    fn smooth_value_and_gradient(&self, theta: ArrayView1<'_, f64>) -> (f64, Array1<f64>) {
        let (mut value, mut grad) = self.problem.objective.mean_loss_and_gradient(theta);
        if self.n_rows() > 0 {
            let h = self.residuals(theta);
            for (k, (&h, &mu)) in h.iter().zip(self.mu.iter()).enumerate() {
                let shifted = (mu + self.rho * h).max(0.0);
                value += (shifted * shifted - mu * mu) / (2.0 * self.rho);
                if shifted > 0.0 {
                    grad.scaled_add(shifted, &self.rows.row(k));
                }
            }
        }
        (value, grad)
    }

    fn prox(&self, mut v: Array1<f64>, step: f64) -> Array1<f64> {
        if let Some((strength, unpenalized)) = self.l1 {
            let threshold = strength * step;
            v.iter_mut()
                .skip(unpenalized)
                .for_each(|x| *x = soft_threshold(*x, threshold));
        }
        v
    }

    /// Accelerated proximal gradient with backtracking and gradient-based restart.
    fn minimize(
        &self,
        start: Array1<f64>,
        lipschitz: &mut f64,
        settings: &SolverSettings,
    ) -> InnerResult {
        let mut theta = start;
        let mut z = theta.clone();
        let mut t = 1.0_f64;
        *lipschitz = (*lipschitz * 0.5).max(1e-8);

        for iteration in 1..=settings.max_inner_iter {
            let (fz, gz) = self.smooth_value_and_gradient(z.view());
            let (candidate, step_diff) = loop {
                let step = 1.0 / *lipschitz;
                let candidate = self.prox(&z - &(&gz * step), step);
                let diff = &candidate - &z;
                let model = fz + gz.dot(&diff) + 0.5 * *lipschitz * diff.dot(&diff);
                if self.smooth_value(candidate.view()) <= model + 1e-12 * fz.abs().max(1.0) {
                    break (candidate, diff);
                }
                *lipschitz *= 2.0;
                if *lipschitz > MAX_LIPSCHITZ {
                    warn!("Step size collapsed after {} inner iterations", iteration);
                    return InnerResult {
                        theta,
                        iterations: iteration,
                        converged: false,
                    };
                }
            };

            let mapping = *lipschitz * max_abs(step_diff.view());
            let momentum = &candidate - &theta;
            let t_next = 0.5 * (1.0 + (1.0 + 4.0 * t * t).sqrt());
            if step_diff.dot(&momentum) < 0.0 {
                z = candidate.clone();
                t = 1.0;
            } else {
                z = &candidate + &(momentum * ((t - 1.0) / t_next));
                t = t_next;
            }
            theta = candidate;

            if !theta.iter().all(|v| v.is_finite()) || mapping <= settings.tol {
                trace!(
                    "Inner loop stopped after {} iterations (gradient mapping {:.3e})",
                    iteration,
                    mapping
                );
                return InnerResult {
                    theta,
                    iterations: iteration,
                    converged: mapping <= settings.tol,
                };
            }
        }

        InnerResult {
            theta,
            iterations: settings.max_inner_iter,
            converged: false,
        }
    }
}

pub(super) fn solve(problem: &Problem<'_>, settings: &SolverSettings) -> Solution {
    let p = problem.n_variables();

    if problem
        .constraints
        .iter()
        .any(|c| !c.bound.is_finite() || c.bound < 0.0 || c.coefficients.iter().any(|v| !v.is_finite()))
    {
        debug!("Constraint bounds admit no feasible point");
        return Solution {
            status: SolverStatus::Infeasible,
            theta: None,
            objective_value: f64::NEG_INFINITY,
            iterations: 0,
            inner_iterations: 0,
        };
    }

    let mut state = Lagrangian::new(problem);
    let mut theta = Array1::zeros(p);
    let mut lipschitz = 1.0;
    let mut inner_total = 0;
    let mut previous_violation = f64::INFINITY;

    for iteration in 1..=settings.max_iter {
        let inner = state.minimize(theta, &mut lipschitz, settings);
        inner_total += inner.iterations;
        theta = inner.theta;

        if !theta.iter().all(|v| v.is_finite()) || max_abs(theta.view()) > UNBOUNDED_THETA {
            debug!("Iterates diverged at outer iteration {}", iteration);
            return Solution {
                status: SolverStatus::Unbounded,
                theta: Some(theta),
                objective_value: f64::INFINITY,
                iterations: iteration,
                inner_iterations: inner_total,
            };
        }

        let (stationary, violation) = if state.n_rows() == 0 {
            (0.0, 0.0)
        } else {
            let h = state.residuals(theta.view());
            let mut kkt = 0.0_f64;
            let mut violation = 0.0_f64;
            Zip::from(&h).and(&state.mu).for_each(|&h, &mu| {
                kkt = kkt.max(h.max(-mu / state.rho).abs());
                violation = violation.max(h);
            });
            let rho = state.rho;
            Zip::from(&mut state.mu)
                .and(&h)
                .for_each(|mu, &h| *mu = (*mu + rho * h).max(0.0));
            (kkt, violation)
        };

        debug!(
            "Outer iteration {}: {} inner steps, violation {:.3e}, rho {:.1e}",
            iteration, inner.iterations, violation, state.rho
        );

        if inner.converged && stationary <= settings.tol {
            return Solution {
                status: SolverStatus::Optimal,
                objective_value: problem.objective_value(theta.view()),
                theta: Some(theta),
                iterations: iteration,
                inner_iterations: inner_total,
            };
        }

        if violation > VIOLATION_DECAY * previous_violation {
            state.rho = (state.rho * RHO_GROWTH).min(MAX_RHO);
        }
        previous_violation = violation;
    }

    Solution {
        status: SolverStatus::OptimalInaccurate,
        objective_value: problem.objective_value(theta.view()),
        theta: Some(theta),
        iterations: settings.max_iter,
        inner_iterations: inner_total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn soft_threshold_shrinks_towards_zero() {
        assert_eq!(soft_threshold(3.0, 1.0), 2.0);
        assert_eq!(soft_threshold(-3.0, 1.0), -2.0);
        assert_eq!(soft_threshold(0.5, 1.0), 0.0);
    }

    #[test]
    fn constraint_rows_come_in_negated_unit_pairs() {
        use crate::solver::{LogLikelihood, ScoreConstraint};
        use ndarray::array;

        let x = array![[1.0, 0.5], [1.0, -0.5], [1.0, 1.5]];
        let y = array![1.0, 0.0, 1.0];
        let mut problem = Problem::maximize(LogLikelihood::new(x.view(), y.view()));
        problem
            .subject_to(&ScoreConstraint::new(array![0.5, -0.5, 0.0], 0.1))
            .unwrap();
        problem
            .subject_to(&ScoreConstraint::new(Array1::zeros(3), 0.1))
            .unwrap();
        problem
            .subject_to(&ScoreConstraint::new(array![0.0, 1.0, -1.0], 0.2))
            .unwrap();

        let lagrangian = Lagrangian::new(&problem);
        assert_eq!(lagrangian.n_rows(), 4);
        assert_eq!(lagrangian.rows.dim(), (4, 2));
        for k in 0..2 {
            let up = lagrangian.rows.row(2 * k);
            let down = lagrangian.rows.row(2 * k + 1);
            assert!((up.dot(&up) - 1.0).abs() < 1e-12);
            assert_eq!(up.mapv(|v| -v), down);
            assert_eq!(lagrangian.bounds[2 * k], lagrangian.bounds[2 * k + 1]);
        }
        // X^T w = (0, 0.5) for the first bound
        assert_eq!(lagrangian.rows.row(0), array![0.0, 1.0]);
        assert!((lagrangian.bounds[0] - 0.2).abs() < 1e-12);
        assert_eq!(lagrangian.mu.len(), 4);
    }
}
