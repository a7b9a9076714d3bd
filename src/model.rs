use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ModelConfig;
use crate::error::{PipelineError, Result};
use crate::features::{FEATURE_COUNT, FeatureVector};

/// Weights plus the intercept in the last slot.
const PARAMS: usize = FEATURE_COUNT + 1;
const ARMIJO: f64 = 1e-4;
const MIN_STEP: f64 = 1e-10;

/// L2-regularized logistic regression. The intercept is not penalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub weights: Vec<f64>,
    pub intercept: f64,
    pub iterations: usize,
    pub converged: bool,
}

impl LogisticRegression {
    /// Newton's method with a backtracking line search on the mean log-loss
    /// plus `||w||^2 / (2 * C * n)`, which has the same minimizer as
    /// scikit-learn's `C * sum(log_loss) + ||w||^2 / 2`. The objective is
    /// strictly convex, so the fit stops once every gradient component is
    /// under `tolerance`.
    pub fn fit(x: &[FeatureVector], y: &[u8], cfg: &ModelConfig) -> Result<Self> {
        if x.is_empty() || x.len() != y.len() {
            return Err(PipelineError::InsufficientData(format!(
                "cannot fit classifier on {} rows with {} labels",
                x.len(),
                y.len()
            )));
        }

        let l2 = 1.0 / (cfg.inverse_l2.max(1e-12) * x.len() as f64);
        let mut theta = DVector::<f64>::zeros(PARAMS);
        let mut iterations = 0;
        let mut converged = false;

        loop {
            let (grad, hess) = derivatives(x, y, &theta, l2);
            if grad.amax() < cfg.tolerance {
                converged = true;
                break;
            }
            if iterations == cfg.max_iter {
                break;
            }

            // The penalty keeps the Hessian positive definite; the gradient
            // is only a fallback for numerically degenerate inputs.
            let direction = match hess.cholesky() {
                Some(chol) => chol.solve(&grad),
                None => grad.clone(),
            };
            let current = objective(x, y, &theta, l2);
            let slope = grad.dot(&direction);
            let slack = f64::EPSILON * current.abs();
            let mut step = 1.0;
            loop {
                let candidate = &theta - &direction * step;
                if objective(x, y, &candidate, l2) <= current - ARMIJO * step * slope + slack
                    || step < MIN_STEP
                {
                    theta = candidate;
                    break;
                }
                step *= 0.5;
            }
            iterations += 1;
        }

        if converged {
            debug!(iterations, "logistic regression fitted");
        } else {
            warn!(iterations, "logistic regression hit the iteration cap");
        }
        Ok(Self {
            weights: theta.as_slice()[..FEATURE_COUNT].to_vec(),
            intercept: theta[FEATURE_COUNT],
            iterations,
            converged,
        })
    }

    pub fn decision_function(&self, row: &FeatureVector) -> f64 {
        self.weights
            .iter()
            .zip(row)
            .map(|(w, v)| w * v)
            .sum::<f64>()
            + self.intercept
    }

    /// Probability of a win; monotonic in the decision score.
    pub fn predict_probability(&self, row: &FeatureVector) -> f64 {
        sigmoid(self.decision_function(row))
    }

    pub fn predict(&self, row: &FeatureVector) -> u8 {
        u8::from(self.predict_probability(row) >= 0.5)
    }

    pub fn predict_probabilities(&self, rows: &[FeatureVector]) -> Vec<f64> {
        rows.iter().map(|r| self.predict_probability(r)).collect()
    }

    pub fn predict_labels(&self, rows: &[FeatureVector]) -> Vec<u8> {
        rows.iter().map(|r| self.predict(r)).collect()
    }
}

pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

fn score(theta: &DVector<f64>, row: &FeatureVector) -> f64 {
    let mut out = theta[FEATURE_COUNT];
    for (i, v) in row.iter().enumerate() {
        out += theta[i] * v;
    }
    out
}

/// `ln(1 + e^z)` without overflow.
fn softplus(z: f64) -> f64 {
    if z > 0.0 {
        z + (-z).exp().ln_1p()
    } else {
        z.exp().ln_1p()
    }
}

fn objective(x: &[FeatureVector], y: &[u8], theta: &DVector<f64>, l2: f64) -> f64 {
    let mut loss = 0.0;
    for (row, label) in x.iter().zip(y) {
        let z = score(theta, row);
        loss += softplus(z) - f64::from(*label) * z;
    }
    let penalty = theta.as_slice()[..FEATURE_COUNT]
        .iter()
        .map(|w| w * w)
        .sum::<f64>();
    loss / x.len() as f64 + 0.5 * l2 * penalty
}

fn derivatives(
    x: &[FeatureVector],
    y: &[u8],
    theta: &DVector<f64>,
    l2: f64,
) -> (DVector<f64>, DMatrix<f64>) {
    let n = x.len() as f64;
    let mut grad = DVector::<f64>::zeros(PARAMS);
    let mut hess = DMatrix::<f64>::zeros(PARAMS, PARAMS);
    let mut augmented = DVector::<f64>::zeros(PARAMS);
    augmented[FEATURE_COUNT] = 1.0;
    for (row, label) in x.iter().zip(y) {
        augmented.as_mut_slice()[..FEATURE_COUNT].copy_from_slice(row);
        let p = sigmoid(score(theta, row));
        grad.axpy(p - f64::from(*label), &augmented, 1.0);
        hess.ger(p * (1.0 - p), &augmented, &augmented, 1.0);
    }
    grad /= n;
    hess /= n;
    for i in 0..FEATURE_COUNT {
        grad[i] += l2 * theta[i];
        hess[(i, i)] += l2;
    }
    (grad, hess)
}
